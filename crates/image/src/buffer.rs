//! Owned, interleaved 8-bit pixel storage.
//!
//! A [`PixelBuffer`] is the unit of ownership passed between pipeline stages.
//! It is never shared: stages borrow their input, produce a fresh output, and
//! the caller releases the input once the stage returns.

use crate::{ImageError, Result};
use std::fmt;

/// Smallest width or height the resampler can work with.
pub const MIN_DIMENSION: u32 = 2;

/// Width, height and channel count of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Pixels per row
    pub width: u32,
    /// Number of rows
    pub height: u32,
    /// Interleaved channels per pixel
    pub depth: u32,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

impl Shape {
    /// Validate the shape and return its byte length.
    ///
    /// Checks run in order: depth, minimum dimensions, size overflow.
    pub fn byte_len(&self) -> Result<usize> {
        if self.depth < 1 {
            return Err(ImageError::InvalidDepth(self.depth));
        }
        if self.width < MIN_DIMENSION || self.height < MIN_DIMENSION {
            return Err(ImageError::DimensionsTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.depth as usize))
            .ok_or(ImageError::Overflow {
                width: self.width,
                height: self.height,
                depth: self.depth,
            })
    }
}

/// A packed `height * width * depth` byte image with no row padding.
///
/// Deliberately not `Clone`: copies go through [`PixelBuffer::try_clone`],
/// which can fail like any other allocation.
pub struct PixelBuffer {
    width: u32,
    height: u32,
    depth: u32,
    row_stride: usize,
    buf: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.depth)
            .field("row_stride", &self.row_stride)
            .field("len", &self.buf.len())
            .finish()
    }
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer.
    ///
    /// # Errors
    /// `InvalidDepth`, `DimensionsTooSmall` or `Overflow` before anything is
    /// allocated; `OutOfMemory` if the allocator refuses the store.
    ///
    /// # Example
    /// ```
    /// use pixmill_image::PixelBuffer;
    ///
    /// let buffer = PixelBuffer::new(4, 3, 3).unwrap();
    /// assert_eq!(buffer.len(), 36);
    /// assert_eq!(buffer.row_stride(), 12);
    /// ```
    pub fn new(width: u32, height: u32, depth: u32) -> Result<Self> {
        let shape = Shape { width, height, depth };
        let len = shape.byte_len()?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| ImageError::OutOfMemory(len))?;
        buf.resize(len, 0);

        Ok(Self::from_parts(shape, buf))
    }

    /// Wrap bytes produced elsewhere, typically by a decoder.
    ///
    /// Validates the shape like [`PixelBuffer::new`] and fails with
    /// `ShapeMismatch` if `bytes` is not exactly `width * height * depth` long.
    pub fn from_raw(width: u32, height: u32, depth: u32, bytes: Vec<u8>) -> Result<Self> {
        let shape = Shape { width, height, depth };
        let len = shape.byte_len()?;
        if bytes.len() != len {
            return Err(ImageError::shape_mismatch(
                format!("{len} bytes for {shape}"),
                format!("{} bytes", bytes.len()),
            ));
        }
        Ok(Self::from_parts(shape, bytes))
    }

    fn from_parts(shape: Shape, buf: Vec<u8>) -> Self {
        Self {
            width: shape.width,
            height: shape.height,
            depth: shape.depth,
            row_stride: shape.width as usize * shape.depth as usize,
            buf,
        }
    }

    /// Allocate a new buffer of the same shape holding a copy of these bytes.
    pub fn try_clone(&self) -> Result<Self> {
        let mut copy = Self::new(self.width, self.height, self.depth)?;
        if copy.buf.len() != self.buf.len() {
            return Err(ImageError::shape_mismatch(self.shape(), "released buffer"));
        }
        copy.buf.copy_from_slice(&self.buf);
        Ok(copy)
    }

    /// Free the pixel store.
    ///
    /// The length drops to zero and the shape metadata stays for diagnostics.
    /// Releasing twice is a no-op; dropping a released buffer is fine.
    pub fn release(&mut self) {
        self.buf = Vec::new();
    }

    /// Whether [`PixelBuffer::release`] has run.
    pub fn is_released(&self) -> bool {
        self.buf.is_empty()
    }

    /// Pixels per row.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved channels per pixel.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Bytes per row (`width * depth`).
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Width, height and depth together.
    pub fn shape(&self) -> Shape {
        Shape {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }

    /// Number of bytes currently owned (zero once released).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True only for released buffers; live buffers are at least 2x2x1.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Byte offset of channel 0 of pixel `(x, y)`.
    #[inline]
    pub fn offset(&self, x: usize, y: usize) -> usize {
        y * self.row_stride + x * self.depth as usize
    }

    /// Raw bytes, row-major, channels interleaved.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable raw bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Hand the pixel store over to an encoder.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Fail with `ShapeMismatch` unless `other` is live and shaped like `self`.
    pub fn ensure_same_shape(&self, other: &PixelBuffer) -> Result<()> {
        if self.is_released()
            || other.is_released()
            || self.shape() != other.shape()
            || self.buf.len() != other.buf.len()
        {
            return Err(ImageError::shape_mismatch(
                describe(self),
                describe(other),
            ));
        }
        Ok(())
    }
}

fn describe(buffer: &PixelBuffer) -> String {
    if buffer.is_released() {
        format!("{} (released)", buffer.shape())
    } else {
        buffer.shape().to_string()
    }
}
