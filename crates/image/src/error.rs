//! Error types for the image crate.

use thiserror::Error;

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur while allocating, transforming or coding images.
///
/// Every variant is terminal for the request that raised it.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Channel count below one
    #[error("Unsupported image depth {0}, try a different image")]
    InvalidDepth(u32),

    /// Width or height below the resampler's two-pixel minimum
    #[error("Target dimensions {width}x{height} are too small, try a different image")]
    DimensionsTooSmall {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// `width * height * depth` does not fit in `usize`
    #[error("Image size {width}x{height}x{depth} overflows the address space")]
    Overflow {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Requested depth
        depth: u32,
    },

    /// The allocator refused the pixel store
    #[error("Out of memory allocating {0} bytes, try with a smaller image")]
    OutOfMemory(usize),

    /// Two buffers that must share a shape do not
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Shape the operation required
        expected: String,
        /// Shape it was given
        actual: String,
    },

    /// Opacity outside 0..=100
    #[error("Opacity {0} is out of range (0-100)")]
    InvalidOpacity(u32),

    /// Input bytes match no supported format
    #[error("Unknown image format")]
    UnknownFormat,

    /// The codec could not decode the input
    #[error("Invalid image data: {0}")]
    Decode(String),

    /// The codec could not encode the output
    #[error("Encode error: {0}")]
    Encode(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Fieldless mirror of [`ImageError`] for programmatic dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ImageError::InvalidDepth`]
    InvalidDepth,
    /// See [`ImageError::DimensionsTooSmall`]
    DimensionsTooSmall,
    /// See [`ImageError::Overflow`]
    Overflow,
    /// See [`ImageError::OutOfMemory`]
    OutOfMemory,
    /// See [`ImageError::ShapeMismatch`]
    ShapeMismatch,
    /// See [`ImageError::InvalidOpacity`]
    InvalidOpacity,
    /// See [`ImageError::UnknownFormat`]
    UnknownFormat,
    /// See [`ImageError::Decode`]
    Decode,
    /// See [`ImageError::Encode`]
    Encode,
    /// See [`ImageError::Config`]
    Config,
}

impl ImageError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImageError::InvalidDepth(_) => ErrorKind::InvalidDepth,
            ImageError::DimensionsTooSmall { .. } => ErrorKind::DimensionsTooSmall,
            ImageError::Overflow { .. } => ErrorKind::Overflow,
            ImageError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            ImageError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            ImageError::InvalidOpacity(_) => ErrorKind::InvalidOpacity,
            ImageError::UnknownFormat => ErrorKind::UnknownFormat,
            ImageError::Decode(_) => ErrorKind::Decode,
            ImageError::Encode(_) => ErrorKind::Encode,
            ImageError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the caller's input caused the failure, as opposed to the
    /// environment or the pipeline itself.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidDepth
                | ErrorKind::DimensionsTooSmall
                | ErrorKind::InvalidOpacity
                | ErrorKind::UnknownFormat
                | ErrorKind::Decode
        )
    }

    pub(crate) fn shape_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        ImageError::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
