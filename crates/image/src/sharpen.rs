//! 3x3 sharpening convolution.
//!
//! Kernel:
//! ```text
//!  0 -1  0
//! -1  5 -1
//!  0 -1  0
//! ```
//! Only interior pixels are convolved; the one-pixel border keeps whatever
//! the output buffer held before.

use crate::{PixelBuffer, Result};

/// Convolve the interior of `input` into `out`, clamping to `0..=255`.
///
/// # Errors
/// `ShapeMismatch` unless both buffers are live and share a shape.
pub fn sharpen(out: &mut PixelBuffer, input: &PixelBuffer) -> Result<()> {
    input.ensure_same_shape(out)?;

    let depth = input.depth() as usize;
    let stride = input.row_stride();
    let (width, height) = (input.width() as usize, input.height() as usize);
    let src = input.as_bytes();
    let dst = out.as_bytes_mut();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let p = y * stride + x * depth;
            for i in p..p + depth {
                let z = 5 * src[i] as i32
                    - src[i - stride] as i32
                    - src[i + stride] as i32
                    - src[i - depth] as i32
                    - src[i + depth] as i32;
                dst[i] = z.clamp(0, 255) as u8;
            }
        }
    }

    Ok(())
}

/// Sharpen into a fresh buffer seeded with a copy of `input`, so the border
/// carries the unsharpened values.
pub fn sharpened(input: &PixelBuffer) -> Result<PixelBuffer> {
    let mut out = input.try_clone()?;
    sharpen(&mut out, input)?;
    Ok(out)
}
