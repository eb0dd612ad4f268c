//! Fixed-point bilinear area resampling.
//!
//! Source positions advance in steps of `source_len * THETA / dest_len` and
//! every division truncates toward zero. Those truncations are part of the
//! expected pixel values.

use crate::{ImageError, PixelBuffer, Result};

/// Fixed-point scale for source positions.
pub const THETA: u64 = 16384;

/// Resize `input` into `out`, whose dimensions the caller chose when
/// allocating it. Every byte of `out` is written.
///
/// The last destination column samples its own pixel as the right neighbour
/// and the last destination row samples its own row as the down neighbour,
/// so the bottom-right pixel degenerates to a straight copy of the nearest
/// source sample. When upscaling lands a position on the source edge, the
/// lookahead neighbour is the edge pixel itself.
///
/// # Errors
/// `ShapeMismatch` if the depths differ or either buffer was released.
pub fn resize(out: &mut PixelBuffer, input: &PixelBuffer) -> Result<()> {
    if out.depth() != input.depth() || out.is_released() || input.is_released() {
        return Err(ImageError::shape_mismatch(
            format!("depth {} destination", input.depth()),
            format!(
                "{} destination{}",
                out.shape(),
                if out.is_released() || input.is_released() { " (released)" } else { "" }
            ),
        ));
    }

    let depth = input.depth() as usize;
    let (in_w, in_h) = (input.width() as usize, input.height() as usize);
    let (out_w, out_h) = (out.width() as usize, out.height() as usize);
    let in_stride = input.row_stride();
    let out_stride = out.row_stride();

    let step_x = in_w as u64 * THETA / out_w as u64;
    let step_y = in_h as u64 * THETA / out_h as u64;

    let src = input.as_bytes();
    let dst = out.as_bytes_mut();

    let mut sy = 0u64;
    for y in 0..out_h {
        let (isy, rsy) = split(sy);
        let down = if y + 1 < out_h && isy + 1 < in_h { in_stride } else { 0 };

        let mut sx = 0u64;
        for x in 0..out_w {
            let (isx, rsx) = split(sx);
            let right = if x + 1 < out_w && isx + 1 < in_w { depth } else { 0 };

            let p = isy * in_stride + isx * depth;
            let q = y * out_stride + x * depth;
            for d in 0..depth {
                let p = p + d;
                dst[q + d] = interpolate(
                    src[p],
                    src[p + right],
                    src[p + down],
                    src[p + down + right],
                    rsx,
                    rsy,
                );
            }
            sx += step_x;
        }
        sy += step_y;
    }

    Ok(())
}

/// Allocate a `width` x `height` buffer at the input's depth and resize into it.
///
/// # Example
/// ```
/// use pixmill_image::{resample, PixelBuffer};
///
/// let input = PixelBuffer::from_raw(2, 2, 1, vec![10, 20, 30, 40]).unwrap();
/// let output = resample(&input, 2, 2).unwrap();
/// assert_eq!(output.as_bytes(), input.as_bytes());
/// ```
pub fn resample(input: &PixelBuffer, width: u32, height: u32) -> Result<PixelBuffer> {
    let mut out = PixelBuffer::new(width, height, input.depth())?;
    resize(&mut out, input)?;
    Ok(out)
}

#[inline]
fn split(position: u64) -> (usize, u64) {
    ((position / THETA) as usize, position % THETA)
}

#[inline]
fn interpolate(z: u8, zr: u8, zd: u8, zdr: u8, rsx: u64, rsy: u64) -> u8 {
    let (z, zr, zd, zdr) = (z as u64, zr as u64, zd as u64, zdr as u64);
    let sum = z * (THETA - rsx)
        + zr * rsx
        + z * (THETA - rsy)
        + zd * rsy
        + z * (2 * THETA - (rsx + rsy))
        + zdr * (rsx + rsy);
    (sum / (4 * THETA)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn gradient(width: u32, height: u32, depth: u32) -> PixelBuffer {
        let len = (width * height * depth) as usize;
        let bytes = (0..len).map(|i| (i * 37 % 251) as u8).collect();
        PixelBuffer::from_raw(width, height, depth, bytes).unwrap()
    }

    #[test]
    fn test_identity_is_exact() {
        for (w, h, d) in [(2, 2, 1), (7, 5, 3), (16, 9, 4)] {
            let input = gradient(w, h, d);
            let output = resample(&input, w, h).unwrap();
            assert_eq!(output.as_bytes(), input.as_bytes(), "{w}x{h}x{d}");
        }
    }

    #[test]
    fn test_integer_downscale_picks_samples() {
        let input = PixelBuffer::from_raw(4, 2, 1, vec![0, 40, 80, 120, 200, 200, 200, 200]).unwrap();
        let output = resample(&input, 2, 2).unwrap();
        assert_eq!(output.as_bytes(), &[0, 80, 200, 200]);
    }

    #[test]
    fn test_fractional_positions_truncate() {
        let input = PixelBuffer::from_raw(2, 2, 1, vec![0, 90, 180, 30]).unwrap();
        let output = resample(&input, 3, 3).unwrap();
        let bytes = output.as_bytes();
        assert_eq!(bytes[0], 0);
        // 120 * 10922 / 65536 = 19.99..
        assert_eq!(bytes[1], 19);
        assert_eq!(bytes[2], 85);
        assert_eq!(bytes[3], 34);
    }

    #[test]
    fn test_non_divisible_ratio_stays_in_bounds() {
        let input = gradient(7, 5, 3);
        let output = resample(&input, 3, 4).unwrap();
        assert_eq!(output.len(), 3 * 4 * 3);

        let back = resample(&output, 7, 5).unwrap();
        assert_eq!(back.len(), input.len());
    }

    #[test]
    fn test_upscale_writes_every_byte() {
        let input = PixelBuffer::from_raw(2, 2, 3, vec![7; 12]).unwrap();
        let mut out = PixelBuffer::new(9, 7, 3).unwrap();
        resize(&mut out, &input).unwrap();
        assert!(out.as_bytes().iter().all(|&b| b == 7));
    }

    #[test]
    fn test_upscale_clamps_lookahead_and_restarts_last_row() {
        let input = PixelBuffer::from_raw(2, 2, 1, vec![10, 50, 90, 200]).unwrap();
        let output = resample(&input, 9, 7).unwrap();
        let bytes = output.as_bytes();

        // (5, 1) samples source column 1, the right edge: its right neighbour
        // is itself (50), not the next row's 90.
        assert_eq!(bytes[output.offset(5, 1)], 75);
        // (2, 6) is on the last row: x starts over from zero, down is itself.
        assert_eq!(bytes[output.offset(2, 6)], 134);
        // Right half of the lower rows sits entirely on source pixel (1, 1).
        assert_eq!(bytes[output.offset(6, 5)], 200);
    }

    #[test]
    fn test_last_pixel_copies_nearest_sample() {
        let input = gradient(6, 6, 1);
        let output = resample(&input, 3, 3).unwrap();
        // Last destination pixel sits at source (4, 4).
        assert_eq!(output.as_bytes()[8], input.as_bytes()[input.offset(4, 4)]);
    }

    #[test]
    fn test_depth_mismatch() {
        let input = gradient(4, 4, 3);
        let mut out = PixelBuffer::new(2, 2, 1).unwrap();
        let err = resize(&mut out, &input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_released_input_rejected() {
        let mut input = gradient(4, 4, 1);
        input.release();
        let mut out = PixelBuffer::new(2, 2, 1).unwrap();
        assert!(resize(&mut out, &input).is_err());
    }
}
