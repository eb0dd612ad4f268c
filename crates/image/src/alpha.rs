//! Alpha channel removal for encoders that only take opaque pixels.

use crate::{PixelBuffer, Result};

/// Default matte: white.
pub const WHITE: [u8; 3] = [255, 255, 255];

/// Whether a buffer of this depth carries an alpha channel (gray+alpha or RGBA).
pub fn has_alpha_channel(depth: u32) -> bool {
    matches!(depth, 2 | 4)
}

/// Composite a gray+alpha or RGBA buffer over a solid background, producing a
/// gray or RGB buffer. Buffers without alpha are copied unchanged.
pub fn remove_alpha_channel(buffer: &PixelBuffer, background: [u8; 3]) -> Result<PixelBuffer> {
    if !has_alpha_channel(buffer.depth()) {
        return buffer.try_clone();
    }

    let depth = buffer.depth() as usize;
    let colors = depth - 1;
    let matte: [u8; 3] = if colors == 1 {
        [luma(background); 3]
    } else {
        background
    };

    let mut output = PixelBuffer::new(buffer.width(), buffer.height(), colors as u32)?;
    let src = buffer.as_bytes().chunks_exact(depth);
    let dst = output.as_bytes_mut().chunks_exact_mut(colors);
    for (out, px) in dst.zip(src) {
        let alpha = px[colors] as u32;
        for c in 0..colors {
            out[c] = ((px[c] as u32 * alpha + matte[c] as u32 * (255 - alpha)) / 255) as u8;
        }
    }

    Ok(output)
}

fn luma([r, g, b]: [u8; 3]) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_alpha_white_background() {
        #[rustfmt::skip]
        let bytes = vec![
            255, 0, 0, 255,   // opaque red
            0, 255, 0, 128,   // semi-transparent green
            0, 0, 255, 0,     // fully transparent blue
            255, 255, 0, 255, // opaque yellow
        ];
        let rgba = PixelBuffer::from_raw(2, 2, 4, bytes).unwrap();
        let rgb = remove_alpha_channel(&rgba, WHITE).unwrap();

        assert_eq!(rgb.depth(), 3);
        let px = rgb.as_bytes();
        assert_eq!(&px[0..3], &[255, 0, 0]);
        assert_eq!(&px[3..6], &[127, 255, 127]);
        assert_eq!(&px[6..9], &[255, 255, 255]);
        assert_eq!(&px[9..12], &[255, 255, 0]);
    }

    #[test]
    fn test_gray_alpha_uses_luma_matte() {
        let la = PixelBuffer::from_raw(2, 2, 2, vec![0, 0, 100, 255, 10, 0, 200, 255]).unwrap();
        let gray = remove_alpha_channel(&la, [0, 0, 0]).unwrap();
        assert_eq!(gray.depth(), 1);
        assert_eq!(gray.as_bytes(), &[0, 100, 0, 200]);
    }

    #[test]
    fn test_opaque_depth_is_copied() {
        let rgb = PixelBuffer::from_raw(2, 2, 3, (0..12).collect()).unwrap();
        let out = remove_alpha_channel(&rgb, WHITE).unwrap();
        assert_eq!(out.as_bytes(), rgb.as_bytes());
        assert!(!has_alpha_channel(3));
        assert!(has_alpha_channel(4));
    }
}
