//! Opacity-weighted layer merge.

use crate::{ImageError, PixelBuffer, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of [`Opacity`].
pub const OPACITY_MAX: u32 = 100;

/// Weight, in percent, of the sharpened layer when merged over the original.
///
/// `0` leaves the original untouched, `100` keeps the sharpened layer as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Opacity(u32);

impl Opacity {
    /// Fully sharpened.
    pub const OPAQUE: Opacity = Opacity(OPACITY_MAX);
    /// No sharpening.
    pub const TRANSPARENT: Opacity = Opacity(0);

    /// Validate a percentage. Values above 100 are rejected, never clamped.
    pub fn new(percent: u32) -> Result<Self> {
        if percent > OPACITY_MAX {
            return Err(ImageError::InvalidOpacity(percent));
        }
        Ok(Self(percent))
    }

    /// The percentage.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Opacity {
    type Error = ImageError;

    fn try_from(value: u32) -> Result<Self> {
        Opacity::new(value)
    }
}

impl From<Opacity> for u32 {
    fn from(opacity: Opacity) -> Self {
        opacity.0
    }
}

impl fmt::Display for Opacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Merge `original` into `sharpened` in place:
/// `sharpened[i] = (opacity * sharpened[i] + (100 - opacity) * original[i]) / 100`.
///
/// Works on the flat byte arrays; rows and channels line up because the
/// shapes must match.
///
/// # Errors
/// `ShapeMismatch` unless both buffers are live and share a shape.
pub fn blend(sharpened: &mut PixelBuffer, original: &PixelBuffer, opacity: Opacity) -> Result<()> {
    sharpened.ensure_same_shape(original)?;

    let w1 = opacity.get();
    let w2 = OPACITY_MAX - w1;

    for (out, &orig) in sharpened.as_bytes_mut().iter_mut().zip(original.as_bytes()) {
        *out = ((w1 * *out as u32 + w2 * orig as u32) / OPACITY_MAX) as u8;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn layers() -> (PixelBuffer, PixelBuffer) {
        let sharp = PixelBuffer::from_raw(2, 2, 2, vec![255, 0, 100, 7, 9, 200, 33, 1]).unwrap();
        let orig = PixelBuffer::from_raw(2, 2, 2, vec![0, 255, 50, 8, 90, 20, 33, 254]).unwrap();
        (sharp, orig)
    }

    #[test]
    fn test_opaque_keeps_sharpened() {
        let (mut sharp, orig) = layers();
        let before = sharp.as_bytes().to_vec();
        blend(&mut sharp, &orig, Opacity::OPAQUE).unwrap();
        assert_eq!(sharp.as_bytes(), &before[..]);
    }

    #[test]
    fn test_transparent_restores_original() {
        let (mut sharp, orig) = layers();
        blend(&mut sharp, &orig, Opacity::TRANSPARENT).unwrap();
        assert_eq!(sharp.as_bytes(), orig.as_bytes());
    }

    #[test]
    fn test_half_truncates() {
        let (mut sharp, orig) = layers();
        blend(&mut sharp, &orig, Opacity::new(50).unwrap()).unwrap();
        assert_eq!(sharp.as_bytes(), &[127, 127, 75, 7, 49, 110, 33, 127]);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut sharp = PixelBuffer::new(4, 2, 1).unwrap();
        let orig = PixelBuffer::new(2, 4, 1).unwrap();
        let err = blend(&mut sharp, &orig, Opacity::new(10).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_opacity_bounds() {
        assert!(Opacity::new(100).is_ok());
        let err = Opacity::new(101).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOpacity);
        assert_eq!(Opacity::new(25).unwrap().to_string(), "25%");
    }

    #[test]
    fn test_both_released_rejected() {
        let (mut sharp, mut orig) = layers();
        sharp.release();
        orig.release();
        let err = blend(&mut sharp, &orig, Opacity::new(50).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }
}
