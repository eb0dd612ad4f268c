//! Codec boundary: compressed bytes in, [`PixelBuffer`] out, and back.
//!
//! The bitstream work is delegated to the `image` crate. This module only
//! guarantees the buffers it hands over match the packed layout the pipeline
//! expects.

use crate::alpha::{has_alpha_channel, remove_alpha_channel, WHITE};
use crate::{detect_format, ImageError, PixelBuffer, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder};
use serde::{Deserialize, Serialize};

/// Decode/encode contract the pipeline consumes.
pub trait Codec {
    /// Decode a compressed image. Dimensions and depth come from the bitstream.
    fn decode(&self, data: &[u8]) -> Result<PixelBuffer>;

    /// Encode a buffer produced by the pipeline.
    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>>;

    /// MIME type of what [`Codec::encode`] produces.
    fn content_type(&self) -> &'static str;
}

/// Formats the encoder can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Baseline JPEG, alpha composited over white
    #[default]
    Jpeg,
    /// PNG, any depth from 1 to 4
    Png,
}

impl OutputFormat {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    /// Preferred file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// [`Codec`] backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageCodec {
    /// Output format
    pub format: OutputFormat,
    /// JPEG quality (1-100); ignored for PNG
    pub quality: u8,
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 85,
        }
    }
}

impl ImageCodec {
    /// JPEG output at the given quality.
    pub fn jpeg(quality: u8) -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality,
        }
    }

    /// PNG output.
    pub fn png() -> Self {
        Self {
            format: OutputFormat::Png,
            ..Self::default()
        }
    }
}

impl Codec for ImageCodec {
    fn decode(&self, data: &[u8]) -> Result<PixelBuffer> {
        let format = detect_format(data)?;
        let img = image::load_from_memory_with_format(data, format.codec_format())
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        let (width, height, depth, bytes) = match img {
            DynamicImage::ImageLuma8(buf) => (buf.width(), buf.height(), 1, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (buf.width(), buf.height(), 2, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (buf.width(), buf.height(), 3, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (buf.width(), buf.height(), 4, buf.into_raw()),
            other if other.color().has_alpha() => {
                let buf = other.to_rgba8();
                (buf.width(), buf.height(), 4, buf.into_raw())
            }
            other => {
                let buf = other.to_rgb8();
                (buf.width(), buf.height(), 3, buf.into_raw())
            }
        };

        PixelBuffer::from_raw(width, height, depth, bytes)
    }

    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>> {
        if buffer.is_released() {
            return Err(ImageError::Encode("buffer was released".into()));
        }

        let mut out = Vec::new();
        match self.format {
            OutputFormat::Jpeg => {
                let opaque;
                let buffer = if has_alpha_channel(buffer.depth()) {
                    opaque = remove_alpha_channel(buffer, WHITE)?;
                    &opaque
                } else {
                    buffer
                };
                JpegEncoder::new_with_quality(&mut out, self.quality.clamp(1, 100))
                    .write_image(
                        buffer.as_bytes(),
                        buffer.width(),
                        buffer.height(),
                        color_type(buffer.depth())?,
                    )
                    .map_err(|e| ImageError::Encode(e.to_string()))?;
            }
            OutputFormat::Png => {
                PngEncoder::new(&mut out)
                    .write_image(
                        buffer.as_bytes(),
                        buffer.width(),
                        buffer.height(),
                        color_type(buffer.depth())?,
                    )
                    .map_err(|e| ImageError::Encode(e.to_string()))?;
            }
        }
        Ok(out)
    }

    fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

fn color_type(depth: u32) -> Result<ColorType> {
    match depth {
        1 => Ok(ColorType::L8),
        2 => Ok(ColorType::La8),
        3 => Ok(ColorType::Rgb8),
        4 => Ok(ColorType::Rgba8),
        other => Err(ImageError::Encode(format!("no color type has {other} channels"))),
    }
}
