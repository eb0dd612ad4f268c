//! Decode, resize, sharpen, blend, encode.

use crate::buffer::MIN_DIMENSION;
use crate::codec::{Codec, ImageCodec};
use crate::{blend, resample, sharpened, ImageError, Opacity, Result};
use serde::Serialize;
use tracing::{debug, info_span};

/// Validated request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformParams {
    /// Output width in pixels (at least 2)
    pub width: u32,
    /// Output height in pixels (at least 2)
    pub height: u32,
    /// Weight of the sharpened layer
    pub opacity: Opacity,
}

impl TransformParams {
    /// Validate raw request values. Out-of-range values are rejected, not clamped.
    ///
    /// # Example
    /// ```
    /// use pixmill_image::TransformParams;
    ///
    /// assert!(TransformParams::new(640, 360, 25).is_ok());
    /// assert!(TransformParams::new(1, 360, 25).is_err());
    /// assert!(TransformParams::new(640, 360, 101).is_err());
    /// ```
    pub fn new(width: u32, height: u32, sharpening: u32) -> Result<Self> {
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return Err(ImageError::DimensionsTooSmall { width, height });
        }
        Ok(Self {
            width,
            height,
            opacity: Opacity::new(sharpening)?,
        })
    }
}

/// Encoded output of one request.
#[derive(Debug, Clone, Serialize)]
pub struct Rendered {
    /// Encoded image
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// MIME type for the response
    pub content_type: &'static str,
}

/// One codec plus the resize/sharpen/blend chain.
#[derive(Debug, Clone, Default)]
pub struct Pipeline<C = ImageCodec> {
    codec: C,
}

impl<C: Codec> Pipeline<C> {
    /// Build a pipeline around a codec.
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    /// The codec in use.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Run one request start to finish.
    ///
    /// Every intermediate buffer is released as soon as the next stage owns
    /// its successor; on error, whatever is still live is dropped on the way
    /// out and nothing partial is returned.
    pub fn process(&self, data: &[u8], params: &TransformParams) -> Result<Rendered> {
        let _span = info_span!(
            "transform",
            width = params.width,
            height = params.height,
            opacity = params.opacity.get()
        )
        .entered();

        let mut source = self.codec.decode(data)?;
        debug!(
            width = source.width(),
            height = source.height(),
            depth = source.depth(),
            "decoded"
        );

        let mut resized = resample(&source, params.width, params.height)?;
        source.release();
        debug!(width = resized.width(), height = resized.height(), "resized");

        let mut working = sharpened(&resized)?;
        blend(&mut working, &resized, params.opacity)?;
        resized.release();
        debug!(opacity = %params.opacity, "sharpened and blended");

        let bytes = self.codec.encode(&working)?;
        let (width, height) = (working.width(), working.height());
        working.release();
        debug!(len = bytes.len(), "encoded");

        Ok(Rendered {
            bytes,
            width,
            height,
            content_type: self.codec.content_type(),
        })
    }
}

/// Run the pipeline with the default JPEG codec.
pub fn transform(data: &[u8], params: &TransformParams) -> Result<Rendered> {
    Pipeline::new(ImageCodec::default()).process(data, params)
}
