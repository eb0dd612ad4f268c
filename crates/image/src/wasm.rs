//! WASM bindings for the transform pipeline.
//!
//! Lets a JavaScript or edge-worker host hand over fetched bytes and the
//! parsed query values, and get back the encoded image.

use crate::{transform as run_transform, ImageCodec, TransformParams};
use wasm_bindgen::prelude::*;

/// Resize, sharpen and re-encode an image as JPEG.
///
/// # Arguments
/// * `data` - Compressed source image
/// * `width` - Output width (at least 2)
/// * `height` - Output height (at least 2)
/// * `sharpening` - Sharpening opacity (0-100)
///
/// # Returns
/// Encoded image as Uint8Array, or an error message
#[wasm_bindgen]
pub fn transform(data: &[u8], width: u32, height: u32, sharpening: u32) -> Result<Vec<u8>, JsValue> {
    let params = TransformParams::new(width, height, sharpening)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    run_transform(data, &params)
        .map(|rendered| rendered.bytes)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// MIME type of what [`transform`] returns.
#[wasm_bindgen]
pub fn content_type() -> String {
    use crate::Codec;
    ImageCodec::default().content_type().to_string()
}
