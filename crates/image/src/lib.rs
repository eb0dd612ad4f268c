//! On-the-fly image transformation for pixmill.
//!
//! This crate provides:
//! - Owned pixel buffers with checked allocation and explicit release
//! - Fixed-point bilinear resampling
//! - 3x3 sharpening convolution
//! - Opacity-weighted blending of the sharpened and original layers
//! - A codec boundary over the `image` crate, with format detection
//! - The pipeline tying them together, plus TOML configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use pixmill_image::{transform, TransformParams};
//!
//! let jpeg = std::fs::read("photo.jpg").unwrap();
//! let params = TransformParams::new(640, 360, 25).unwrap();
//! let rendered = transform(&jpeg, &params).unwrap();
//! std::fs::write("photo-640.jpg", &rendered.bytes).unwrap();
//! ```

#![warn(missing_docs)]

pub mod alpha;
mod blend;
mod buffer;
mod codec;
pub mod config;
mod detect;
mod error;
mod pipeline;
mod resample;
mod sharpen;

#[cfg(feature = "wasm")]
mod wasm;

pub use blend::{blend, Opacity, OPACITY_MAX};
pub use buffer::{PixelBuffer, Shape, MIN_DIMENSION};
pub use codec::{Codec, ImageCodec, OutputFormat};
pub use config::{Config, ConfigSchema};
pub use detect::{detect_format, ImageFormat};
pub use error::{ErrorKind, ImageError, Result};
pub use pipeline::{transform, Pipeline, Rendered, TransformParams};
pub use resample::{resample, resize, THETA};
pub use sharpen::{sharpen, sharpened};
