//! Transcoding backend trait and its error type.
//!
//! The [`ImageBackend`] trait covers the two codec-facing steps of a
//! conversion: decoding arbitrary input bytes and encoding the flattened
//! result as JPEG. Everything between them (compositing, choosing the output
//! media type) is backend-independent and lives in
//! [`operations`](super::operations).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! recording [`MockBackend`](tests::MockBackend) below.

use super::params::Quality;
use image::{DynamicImage, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Conversion failed: cannot decode image: {0}")]
    Decode(String),
    #[error("Conversion failed: cannot encode JPEG: {0}")]
    Encode(String),
}

/// Trait for transcoding backends.
///
/// `Sync` so one backend can serve many concurrent conversions.
pub trait ImageBackend: Sync {
    /// Decode `bytes` into pixels, picking the codec from the content.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ConversionError>;

    /// Encode opaque RGB pixels as a baseline JPEG.
    fn encode_jpeg(&self, image: &RgbImage, quality: Quality) -> Result<Vec<u8>, ConversionError>;
}
