//! High-level transcoding.
//!
//! Combines the backend's codec steps with the pure compositing in
//! [`composite`](super::composite): decode → flatten onto white → encode JPEG.

use super::backend::{ConversionError, ImageBackend};
use super::composite::flatten_onto;
use super::params::{BACKGROUND, Quality, TARGET_MEDIA_TYPE};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Transcoded bytes plus the media type they are encoded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

/// Decode `bytes`, flatten any transparency onto white and re-encode as JPEG.
///
/// The output keeps the source's pixel dimensions.
pub fn convert(
    backend: &impl ImageBackend,
    bytes: &[u8],
    quality: Quality,
) -> Result<ConversionResult> {
    let decoded = backend.decode(bytes)?;
    tracing::debug!(
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "decoded image for transcoding"
    );
    let flattened = flatten_onto(decoded, BACKGROUND);
    let bytes = backend.encode_jpeg(&flattened, quality)?;
    Ok(ConversionResult {
        bytes,
        media_type: TARGET_MEDIA_TYPE,
    })
}
