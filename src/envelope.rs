//! Data-URL envelope codec.
//!
//! Images arrive as self-describing text values:
//!
//! ```text
//! data:<media-type>;base64,<base64-data>
//! ```
//!
//! [`parse`] splits such a value into its declared media type and the decoded
//! payload bytes; [`build`] puts them back together. The two are exact
//! inverses: `parse(&build(m, b))` yields `(m, b)` for any payload `b`.
//!
//! The grammar is deliberately narrow. The media type runs up to the first
//! `;` and must be followed by the literal `base64,` marker, so parameters
//! such as `;charset=utf-8` are rejected rather than silently skipped. The
//! data segment is decoded with the standard, padded alphabet; anything else
//! is a [`EnvelopeError::Decode`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::str::FromStr;
use thiserror::Error;

/// Required leading marker of every envelope.
pub const PREFIX: &str = "data:";

/// Encoding marker that must follow the media type's `;`.
const BASE64_MARKER: &str = "base64,";

#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// The text does not follow `data:<media-type>;base64,<data>`.
    #[error("Invalid data URL: {0}")]
    Format(String),
    /// The data segment is not valid base64.
    #[error("Failed to decode base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// A declared media type paired with the decoded payload bytes.
///
/// There is no way to obtain an `Envelope` holding bytes that failed to
/// decode: [`parse`] returns an error instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    media_type: String,
    payload: Vec<u8>,
}

impl Envelope {
    /// Wrap already-decoded bytes.
    pub fn new(media_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            payload,
        }
    }

    /// The media type the caller claimed. Advisory only; see [`crate::sniff`].
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.media_type, self.payload)
    }

    /// Re-serialize as a data URL. Equivalent to [`build`].
    pub fn to_data_url(&self) -> String {
        build(&self.media_type, &self.payload)
    }
}

impl FromStr for Envelope {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a data URL into an [`Envelope`].
///
/// An empty data segment is accepted and yields an empty payload, which keeps
/// `build` and `parse` inverse for zero-length payloads too.
pub fn parse(text: &str) -> Result<Envelope, EnvelopeError> {
    if text.is_empty() {
        return Err(EnvelopeError::Format("empty input".into()));
    }
    let rest = text
        .strip_prefix(PREFIX)
        .ok_or_else(|| EnvelopeError::Format(format!("must start with '{PREFIX}'")))?;

    let (media_type, data) = rest
        .split_once(';')
        .ok_or_else(|| EnvelopeError::Format("missing ';base64,' marker".into()))?;
    if media_type.is_empty() {
        return Err(EnvelopeError::Format("missing media type".into()));
    }
    let data = data
        .strip_prefix(BASE64_MARKER)
        .ok_or_else(|| EnvelopeError::Format("expected ';base64,' after media type".into()))?;

    let payload = STANDARD.decode(data)?;
    Ok(Envelope::new(media_type, payload))
}

/// Assemble a data URL from a media type and raw bytes.
pub fn build(media_type: &str, bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    format!("{PREFIX}{media_type};{BASE64_MARKER}{encoded}")
}
