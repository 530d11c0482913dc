//! The normalization pipeline: the two entry points the host application calls.
//!
//! ```text
//! normalize:  text → parse → sniff → decide ─┬─ Keep ──────────────┬→ build → text
//!                                            └─ Transcode → convert ┘
//! describe:   text → parse → sniff → ImageInfo
//! ```
//!
//! [`normalize`] reports every failure as one [`ProcessingError`]; the host
//! maps it to a "bad request". The original [`EnvelopeError`] or
//! [`ConversionError`] stays reachable through [`std::error::Error::source`].
//!
//! [`describe`] cannot fail. Its signature returns an [`ImageInfo`], and any
//! parse error becomes [`ImageInfo::unknown`].
//!
//! Empty input text is treated the same as absent input by both entry points.

use crate::envelope::{self, Envelope, EnvelopeError};
use crate::imaging::{self, ConversionError, ImageBackend, Quality, RustBackend};
use crate::sniff::{self, ConversionDecision, ConversionPolicy};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Any failure of [`normalize`], with the underlying cause as its source.
#[derive(Error, Debug)]
#[error("Image processing failed: {cause}")]
pub struct ProcessingError {
    #[source]
    cause: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl From<EnvelopeError> for ProcessingError {
    fn from(err: EnvelopeError) -> Self {
        Self {
            cause: Box::new(err),
        }
    }
}

impl From<ConversionError> for ProcessingError {
    fn from(err: ConversionError) -> Self {
        Self {
            cause: Box::new(err),
        }
    }
}

/// Read-only report on an envelope. Serializes to
/// `{"type", "size", "format", "size_kb"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    /// Declared media type.
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// Payload length in bytes.
    pub size: usize,
    /// `"AVIF"` when the bytes say so, else the declared subtype uppercased.
    pub format: Option<String>,
    /// `size / 1024`, one decimal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_kb: Option<f64>,
}

impl ImageInfo {
    /// Report for absent input.
    pub fn absent() -> Self {
        Self {
            media_type: None,
            size: 0,
            format: None,
            size_kb: None,
        }
    }

    /// Report for input that could not be parsed.
    pub fn unknown() -> Self {
        Self {
            media_type: Some("unknown".to_string()),
            size: 0,
            format: Some("unknown".to_string()),
            size_kb: None,
        }
    }

    pub fn from_envelope(envelope: &Envelope) -> Self {
        let payload = envelope.payload();
        let declared = envelope.media_type();
        let format = if sniff::is_avif(payload) {
            "AVIF".to_string()
        } else {
            declared
                .rsplit('/')
                .next()
                .unwrap_or(declared)
                .to_uppercase()
        };
        Self {
            media_type: Some(declared.to_string()),
            size: payload.len(),
            format: Some(format),
            size_kb: Some(kilobytes(payload.len())),
        }
    }
}

fn kilobytes(bytes: usize) -> f64 {
    (bytes as f64 / 1024.0 * 10.0).round_ties_even() / 10.0
}

/// The orchestrator: a backend plus the deny-list policy.
///
/// Holds no per-call state, so one instance can serve concurrent callers.
pub struct Normalizer<B: ImageBackend = RustBackend> {
    backend: B,
    policy: ConversionPolicy,
}

impl Normalizer<RustBackend> {
    pub fn new() -> Self {
        Self::with_backend(RustBackend::new())
    }
}

impl Default for Normalizer<RustBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ImageBackend> Normalizer<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            policy: ConversionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ConversionPolicy {
        &self.policy
    }

    /// Make `input` displayable by the client.
    ///
    /// Absent or empty input passes through as `None`.
    pub fn normalize(
        &self,
        input: Option<&str>,
        quality: Quality,
    ) -> Result<Option<String>, ProcessingError> {
        let Some(text) = input.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let envelope = envelope::parse(text)?;
        let normalized = self.normalize_envelope(envelope, quality)?;
        Ok(Some(normalized.to_data_url()))
    }

    /// Transcode an already-parsed envelope if the policy asks for it,
    /// otherwise return it untouched.
    pub fn normalize_envelope(
        &self,
        envelope: Envelope,
        quality: Quality,
    ) -> Result<Envelope, ConversionError> {
        let sniffed = sniff::sniff(envelope.payload());
        if let Some(actual) = sniffed.media_type() {
            if !actual.eq_ignore_ascii_case(envelope.media_type()) {
                tracing::debug!(
                    declared = envelope.media_type(),
                    sniffed = actual,
                    "declared media type disagrees with payload"
                );
            }
        }

        match self.policy.decide(sniffed, envelope.media_type()) {
            ConversionDecision::Keep => Ok(envelope),
            ConversionDecision::Transcode(reason) => {
                tracing::debug!(
                    ?reason,
                    declared = envelope.media_type(),
                    bytes = envelope.payload().len(),
                    quality = quality.value(),
                    "transcoding"
                );
                let result = imaging::convert(&self.backend, envelope.payload(), quality)?;
                Ok(Envelope::new(result.media_type, result.bytes))
            }
        }
    }

    /// Normalize many independent inputs on the rayon pool.
    ///
    /// Results come back in input order; one failure does not affect the others.
    pub fn normalize_batch<S>(
        &self,
        inputs: &[Option<S>],
        quality: Quality,
    ) -> Vec<Result<Option<String>, ProcessingError>>
    where
        S: AsRef<str> + Sync,
    {
        inputs
            .par_iter()
            .map(|input| self.normalize(input.as_ref().map(|s| s.as_ref()), quality))
            .collect()
    }
}

/// [`Normalizer::normalize`] with the default backend and deny-list.
pub fn normalize(input: Option<&str>, quality: Quality) -> Result<Option<String>, ProcessingError> {
    Normalizer::new().normalize(input, quality)
}

/// Best-effort metadata for `input`. Never fails.
pub fn describe(input: Option<&str>) -> ImageInfo {
    let Some(text) = input.filter(|t| !t.is_empty()) else {
        return ImageInfo::absent();
    };
    match envelope::parse(text) {
        Ok(envelope) => ImageInfo::from_envelope(&envelope),
        Err(err) => {
            tracing::debug!(error = %err, "describe: unparseable input");
            ImageInfo::unknown()
        }
    }
}
