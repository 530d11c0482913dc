//! Format sniffing and the conversion decision.
//!
//! The media type inside an envelope is whatever the client claimed. The
//! bytes are what actually gets decoded. Deciding whether an image must be
//! transcoded therefore happens in two explicit stages:
//!
//! 1. **Structural** — [`sniff`] reads fixed-offset magic bytes and produces a
//!    [`SniffedFormat`]. An AVIF signature always forces conversion, whatever
//!    the declared type says.
//! 2. **Advisory** — when the bytes are not AVIF, the declared media type is
//!    checked against a deny-list of types the client cannot render
//!    ([`ConversionPolicy`]).
//!
//! Keeping the stages separate lets each one be tested on its own, and keeps
//! the "bytes win over labels" rule visible in [`ConversionPolicy::decide`].

use image::ImageFormat;

/// ISO-BMFF box type at offset 4 of every `ftyp`-led container.
const FTYP: &[u8; 4] = b"ftyp";

/// Major brand at offset 8 identifying an AVIF still image.
const AVIF_BRAND: &[u8; 4] = b"avif";

/// Bytes needed to read the box type and major brand.
const SIGNATURE_LEN: usize = 12;

/// Media types the client is known not to render.
pub const DEFAULT_UNSUPPORTED_MEDIA_TYPES: &[&str] = &["image/avif", "image/heif", "image/heic"];

/// Format determined from the payload bytes, independent of the declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffedFormat {
    /// `ftyp` box with the `avif` major brand.
    Avif,
    /// Some other format recognized by its magic number.
    Other(ImageFormat),
    Unknown,
}

impl SniffedFormat {
    /// Canonical MIME type, if the format has one.
    pub fn media_type(self) -> Option<&'static str> {
        match self {
            SniffedFormat::Avif => Some(ImageFormat::Avif.to_mime_type()),
            SniffedFormat::Other(format) => Some(format.to_mime_type()),
            SniffedFormat::Unknown => None,
        }
    }
}

/// True when `bytes` start with an `ftyp` box, i.e. an ISO-BMFF container
/// (AVIF, HEIF, HEIC, MP4...).
pub fn is_iso_bmff(bytes: &[u8]) -> bool {
    bytes.len() >= SIGNATURE_LEN && &bytes[4..8] == FTYP
}

/// True only for an `ftyp` box at offset 4 carrying the `avif` brand at
/// offset 8. No further parsing of the container.
pub fn is_avif(bytes: &[u8]) -> bool {
    is_iso_bmff(bytes) && &bytes[8..12] == AVIF_BRAND
}

/// Classify `bytes` by magic number.
pub fn sniff(bytes: &[u8]) -> SniffedFormat {
    if is_avif(bytes) {
        return SniffedFormat::Avif;
    }
    match image::guess_format(bytes) {
        Ok(format) => SniffedFormat::Other(format),
        Err(_) => SniffedFormat::Unknown,
    }
}

/// Why an image is being transcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionReason {
    /// The bytes carry an AVIF signature.
    SniffedAvif,
    /// The declared media type is on the deny-list.
    DeclaredUnsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionDecision {
    Keep,
    Transcode(ConversionReason),
}

impl ConversionDecision {
    pub fn needs_conversion(self) -> bool {
        matches!(self, ConversionDecision::Transcode(_))
    }
}

/// Deny-list of declared media types that must be transcoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPolicy {
    unsupported: Vec<String>,
}

impl ConversionPolicy {
    pub fn new<I, S>(unsupported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            unsupported: unsupported
                .into_iter()
                .map(|m| normalize_media_type(m.as_ref()))
                .collect(),
        }
    }

    /// Whether `declared` is on the deny-list. Comparison ignores ASCII case
    /// and surrounding whitespace.
    pub fn is_unsupported(&self, declared: &str) -> bool {
        let declared = normalize_media_type(declared);
        self.unsupported.iter().any(|m| *m == declared)
    }

    /// Combine the structural and advisory signals.
    ///
    /// A sniffed AVIF is always transcoded. Otherwise the declared type
    /// decides, even if the bytes look like something the client can render.
    pub fn decide(&self, sniffed: SniffedFormat, declared: &str) -> ConversionDecision {
        if sniffed == SniffedFormat::Avif {
            return ConversionDecision::Transcode(ConversionReason::SniffedAvif);
        }
        if self.is_unsupported(declared) {
            return ConversionDecision::Transcode(ConversionReason::DeclaredUnsupported);
        }
        ConversionDecision::Keep
    }
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_UNSUPPORTED_MEDIA_TYPES)
    }
}

fn normalize_media_type(media_type: &str) -> String {
    media_type.trim().to_ascii_lowercase()
}

/// Shorthand for [`ConversionPolicy::default`] applied to raw bytes.
pub fn needs_conversion(bytes: &[u8], declared_media_type: &str) -> bool {
    ConversionPolicy::default()
        .decide(sniff(bytes), declared_media_type)
        .needs_conversion()
}
