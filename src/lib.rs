//! # Image Normalizer
//!
//! Makes client-supplied images displayable by a client that only renders a
//! fixed set of formats. Images arrive as data URLs
//! (`data:<media-type>;base64,<data>`); the declared media type is treated as
//! a hint, the bytes are inspected to find the real format, and anything the
//! client cannot show is re-encoded as JPEG with transparency flattened onto
//! white.
//!
//! # Architecture: Parse → Sniff → Transcode → Build
//!
//! ```text
//! 1. Envelope   text   →  (media type, bytes)
//! 2. Sniff      bytes  →  SniffedFormat → Keep | Transcode(reason)
//! 3. Transcode  bytes  →  JPEG bytes             (only when needed)
//! 4. Envelope   (media type, bytes) → text
//! ```
//!
//! Every stage is a pure function of its input. There is no state between
//! calls, so a single [`Normalizer`] can be shared by any number of threads.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`envelope`] | Data-URL parsing and building |
//! | [`sniff`] | Magic-byte detection and the two-stage conversion decision |
//! | [`imaging`] | Decoding (incl. AVIF via rav1d), compositing, JPEG encoding |
//! | [`pipeline`] | The `normalize` / `describe` entry points and batch processing |
//! | [`config`] | TOML config loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Bytes Over Labels
//!
//! Browsers and phones happily label an AVIF file `image/jpeg`. A payload
//! whose `ftyp` box carries the `avif` brand is transcoded no matter what it
//! declares. The declared type still matters for the formats sniffing does
//! not single out: a payload declared as HEIF/HEIC is transcoded even if its
//! bytes look like something else.
//!
//! ## No Needless Re-encoding
//!
//! A payload that needs no conversion is rebuilt from the same media type and
//! bytes, which yields text identical to the input. JPEG generation loss only
//! happens when it buys compatibility.
//!
//! ## Pure-Rust Codecs
//!
//! Decoding uses the `image` crate plus `avif-parse` and `rav1d` for AVIF;
//! encoding uses `jpeg-encoder`. No C libraries, no system packages.
//!
//! ## Best-Effort Introspection
//!
//! [`describe`] returns an [`ImageInfo`] rather than a `Result`. Metadata
//! queries must never interrupt the caller, so unparseable input yields
//! [`ImageInfo::unknown`] by construction instead of by catching errors.

pub mod config;
pub mod envelope;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod sniff;

pub use envelope::{Envelope, EnvelopeError};
pub use imaging::{ConversionError, Quality};
pub use pipeline::{ImageInfo, Normalizer, ProcessingError, describe, normalize};
pub use sniff::SniffedFormat;

#[cfg(test)]
pub(crate) mod test_helpers;
