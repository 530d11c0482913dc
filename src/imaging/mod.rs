//! Transcoding — pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` by content; AVIF via `avif-parse` + `rav1d` |
//! | **Flatten** | source-over blend onto white |
//! | **Encode** | `jpeg-encoder`, then image-specific Huffman tables |
//!
//! The module is split into:
//! - **Composite**: Pure pixel functions for flattening transparency (unit testable)
//! - **Parameters**: Quality, background, target media type
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Huffman**: lossless entropy re-coding of the encoder's output
//! - **Operations**: [`convert`], combining composite + backend

pub mod backend;
mod composite;
mod huffman;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{ConversionError, ImageBackend};
pub use operations::{ConversionResult, convert};
pub use params::{BACKGROUND, Quality, TARGET_MEDIA_TYPE};
pub use rust_backend::RustBackend;
