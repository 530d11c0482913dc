//! Shared test utilities for the image-normalizer test suite.
//!
//! Builds small synthetic images in memory with the `image` crate's own
//! encoders, so no fixture files are needed.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let url = data_url("image/avif", &avif_bytes(16, 16));
//! let out = normalize(Some(&url), Quality::default()).unwrap().unwrap();
//! assert!(out.starts_with("data:image/jpeg;base64,"));
//! ```

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Pixel sources
// =========================================================================

/// Deterministic opaque gradient.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

// =========================================================================
// Encoded payloads
// =========================================================================

/// Opaque PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Png)
}

/// RGBA PNG with per-pixel colour from `f`.
pub fn rgba_png_bytes(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgba<u8>) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, f);
    encode(&DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// Baseline JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Jpeg)
}

/// Palette-indexed GIF; pixels with alpha 0 map to the transparent index.
pub fn gif_bytes(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgba<u8>) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, f);
    encode(&DynamicImage::ImageRgba8(img), ImageFormat::Gif)
}

/// Indexed PNG with a `tRNS` chunk: one palette entry per `(rgb, alpha)`
/// pair, pixels given as palette indices in row order.
pub fn palette_png_bytes(
    width: u32,
    height: u32,
    palette: &[([u8; 3], u8)],
    indices: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut encoder = png::Encoder::new(&mut buf, width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(palette.iter().flat_map(|(rgb, _)| *rgb).collect::<Vec<u8>>());
    encoder.set_trns(palette.iter().map(|(_, a)| *a).collect::<Vec<u8>>());
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(indices).unwrap();
    writer.finish().unwrap();
    buf
}

/// Opaque AVIF, encoded through the `image` crate's rav1e encoder.
pub fn avif_bytes(width: u32, height: u32) -> Vec<u8> {
    avif_from(&DynamicImage::ImageRgb8(gradient(width, height)))
}

/// AVIF with an alpha item.
pub fn rgba_avif_bytes(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgba<u8>) -> Vec<u8> {
    avif_from(&DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, f)))
}

fn avif_from(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(&mut buf, 10, 85);
    img.write_with_encoder(encoder).unwrap();
    buf
}

/// Wrap bytes in a data URL.
pub fn data_url(media_type: &str, bytes: &[u8]) -> String {
    crate::envelope::build(media_type, bytes)
}

#[test]
fn synthetic_avif_carries_avif_signature() {
    assert!(crate::sniff::is_avif(&avif_bytes(8, 8)));
}
