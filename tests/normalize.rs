//! End-to-end scenarios against the public API.
//!
//! Payloads are generated in memory with the `image` crate's encoders.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use image_normalizer::envelope::{self, EnvelopeError};
use image_normalizer::{ImageInfo, Normalizer, Quality, describe, normalize};
use std::error::Error as _;
use std::io::Cursor;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 16) as u8, (y * 16) as u8, 200])
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn avif(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(&mut buf, 10, 85);
    img.write_with_encoder(encoder).unwrap();
    buf
}

fn decode_output(text: &str) -> (String, DynamicImage) {
    let (media_type, bytes) = envelope::parse(text).unwrap().into_parts();
    let img = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
    (media_type, img)
}

#[test]
fn avif_input_becomes_jpeg_of_same_size() {
    let input = envelope::build("image/avif", &avif(&gradient(16, 16)));
    let output = normalize(Some(&input), Quality::default()).unwrap().unwrap();

    let (media_type, img) = decode_output(&output);
    assert_eq!(media_type, "image/jpeg");
    assert_eq!((img.width(), img.height()), (16, 16));
}

#[test]
fn mislabelled_avif_is_still_converted() {
    for declared in ["image/png", "image/jpeg", "application/octet-stream"] {
        let input = envelope::build(declared, &avif(&gradient(20, 12)));
        let output = normalize(Some(&input), Quality::default()).unwrap().unwrap();
        let (media_type, img) = decode_output(&output);
        assert_eq!(media_type, "image/jpeg", "declared {declared}");
        assert_eq!((img.width(), img.height()), (20, 12));
    }
}

#[test]
fn transparent_avif_is_flattened_onto_white() {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(32, 32, |x, _| {
        if x < 16 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([0, 0, 0, 255])
        }
    }));
    let input = envelope::build("image/avif", &avif(&img));
    let output = normalize(Some(&input), Quality::new(95)).unwrap().unwrap();

    let (_, jpeg) = decode_output(&output);
    let jpeg = jpeg.to_rgb8();
    assert!(jpeg.get_pixel(3, 16).0.iter().all(|&c| c > 220));
    assert!(jpeg.get_pixel(28, 16).0.iter().all(|&c| c < 40));
}

#[test]
fn opaque_png_is_returned_byte_identical() {
    let input = envelope::build("image/png", &encode(&gradient(16, 16), ImageFormat::Png));
    let output = normalize(Some(&input), Quality::default()).unwrap();
    assert_eq!(output.as_deref(), Some(input.as_str()));
}

#[test]
fn jpeg_is_returned_byte_identical() {
    let input = envelope::build("image/jpeg", &encode(&gradient(9, 7), ImageFormat::Jpeg));
    let output = normalize(Some(&input), Quality::new(10)).unwrap();
    assert_eq!(output.as_deref(), Some(input.as_str()));
}

#[test]
fn png_declared_as_heic_is_transcoded() {
    let input = envelope::build("image/heic", &encode(&gradient(10, 10), ImageFormat::Png));
    let output = normalize(Some(&input), Quality::default()).unwrap().unwrap();
    let (media_type, img) = decode_output(&output);
    assert_eq!(media_type, "image/jpeg");
    assert_eq!((img.width(), img.height()), (10, 10));
}

#[test]
fn absent_input() {
    assert_eq!(normalize(None, Quality::default()).unwrap(), None);
    let info = describe(None);
    assert_eq!(info, ImageInfo::absent());
    assert_eq!(info.media_type, None);
    assert_eq!(info.size, 0);
    assert_eq!(info.format, None);
}

#[test]
fn not_a_data_url() {
    let err = normalize(Some("not-a-data-url"), Quality::default()).unwrap_err();
    assert!(err.to_string().starts_with("Image processing failed"));

    let info = describe(Some("not-a-data-url"));
    assert_eq!(info.media_type.as_deref(), Some("unknown"));
    assert_eq!(info.size, 0);
    assert_eq!(info.format.as_deref(), Some("unknown"));
}

#[test]
fn corrupted_base64_reports_decode_failure() {
    let err = normalize(Some("data:image/png;base64,!!!!"), Quality::default()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("decode base64"), "{message}");
    assert!(!message.contains("Conversion"), "{message}");
    assert!(matches!(
        err.source().and_then(|e| e.downcast_ref::<EnvelopeError>()),
        Some(EnvelopeError::Decode(_))
    ));
}

#[test]
fn describe_reports_sniffed_avif() {
    let bytes = avif(&gradient(8, 8));
    let info = describe(Some(&envelope::build("image/webp", &bytes)));
    assert_eq!(info.media_type.as_deref(), Some("image/webp"));
    assert_eq!(info.format.as_deref(), Some("AVIF"));
    assert_eq!(info.size, bytes.len());
}

#[test]
fn normalizer_is_shareable_across_threads() {
    let normalizer = Normalizer::new();
    let png = envelope::build("image/png", &encode(&gradient(4, 4), ImageFormat::Png));
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let out = normalizer.normalize(Some(&png), Quality::default()).unwrap();
                assert_eq!(out.as_deref(), Some(png.as_str()));
            });
        }
    });
}
