//! Pure Rust transcoding backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image::load_from_memory` (format guessed from content) |
//! | Decode (AVIF, incl. alpha item) | `avif-parse` (container) + `rav1d` (AV1 decode) + custom YUV→RGB |
//! | Encode → JPEG | `jpeg-encoder` (single interleaved scan), then Huffman table optimization |
//!
//! AVIF decoding in the `image` crate needs `"avif-native"` (the C library
//! dav1d), so every ISO-BMFF payload is routed to the rav1d path instead.
//! HEIF/HEIC files carry HEVC, not AV1, and fail there with a decode error.
//!
//! YCbCr → RGB follows the matrix coefficients and colour range signalled in
//! the AV1 sequence header; unsignalled or unusual matrices fall back to
//! BT.601.

use super::backend::{ConversionError, ImageBackend};
use super::huffman;
use super::params::Quality;
use crate::sniff;
use image::{DynamicImage, RgbImage, RgbaImage};
use rav1d::include::dav1d::picture::Dav1dPicture;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ConversionError> {
        if sniff::is_iso_bmff(bytes) {
            return decode_avif(bytes);
        }
        image::load_from_memory(bytes).map_err(|e| ConversionError::Decode(e.to_string()))
    }

    fn encode_jpeg(&self, image: &RgbImage, quality: Quality) -> Result<Vec<u8>, ConversionError> {
        let (width, height) = jpeg_dimensions(image.width(), image.height())?;
        let mut out = Vec::new();
        jpeg_encoder::Encoder::new(&mut out, quality.as_u8())
            .encode(image.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
            .map_err(|e| ConversionError::Encode(e.to_string()))?;
        huffman::optimize(&out)
    }
}

/// JPEG stores dimensions as 16-bit values.
fn jpeg_dimensions(width: u32, height: u32) -> Result<(u16, u16), ConversionError> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(ConversionError::Encode(format!(
            "{width}x{height} exceeds the JPEG limit of 65535 pixels per side"
        ))),
    }
}

/// Decode an AVIF payload using avif-parse (container) + rav1d (AV1 decode).
///
/// When the container carries an alpha item it is decoded as a second AV1
/// frame and merged into an RGBA image.
fn decode_avif(bytes: &[u8]) -> Result<DynamicImage, ConversionError> {
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(bytes))
        .map_err(|e| ConversionError::Decode(format!("Failed to parse AVIF container: {e:?}")))?;

    let color = decode_av1(&avif.primary_item, read_color)?;
    let Some(alpha_bytes) = avif.alpha_item.as_deref() else {
        return color.into_image();
    };

    let alpha = decode_av1(alpha_bytes, read_luma)?;
    if (alpha.width, alpha.height) != (color.width, color.height) {
        tracing::warn!(
            color_width = color.width,
            color_height = color.height,
            alpha_width = alpha.width,
            alpha_height = alpha.height,
            "AVIF alpha plane size differs from colour plane, ignoring alpha"
        );
        return color.into_image();
    }

    let rgba: Vec<u8> = color
        .samples
        .chunks_exact(3)
        .zip(alpha.samples.iter())
        .flat_map(|(rgb, &a)| [rgb[0], rgb[1], rgb[2], a])
        .collect();
    RgbaImage::from_raw(color.width, color.height, rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| ConversionError::Decode("Failed to assemble RGBA image from AVIF".into()))
}

/// Interleaved 8-bit samples from one decoded AV1 frame.
struct Frame {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl Frame {
    fn into_image(self) -> Result<DynamicImage, ConversionError> {
        RgbImage::from_raw(self.width, self.height, self.samples)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| {
                ConversionError::Decode("Failed to create image from decoded AVIF data".into())
            })
    }
}

/// Run one AV1 payload through rav1d and hand the picture to `read`.
///
/// The decoder context and picture are released before returning, whether
/// or not `read` succeeds.
fn decode_av1<T>(
    av1_bytes: &[u8],
    read: impl FnOnce(&Dav1dPicture) -> Result<T, ConversionError>,
) -> Result<T, ConversionError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use std::ptr::NonNull;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr())
        .ok_or_else(|| ConversionError::Decode("rav1d settings allocation failed".into()))?;
    unsafe { rav1d::src::lib::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc =
        unsafe { rav1d::src::lib::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(ConversionError::Decode(format!("rav1d open failed ({})", rc.0)));
    }

    let mut data = Dav1dData::default();
    let buf_ptr =
        unsafe { rav1d::src::lib::dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf_ptr.is_null() {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(ConversionError::Decode("rav1d data_create failed".into()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf_ptr, av1_bytes.len()) };

    let rc = unsafe { rav1d::src::lib::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            rav1d::src::lib::dav1d_data_unref(NonNull::new(&mut data));
            rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(ConversionError::Decode(format!(
            "rav1d send_data failed ({})",
            rc.0
        )));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { rav1d::src::lib::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(ConversionError::Decode(format!(
            "rav1d get_picture failed ({})",
            rc.0
        )));
    }

    let result = read(&pic);

    unsafe {
        rav1d::src::lib::dav1d_picture_unref(NonNull::new(&mut pic));
        rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
    }
    result
}

fn plane_ptr(pic: &Dav1dPicture, index: usize) -> Result<*const u8, ConversionError> {
    pic.data[index]
        .map(|p| p.as_ptr() as *const u8)
        .ok_or_else(|| ConversionError::Decode(format!("AV1 picture has no plane {index}")))
}

/// Convert a decoded colour picture to interleaved RGB8.
fn read_color(pic: &Dav1dPicture) -> Result<Frame, ConversionError> {
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };

    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let y_ptr = plane_ptr(pic, 0)?;
    let color = ColorSpec::of(pic);

    let planes = if pic.p.layout == DAV1D_PIXEL_LAYOUT_I400 {
        YuvPlanes {
            y_ptr,
            u_ptr: y_ptr,
            v_ptr: y_ptr,
            y_stride: pic.stride[0],
            uv_stride: 0,
            width,
            height,
            color,
            ss_x: false,
            ss_y: false,
            monochrome: true,
        }
    } else {
        let (ss_x, ss_y) = match pic.p.layout {
            DAV1D_PIXEL_LAYOUT_I420 => (true, true),
            DAV1D_PIXEL_LAYOUT_I422 => (true, false),
            DAV1D_PIXEL_LAYOUT_I444 => (false, false),
            layout => {
                return Err(ConversionError::Decode(format!(
                    "Unsupported AVIF pixel layout: {layout}"
                )));
            }
        };
        YuvPlanes {
            y_ptr,
            u_ptr: plane_ptr(pic, 1)?,
            v_ptr: plane_ptr(pic, 2)?,
            y_stride: pic.stride[0],
            uv_stride: pic.stride[1],
            width,
            height,
            color,
            ss_x,
            ss_y,
            monochrome: false,
        }
    };

    Ok(Frame {
        width,
        height,
        samples: planes.to_rgb(),
    })
}

/// Read the luma plane of an auxiliary (alpha) picture as 8-bit samples.
fn read_luma(pic: &Dav1dPicture) -> Result<Frame, ConversionError> {
    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let y_ptr = plane_ptr(pic, 0)?;
    let color = ColorSpec::of(pic);

    let mut samples = Vec::with_capacity(sample_count(width, height, 1));
    for row in 0..height {
        for col in 0..width {
            let v = read_sample(y_ptr, pic.stride[0], col, row, color.bpc);
            samples.push(to_u8(color.luma(v)));
        }
    }
    Ok(Frame {
        width,
        height,
        samples,
    })
}

/// YCbCr matrix, as luma weights for red and blue.
#[derive(Debug, Clone, Copy, PartialEq)]
enum YuvMatrix {
    /// Planes hold G, B, R directly.
    Identity,
    Weights { kr: f32, kb: f32 },
}

impl YuvMatrix {
    const BT601: Self = Self::Weights { kr: 0.299, kb: 0.114 };
    const BT709: Self = Self::Weights {
        kr: 0.2126,
        kb: 0.0722,
    };

    fn from_av1(mc: rav1d::include::dav1d::headers::Dav1dMatrixCoefficients) -> Self {
        use rav1d::include::dav1d::headers::{
            DAV1D_MC_BT709, DAV1D_MC_BT2020_NCL, DAV1D_MC_FCC, DAV1D_MC_IDENTITY,
            DAV1D_MC_SMPTE240,
        };
        match mc {
            DAV1D_MC_IDENTITY => Self::Identity,
            DAV1D_MC_BT709 => Self::BT709,
            DAV1D_MC_FCC => Self::Weights { kr: 0.30, kb: 0.11 },
            DAV1D_MC_SMPTE240 => Self::Weights {
                kr: 0.212,
                kb: 0.087,
            },
            DAV1D_MC_BT2020_NCL => Self::Weights {
                kr: 0.2627,
                kb: 0.0593,
            },
            _ => Self::BT601,
        }
    }
}

/// How to turn decoded samples into RGB.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ColorSpec {
    matrix: YuvMatrix,
    /// `false` for studio range (16-235 luma, 16-240 chroma at 8 bits).
    full_range: bool,
    bpc: u32,
}

impl ColorSpec {
    fn of(pic: &Dav1dPicture) -> Self {
        let bpc = pic.p.bpc as u32;
        match pic.seq_hdr {
            // SAFETY: the sequence header lives as long as the picture reference.
            Some(hdr) => {
                let hdr = unsafe { hdr.as_ref() };
                Self {
                    matrix: YuvMatrix::from_av1(hdr.mtrx),
                    full_range: hdr.color_range != 0,
                    bpc,
                }
            }
            None => Self {
                matrix: YuvMatrix::BT601,
                full_range: true,
                bpc,
            },
        }
    }

    /// Scale of one 8-bit code value at this bit depth.
    fn step(&self) -> f32 {
        (1u32 << self.bpc.saturating_sub(8)) as f32
    }

    fn max(&self) -> f32 {
        ((1u32 << self.bpc) - 1) as f32
    }

    /// Luma (or an uncentred plane) normalized to 0..=1.
    fn luma(&self, y: f32) -> f32 {
        if self.full_range {
            y / self.max()
        } else {
            (y - 16.0 * self.step()) / (219.0 * self.step())
        }
    }

    /// Chroma normalized to -0.5..=0.5.
    fn chroma(&self, c: f32) -> f32 {
        let centered = c - 128.0 * self.step();
        if self.full_range {
            centered / self.max()
        } else {
            centered / (224.0 * self.step())
        }
    }

    fn to_rgb8(&self, y: f32, u: f32, v: f32) -> [u8; 3] {
        let (r, g, b) = match self.matrix {
            YuvMatrix::Identity => (self.luma(v), self.luma(y), self.luma(u)),
            YuvMatrix::Weights { kr, kb } => {
                let kg = 1.0 - kr - kb;
                let (y, cb, cr) = (self.luma(y), self.chroma(u), self.chroma(v));
                (
                    y + 2.0 * (1.0 - kr) * cr,
                    y - (2.0 * kb * (1.0 - kb) / kg) * cb - (2.0 * kr * (1.0 - kr) / kg) * cr,
                    y + 2.0 * (1.0 - kb) * cb,
                )
            }
        };
        [to_u8(r), to_u8(g), to_u8(b)]
    }
}

/// Interleaved sample count, computed in `usize` so large frames don't wrap.
fn sample_count(width: u32, height: u32, channels: usize) -> usize {
    width as usize * height as usize * channels
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Decoded YUV plane pointers from rav1d, ready for RGB conversion.
///
/// Only valid while the owning `Dav1dPicture` is referenced.
struct YuvPlanes {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    color: ColorSpec,
    /// Chroma subsampling: horizontal, vertical (e.g. I420 = true, true)
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

impl YuvPlanes {
    fn to_rgb(&self) -> Vec<u8> {
        let bpc = self.color.bpc;
        let mut rgb = Vec::with_capacity(sample_count(self.width, self.height, 3));

        for row in 0..self.height {
            for col in 0..self.width {
                let y = read_sample(self.y_ptr, self.y_stride, col, row, bpc);

                let px = if self.monochrome {
                    let v = to_u8(self.color.luma(y));
                    [v, v, v]
                } else {
                    let c_col = if self.ss_x { col / 2 } else { col };
                    let c_row = if self.ss_y { row / 2 } else { row };
                    let u = read_sample(self.u_ptr, self.uv_stride, c_col, c_row, bpc);
                    let v = read_sample(self.v_ptr, self.uv_stride, c_col, c_row, bpc);
                    self.color.to_rgb8(y, u, v)
                };

                rgb.extend_from_slice(&px);
            }
        }

        rgb
    }
}

/// Read one sample from a plane, handling both 8-bit and 16-bit storage.
#[inline]
fn read_sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        // 10-bit and 12-bit are stored as u16
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { (ptr.offset(byte_offset) as *const u16).read_unaligned() }) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        avif_bytes, gif_bytes, jpeg_bytes, palette_png_bytes, png_bytes, rgba_avif_bytes,
    };
    use image::{GenericImageView, ImageFormat, Rgba};

    #[test]
    fn decode_png_by_content() {
        let img = RustBackend::new().decode(&png_bytes(20, 10)).unwrap();
        assert_eq!(img.dimensions(), (20, 10));
    }

    #[test]
    fn decode_jpeg_by_content() {
        let img = RustBackend::new().decode(&jpeg_bytes(33, 17)).unwrap();
        assert_eq!(img.dimensions(), (33, 17));
    }

    #[test]
    fn decode_garbage_errors() {
        let result = RustBackend::new().decode(b"definitely not an image");
        assert!(matches!(result, Err(ConversionError::Decode(_))));
    }

    #[test]
    fn decode_truncated_png_errors() {
        let png = png_bytes(16, 16);
        let result = RustBackend::new().decode(&png[..png.len() / 2]);
        assert!(matches!(result, Err(ConversionError::Decode(_))));
    }

    #[test]
    fn decode_avif_roundtrip() {
        let decoded = RustBackend::new().decode(&avif_bytes(64, 48)).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn decode_avif_with_alpha_item() {
        let avif = rgba_avif_bytes(32, 32, |x, _| {
            if x < 16 {
                Rgba([255, 0, 0, 0])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let decoded = RustBackend::new().decode(&avif).unwrap();
        assert!(decoded.color().has_alpha());
        let rgba = decoded.to_rgba8();
        assert!(rgba.get_pixel(4, 16)[3] < 20);
        assert!(rgba.get_pixel(28, 16)[3] > 235);
    }

    #[test]
    fn decode_heic_brand_errors() {
        let heic = b"\x00\x00\x00\x18ftypheic\x00\x00\x00\x00mif1heic".to_vec();
        let result = RustBackend::new().decode(&heic);
        assert!(matches!(result, Err(ConversionError::Decode(_))));
    }

    #[test]
    fn decode_gif_palette_with_transparency_has_alpha() {
        let gif = gif_bytes(8, 8, |x, _| {
            if x < 4 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 0, 0, 255])
            }
        });
        let decoded = RustBackend::new().decode(&gif).unwrap();
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn decode_palette_png_expands_trns_to_alpha() {
        let palette = [([0, 0, 255], 0), ([0, 255, 0], 128), ([255, 255, 255], 255)];
        let png = palette_png_bytes(3, 1, &palette, &[0, 1, 2]);
        let rgba = RustBackend::new().decode(&png).unwrap().to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0)[3], 0);
        assert_eq!(*rgba.get_pixel(1, 0), Rgba([0, 255, 0, 128]));
        assert_eq!(*rgba.get_pixel(2, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn encode_jpeg_produces_decodable_output() {
        let img = RgbImage::from_fn(40, 30, |x, y| image::Rgb([x as u8 * 6, y as u8 * 8, 100]));
        let bytes = RustBackend::new()
            .encode_jpeg(&img, Quality::default())
            .unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[test]
    fn encode_jpeg_keeps_flat_colours() {
        let img = RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        let backend = RustBackend::new();
        for quality in [50, 85, 95, 100] {
            let bytes = backend.encode_jpeg(&img, Quality::new(quality)).unwrap();
            let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
                .unwrap()
                .to_rgb8();
            let white = decoded.get_pixel(4, 16);
            let black = decoded.get_pixel(28, 16);
            assert!(white.0.iter().all(|&c| c >= 250), "q{quality}: white came back {white:?}");
            assert!(black.0.iter().all(|&c| c <= 5), "q{quality}: black came back {black:?}");
        }
    }

    #[test]
    fn encode_jpeg_uses_image_specific_tables() {
        let img = RgbImage::from_fn(48, 48, |x, y| image::Rgb([(x * 5) as u8, (y * 5) as u8, 60]));
        let mut standard = Vec::new();
        jpeg_encoder::Encoder::new(&mut standard, 85)
            .encode(img.as_raw(), 48, 48, jpeg_encoder::ColorType::Rgb)
            .unwrap();
        let optimized = RustBackend::new().encode_jpeg(&img, Quality::new(85)).unwrap();
        assert!(optimized.len() < standard.len());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn sample_count_does_not_wrap_at_u32() {
        // 70000 * 70000 * 3 overflows u32.
        assert_eq!(sample_count(70_000, 70_000, 3), 14_700_000_000);
        assert_eq!(sample_count(0, 5, 3), 0);
    }

    #[test]
    fn full_range_bt601() {
        let spec = ColorSpec {
            matrix: YuvMatrix::BT601,
            full_range: true,
            bpc: 8,
        };
        assert_eq!(spec.to_rgb8(255.0, 128.0, 128.0), [255, 255, 255]);
        assert_eq!(spec.to_rgb8(0.0, 128.0, 128.0), [0, 0, 0]);
        assert_eq!(spec.to_rgb8(128.0, 128.0, 128.0), [128, 128, 128]);
    }

    #[test]
    fn limited_range_expands_to_full() {
        let spec = ColorSpec {
            matrix: YuvMatrix::BT601,
            full_range: false,
            bpc: 8,
        };
        assert_eq!(spec.to_rgb8(235.0, 128.0, 128.0), [255, 255, 255]);
        assert_eq!(spec.to_rgb8(16.0, 128.0, 128.0), [0, 0, 0]);

        let ten_bit = ColorSpec { bpc: 10, ..spec };
        assert_eq!(ten_bit.to_rgb8(940.0, 512.0, 512.0), [255, 255, 255]);
        assert_eq!(ten_bit.to_rgb8(64.0, 512.0, 512.0), [0, 0, 0]);
    }

    #[test]
    fn bt709_red_differs_from_bt601() {
        // Studio-range BT.709 encoding of pure red.
        let (y, cb, cr) = (63.0, 102.0, 240.0);
        let bt709 = ColorSpec {
            matrix: YuvMatrix::BT709,
            full_range: false,
            bpc: 8,
        };
        let [r, g, b] = bt709.to_rgb8(y, cb, cr);
        assert!(r >= 250 && g <= 5 && b <= 5, "got {:?}", [r, g, b]);

        let bt601 = ColorSpec {
            matrix: YuvMatrix::BT601,
            ..bt709
        };
        assert!(bt601.to_rgb8(y, cb, cr)[0] < 240);
    }

    #[test]
    fn identity_matrix_reads_gbr_planes() {
        let spec = ColorSpec {
            matrix: YuvMatrix::Identity,
            full_range: true,
            bpc: 8,
        };
        assert_eq!(spec.to_rgb8(10.0, 20.0, 30.0), [30, 10, 20]);
    }

    #[test]
    fn matrix_from_sequence_header() {
        use rav1d::include::dav1d::headers::{DAV1D_MC_BT709, DAV1D_MC_IDENTITY, DAV1D_MC_UNKNOWN};
        assert_eq!(YuvMatrix::from_av1(DAV1D_MC_BT709), YuvMatrix::BT709);
        assert_eq!(YuvMatrix::from_av1(DAV1D_MC_IDENTITY), YuvMatrix::Identity);
        assert_eq!(YuvMatrix::from_av1(DAV1D_MC_UNKNOWN), YuvMatrix::BT601);
    }

    #[test]
    fn higher_quality_is_not_smaller() {
        let img = RgbImage::from_fn(64, 64, |x, y| image::Rgb([(x * y) as u8, x as u8, y as u8]));
        let backend = RustBackend::new();
        let low = backend.encode_jpeg(&img, Quality::new(10)).unwrap();
        let high = backend.encode_jpeg(&img, Quality::new(100)).unwrap();
        assert!(high.len() >= low.len());
    }

    #[test]
    fn jpeg_dimension_limit() {
        assert_eq!(jpeg_dimensions(65535, 1).unwrap(), (65535, 1));
        assert!(matches!(
            jpeg_dimensions(65536, 1),
            Err(ConversionError::Encode(_))
        ));
    }
}
