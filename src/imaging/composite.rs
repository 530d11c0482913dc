//! Pure pixel math for flattening images onto an opaque background.
//!
//! JPEG has no alpha channel. Anything with transparency is blended onto
//! [`BACKGROUND`](super::params::BACKGROUND) before encoding; images without
//! alpha are only converted to 8-bit RGB. Palette-indexed inputs reach this
//! module already expanded by their decoders (PNG with a `tRNS` chunk and GIF
//! decode to RGBA), so they take the alpha path.

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};

/// Flatten `image` to opaque 8-bit RGB, compositing any alpha onto `background`.
pub fn flatten_onto(image: DynamicImage, background: Rgb<u8>) -> RgbImage {
    if image.color().has_alpha() {
        composite(&image.into_rgba8(), background)
    } else {
        image.into_rgb8()
    }
}

/// Source-over blend of every pixel onto a solid background of the same size.
fn composite(rgba: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let [br, bg, bb] = background.0;
        Rgb([blend(r, br, a), blend(g, bg, a), blend(b, bb, a)])
    })
}

#[inline]
fn blend(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8
}
