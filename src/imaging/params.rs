//! Parameter types for the transcoder.
//!
//! - [`Quality`] — JPEG encoding quality (1–100, default 85). Clamped on construction.
//! - [`BACKGROUND`] — opaque colour transparent pixels are flattened onto.
//! - [`TARGET_MEDIA_TYPE`] — the one output format every client renders.

use image::Rgb;

/// Media type of every transcoded image.
pub const TARGET_MEDIA_TYPE: &str = "image/jpeg";

/// Background for compositing away transparency.
pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The value as the encoder takes it. Always fits: the range is 1-100.
    pub(crate) fn as_u8(self) -> u8 {
        self.0 as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_85() {
        assert_eq!(Quality::default().value(), 85);
    }

    #[test]
    fn quality_fits_encoder_byte() {
        assert_eq!(Quality::new(u32::MAX).as_u8(), 100);
        assert_eq!(Quality::new(1).as_u8(), 1);
    }
}
