//! Color helpers for indexed graphics.
//!
//! Palette entries are kept as plain 8-bit-per-channel RGB triples; output
//! frames use ARGB8888 (0xAARRGGBB).

use serde::{Deserialize, Serialize};

/// An opaque 24-bit color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from three 4-bit channels (0-15 each).
    ///
    /// Each channel is widened with `n * 17`, so 0 maps to 0 and 15 to 255.
    pub fn from_rgb444(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: ColorOps::expand_nibble(r),
            g: ColorOps::expand_nibble(g),
            b: ColorOps::expand_nibble(b),
        }
    }

    /// Pack as fully opaque ARGB8888
    #[inline]
    pub fn to_argb(self) -> u32 {
        ColorOps::from_rgb(self.r, self.g, self.b)
    }
}

/// Color operation utilities
pub struct ColorOps;

impl ColorOps {
    /// Widen a 4-bit channel to 8 bits. Bits above the low nibble are ignored.
    #[inline]
    pub fn expand_nibble(n: u8) -> u8 {
        (n & 0x0F) * 17
    }

    /// Extract red channel from ARGB color
    #[inline]
    pub fn red(color: u32) -> u8 {
        ((color >> 16) & 0xFF) as u8
    }

    /// Extract green channel from ARGB color
    #[inline]
    pub fn green(color: u32) -> u8 {
        ((color >> 8) & 0xFF) as u8
    }

    /// Extract blue channel from ARGB color
    #[inline]
    pub fn blue(color: u32) -> u8 {
        (color & 0xFF) as u8
    }

    /// Extract alpha channel from ARGB color
    #[inline]
    pub fn alpha(color: u32) -> u8 {
        ((color >> 24) & 0xFF) as u8
    }

    /// Construct RGB color with full alpha
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> u32 {
        0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_nibble() {
        assert_eq!(ColorOps::expand_nibble(0), 0);
        assert_eq!(ColorOps::expand_nibble(1), 17);
        assert_eq!(ColorOps::expand_nibble(8), 136);
        assert_eq!(ColorOps::expand_nibble(15), 255);
        // Upper nibble is masked off
        assert_eq!(ColorOps::expand_nibble(0xF1), 17);
    }

    #[test]
    fn test_color_component_extraction() {
        let color = 0xAABBCCDD;

        assert_eq!(ColorOps::alpha(color), 0xAA);
        assert_eq!(ColorOps::red(color), 0xBB);
        assert_eq!(ColorOps::green(color), 0xCC);
        assert_eq!(ColorOps::blue(color), 0xDD);
    }

    #[test]
    fn test_rgb_to_argb() {
        assert_eq!(Rgb::new(0xBB, 0xCC, 0xDD).to_argb(), 0xFFBBCCDD);
        assert_eq!(Rgb::BLACK.to_argb(), 0xFF000000);
    }

    #[test]
    fn test_from_rgb444() {
        assert_eq!(Rgb::from_rgb444(15, 0, 0), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_rgb444(1, 2, 3), Rgb::new(17, 34, 51));
    }
}
