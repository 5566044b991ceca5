//! Indexed palettes for retro-style video surfaces.
//!
//! Pixel values are indices into a small color table; the table is what the
//! command stream rewrites, and frames are resolved through it on output.

use super::color::Rgb;
use serde::{Deserialize, Serialize};

/// Maps color indices to RGB values.
pub trait IndexedPalette {
    /// Get the color for a palette index. Out-of-range indices read as black.
    fn get_color(&self, index: usize) -> Rgb;

    /// Set the color for a palette index.
    ///
    /// Returns `true` only when the stored value actually changed. Writes to
    /// out-of-range indices are ignored.
    fn set_color(&mut self, index: usize, color: Rgb) -> bool;

    /// Get the number of colors in this palette.
    fn len(&self) -> usize;

    /// Check if the palette is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a palette index straight to opaque ARGB8888.
    fn argb(&self, index: usize) -> u32 {
        self.get_color(index).to_argb()
    }
}

/// A fixed-size palette stored inline, initialised to opaque black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedPalette<const N: usize> {
    #[serde(with = "serde_colors")]
    colors: [Rgb; N],
}

impl<const N: usize> FixedPalette<N> {
    pub fn new() -> Self {
        Self {
            colors: [Rgb::BLACK; N],
        }
    }

    /// Get a slice of all colors.
    pub fn colors(&self) -> &[Rgb; N] {
        &self.colors
    }
}

impl<const N: usize> Default for FixedPalette<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> IndexedPalette for FixedPalette<N> {
    fn get_color(&self, index: usize) -> Rgb {
        self.colors.get(index).copied().unwrap_or(Rgb::BLACK)
    }

    fn set_color(&mut self, index: usize, color: Rgb) -> bool {
        match self.colors.get_mut(index) {
            Some(slot) if *slot != color => {
                *slot = color;
                true
            }
            _ => false,
        }
    }

    fn len(&self) -> usize {
        N
    }
}

// serde only derives arrays up to 32 elements and not for const generics
mod serde_colors {
    use super::Rgb;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        colors: &[Rgb; N],
        s: S,
    ) -> Result<S::Ok, S::Error> {
        colors.as_slice().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<[Rgb; N], D::Error> {
        let v = Vec::<Rgb>::deserialize(d)?;
        let len = v.len();
        v.try_into()
            .map_err(|_| D::Error::invalid_length(len, &"a full palette"))
    }
}
