//! Reusable color and palette utilities for indexed video surfaces.

pub mod color;
pub mod palette;

pub use color::{ColorOps, Rgb};
pub use palette::{FixedPalette, IndexedPalette};
