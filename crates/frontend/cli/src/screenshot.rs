// Writes rendered frames as PNG files.

use anyhow::{Context, Result};
use kh_core::types::Frame;
use std::fs;
use std::io;
use std::path::Path;

/// Save `frame` as an 8-bit RGB PNG, creating parent directories as needed.
pub fn save_png(path: &Path, frame: &Frame) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }

    let file =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let w = io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, frame.width, frame.height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&frame.to_rgb8())?;
    Ok(())
}
