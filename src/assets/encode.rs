use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{TrailError, TrailResult};
use crate::raster::buffer::{ColorImage, IndexedImage, PixelBuffer};

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> TrailResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn format_for(path: &Path) -> image::ImageFormat {
    image::ImageFormat::from_path(path).unwrap_or(image::ImageFormat::Png)
}

/// Write a frame to `path`; the container follows the extension (PNG when unknown).
///
/// Indexed frames written as PNG stay indexed (PLTE plus tRNS when the palette carries
/// transparency); for other containers they are expanded to color first.
pub fn encode_file(path: &Path, buffer: &PixelBuffer) -> TrailResult<()> {
    ensure_parent_dir(path)?;
    let format = format_for(path);
    match buffer {
        PixelBuffer::Indexed(img) if format == image::ImageFormat::Png => {
            encode_indexed_png(path, img)
        }
        PixelBuffer::Indexed(img) => encode_color(path, &img.to_color(), true, format),
        PixelBuffer::Rgb(img) => encode_color(path, img, false, format),
        PixelBuffer::Rgba(img) => encode_color(path, img, true, format),
    }
}

fn encode_color(
    path: &Path,
    img: &ColorImage,
    alpha: bool,
    format: image::ImageFormat,
) -> TrailResult<()> {
    let keep_alpha = alpha && format != image::ImageFormat::Jpeg;
    let (bytes, color_type) = if keep_alpha {
        (img.to_rgba8(), image::ColorType::Rgba8)
    } else {
        (img.to_rgb8(), image::ColorType::Rgb8)
    };
    image::save_buffer_with_format(
        path,
        &bytes,
        img.width(),
        img.height(),
        color_type,
        format,
    )
    .with_context(|| format!("write image '{}'", path.display()))?;
    Ok(())
}

fn encode_indexed_png(path: &Path, img: &IndexedImage) -> TrailResult<()> {
    let palette = img.palette();
    if palette.is_empty() {
        return Err(TrailError::encode(format!(
            "{}: indexed image without palette",
            path.display()
        )));
    }
    let plte: Vec<u8> = palette.iter().flat_map(|c| [c.r, c.g, c.b]).collect();

    let file = File::create(path).with_context(|| format!("create '{}'", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), img.width(), img.height());
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(plte);
    if palette.has_transparency() {
        let trns: Vec<u8> = palette.iter().map(|c| c.a).collect();
        encoder.set_trns(trns);
    }
    let mut writer = encoder
        .write_header()
        .map_err(|e| TrailError::encode(format!("{}: png header: {e}", path.display())))?;
    writer
        .write_image_data(img.pixels())
        .map_err(|e| TrailError::encode(format!("{}: png data: {e}", path.display())))?;
    writer
        .finish()
        .map_err(|e| TrailError::encode(format!("{}: png finish: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/encode.rs"]
mod tests;
