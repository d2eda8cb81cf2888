use crate::color::rgba::Color;
use crate::foundation::error::{TrailError, TrailResult};
use crate::palette::mapping::{NO_MATCH, PalMapping};
use crate::palette::palette::Palette;
use crate::raster::buffer::{ColorImage, IndexedImage};

/// Blur an indexed image in destination-palette index space and render it back to color.
///
/// Pixels are translated through `mapping` into `out_palette` indices, box blurred
/// horizontally then vertically with a `2 * radius + 1` window, and every blurred value is
/// turned back into a color by interpolating between the two bracketing `out_palette` entries.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(w = src.width(), h = src.height(), radius = radius)
)]
pub fn blur_indexed(
    mapping: &PalMapping,
    out_palette: &Palette,
    src: &IndexedImage,
    radius: u32,
) -> TrailResult<ColorImage> {
    if out_palette.is_empty() {
        return Err(TrailError::validation("blur needs a non-empty output palette"));
    }
    let grid = to_float_grid(mapping, src);
    let blurred = box_blur(&grid, src.width(), src.height(), radius)?;
    grid_to_colors(&blurred, src.width(), src.height(), out_palette)
}

/// Mapped index of every pixel as a float. Unmatched indices read as 0.
pub fn to_float_grid(mapping: &PalMapping, src: &IndexedImage) -> Vec<f32> {
    let mut bad = 0usize;
    let grid = src
        .pixels()
        .iter()
        .map(|&px| match mapping.to(usize::from(px)) {
            NO_MATCH => {
                bad += 1;
                0.0
            }
            to => f32::from(to),
        })
        .collect();
    if bad > 0 {
        tracing::warn!(bad, "pixels without a palette match read as index 0");
    }
    grid
}

/// Horizontal then vertical moving average.
///
/// Near the borders the window is clipped to the image instead of wrapping or zero padding, so
/// a constant field stays constant everywhere.
pub fn box_blur(grid: &[f32], width: u32, height: u32, radius: u32) -> TrailResult<Vec<f32>> {
    let (w, h) = (width as usize, height as usize);
    if grid.len() != w * h {
        return Err(TrailError::validation(
            "box_blur expects a grid of width*height values",
        ));
    }
    if radius == 0 {
        return Ok(grid.to_vec());
    }

    let mut tmp = vec![0.0f32; grid.len()];
    let mut out = vec![0.0f32; grid.len()];
    horizontal_pass(grid, &mut tmp, w, h, radius as usize);
    vertical_pass(&tmp, &mut out, w, h, radius as usize);
    Ok(out)
}

fn horizontal_pass(src: &[f32], dst: &mut [f32], w: usize, h: usize, r: usize) {
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        let out = &mut dst[y * w..(y + 1) * w];
        running_mean(w, r, |i| row[i], |i, v| out[i] = v);
    }
}

fn vertical_pass(src: &[f32], dst: &mut [f32], w: usize, h: usize, r: usize) {
    for x in 0..w {
        running_mean(h, r, |i| src[i * w + x], |i, v| dst[i * w + x] = v);
    }
}

/// Centered running mean over `len` samples; `count` tracks how many samples the clipped
/// window currently holds.
fn running_mean(
    len: usize,
    r: usize,
    read: impl Fn(usize) -> f32,
    mut write: impl FnMut(usize, f32),
) {
    if len == 0 {
        return;
    }
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for i in 0..=r.min(len - 1) {
        sum += read(i);
        count += 1;
    }
    for i in 0..len {
        write(i, sum / count as f32);
        let head = i + r + 1;
        if head < len {
            sum += read(head);
            count += 1;
        }
        if i >= r {
            sum -= read(i - r);
            count -= 1;
        }
    }
}

/// Color for a fractional palette position.
///
/// Values within 0.1 of the last entry (or past it) clamp to the last entry; everything else
/// interpolates between `floor(v)` and `floor(v) + 1`. Negative and NaN positions read as 0.
pub fn palette_color_at(palette: &Palette, v: f32) -> Color {
    let colors = palette.colors();
    let Some(&last) = colors.last() else {
        return Color::TRANSPARENT;
    };
    let v = if v.is_nan() { 0.0 } else { v.max(0.0) };
    let lo = v.floor() as usize;
    if lo + 1 >= colors.len() || v >= (colors.len() - 1) as f32 - 0.1 {
        return last;
    }
    colors[lo].lerp(colors[lo + 1], v - lo as f32)
}

pub fn grid_to_colors(
    grid: &[f32],
    width: u32,
    height: u32,
    palette: &Palette,
) -> TrailResult<ColorImage> {
    let pixels = grid.iter().map(|&v| palette_color_at(palette, v)).collect();
    ColorImage::from_pixels(width, height, pixels)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
