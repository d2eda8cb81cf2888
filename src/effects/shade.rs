//! Slope shading: brighten or darken pixels from the local gradient of their intensity.
//!
//! Intensity is the pixel's position in an ordered palette, so a step up the radar scale
//! reads as a lit edge and a step down as a shadow. Truecolor inputs use the red channel.

use std::str::FromStr;

use crate::color::rgba::Color;
use crate::effects::blur::{box_blur, palette_color_at, to_float_grid};
use crate::foundation::error::{TrailError, TrailResult};
use crate::palette::mapping::MappingCache;
use crate::palette::palette::Palette;
use crate::raster::buffer::{ColorImage, IndexedImage};

const SLOPE_GAIN: f32 = 4.0;
const SMOOTHED_GAIN: f32 = 8.0;
const BLURRED_GAIN: f32 = 100.0;
const BLURRED_RADIUS: u32 = 2;

/// Which shading variant to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShadeKind {
    /// One-pixel slope against the left and upper neighbors.
    #[default]
    Slope,
    /// Slope averaged with the previous column and row estimates.
    Smoothed,
    /// Slope on a box-blurred intensity grid.
    Blurred,
}

impl FromStr for ShadeKind {
    type Err = TrailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slope" | "xy1" | "1" => Ok(Self::Slope),
            "smoothed" | "xy2" | "2" => Ok(Self::Smoothed),
            "blurred" | "xy3" | "3" => Ok(Self::Blurred),
            other => Err(TrailError::config(format!("unknown shade variant '{other}'"))),
        }
    }
}

/// Shared interface of the shading variants, selected once per run.
pub trait Shader: Send {
    fn name(&self) -> &'static str;

    /// Shade an indexed image into a new color image, colors taken from the image's own palette.
    fn shade_indexed(&mut self, src: &IndexedImage) -> TrailResult<ColorImage>;

    /// Shade a color image in place.
    fn shade_color(&mut self, img: &mut ColorImage) -> TrailResult<()>;
}

/// Build the shader for `kind` against the configured output palette.
pub fn create_shader(kind: ShadeKind, out_palette: &Palette) -> TrailResult<Box<dyn Shader>> {
    if out_palette.is_empty() {
        return Err(TrailError::config("shading needs a non-empty output palette"));
    }
    Ok(match kind {
        ShadeKind::Slope => Box::new(SlopeShader::new(intensity_palette(out_palette)?)),
        ShadeKind::Smoothed => Box::new(SmoothedSlopeShader::new(intensity_palette(out_palette)?)),
        ShadeKind::Blurred => Box::new(BlurredSlopeShader::new(out_palette.clone())),
    })
}

/// Continuous intensity ramp used to rank palette entries.
///
/// Black, white and transparent are taken out, the remainder is spread into a dense gradient,
/// then transparent is put back at index 0 and black and white at the very end.
pub fn intensity_palette(out_palette: &Palette) -> TrailResult<Palette> {
    let mut core = out_palette.clone();
    core.remove(Color::BLACK);
    core.remove(Color::WHITE);
    core.remove(Color::TRANSPARENT);
    let mut ramp = core.spread(core.len(), 253);
    ramp.insert(0, Color::TRANSPARENT)?;
    ramp.push(Color::BLACK)?;
    ramp.push(Color::WHITE)?;
    Ok(ramp)
}

fn ranks(cache: &mut MappingCache, src: &IndexedImage) -> Vec<i32> {
    let lut = cache.get(src.palette()).lut();
    src.pixels()
        .iter()
        .map(|&px| i32::from(lut[usize::from(px)]))
        .collect()
}

fn check_palette(src: &IndexedImage) -> TrailResult<()> {
    if src.palette().is_empty() {
        return Err(TrailError::validation("indexed image has no palette"));
    }
    Ok(())
}

fn branch_shade(color: Color, slope: f32) -> Color {
    if slope > 1.0 {
        color.brighten(slope, color.a)
    } else if slope < 1.0 {
        color.darken(slope, color.a)
    } else {
        color
    }
}

/// Red-channel slope shading shared by the raw and blurred variants; row 0 is left as is.
fn shade_color_raw(img: &mut ColorImage, gain: f32) {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return;
    }
    let mut prev_row: Vec<Color> = img.row(0).to_vec();
    for y in 1..h {
        let row = img.row_mut(y);
        let mut prev_x = i32::from(row[0].r);
        for x in 0..w as usize {
            let color = row[x];
            let prev_y = i32::from(prev_row[x].r);
            prev_row[x] = color;
            let px = i32::from(color.r);
            let slope_x = (prev_x - px) as f32 / 255.0;
            let slope_y = (prev_y - px) as f32 / 255.0;
            let slope = 1.0 + (slope_x + slope_y) * gain;
            row[x] = branch_shade(color, slope);
            prev_x = px;
        }
    }
}

/// Raw one-pixel slope.
pub struct SlopeShader {
    cache: MappingCache,
}

impl SlopeShader {
    pub fn new(intensity: Palette) -> Self {
        Self {
            cache: MappingCache::new(intensity),
        }
    }
}

impl Shader for SlopeShader {
    fn name(&self) -> &'static str {
        "slope"
    }

    fn shade_indexed(&mut self, src: &IndexedImage) -> TrailResult<ColorImage> {
        check_palette(src)?;
        let (w, h) = (src.width() as usize, src.height() as usize);
        let rank = ranks(&mut self.cache, src);
        let mut out = ColorImage::new(src.width(), src.height());
        for y in 0..h {
            let prev_y_row = if y == 0 { 0 } else { y - 1 };
            let mut prev_x = rank.get(y * w).copied().unwrap_or(0);
            for x in 0..w {
                let px = rank[y * w + x];
                let prev_y = rank[prev_y_row * w + x];
                let slope_x = (prev_x - px) as f32 / 255.0;
                let slope_y = (prev_y - px) as f32 / 255.0;
                let slope = 1.0 + (slope_x + slope_y) * SLOPE_GAIN;
                let color = src.color_at(x as u32, y as u32);
                out.set(x as u32, y as u32, branch_shade(color, slope));
                prev_x = px;
            }
        }
        Ok(out)
    }

    fn shade_color(&mut self, img: &mut ColorImage) -> TrailResult<()> {
        shade_color_raw(img, SLOPE_GAIN);
        Ok(())
    }
}

/// Slope smoothed against the previous column and the previous row.
///
/// Each estimate is averaged with the carried one, and the carried value decays toward the new
/// sample, so edges cast a short soft shadow instead of a one-pixel line.
pub struct SmoothedSlopeShader {
    cache: MappingCache,
}

impl SmoothedSlopeShader {
    pub fn new(intensity: Palette) -> Self {
        Self {
            cache: MappingCache::new(intensity),
        }
    }
}

struct Smoother {
    prev_x_scale: f32,
    prev_y_scale: Vec<f32>,
}

impl Smoother {
    fn new(width: usize) -> Self {
        Self {
            prev_x_scale: 0.0,
            prev_y_scale: vec![0.0; width],
        }
    }

    fn start_row(&mut self) {
        self.prev_x_scale = 0.0;
    }

    fn step(&mut self, x: usize, prev_x: i32, prev_y: i32, px: i32) -> f32 {
        let x_prev = self.prev_x_scale;
        let y_prev = self.prev_y_scale[x];
        let slope_x = ((prev_x - px) as f32 / 255.0 + x_prev) / 2.0;
        let slope_y = ((prev_y - px) as f32 / 255.0 + y_prev) / 2.0;
        let slope = slope_x + slope_y;
        self.prev_x_scale = (x_prev / 2.0 + slope) / 2.0;
        self.prev_y_scale[x] = (y_prev / 2.0 + slope) / 2.0;
        slope
    }
}

fn smoothed_scale(slope: f32) -> f32 {
    (1.0 + slope * SMOOTHED_GAIN).clamp(0.0, 2.0)
}

impl Shader for SmoothedSlopeShader {
    fn name(&self) -> &'static str {
        "smoothed"
    }

    fn shade_indexed(&mut self, src: &IndexedImage) -> TrailResult<ColorImage> {
        check_palette(src)?;
        let (w, h) = (src.width() as usize, src.height() as usize);
        let rank = ranks(&mut self.cache, src);
        let mut out = ColorImage::new(src.width(), src.height());
        let mut smoother = Smoother::new(w);
        for y in 0..h {
            let prev_y_row = if y == 0 { 0 } else { y - 1 };
            let mut prev_x = rank.get(y * w).copied().unwrap_or(0);
            smoother.start_row();
            for x in 0..w {
                let px = rank[y * w + x];
                let slope = smoother.step(x, prev_x, rank[prev_y_row * w + x], px);
                let color = src.color_at(x as u32, y as u32);
                out.set(
                    x as u32,
                    y as u32,
                    color.scale(smoothed_scale(slope), color.a),
                );
                prev_x = px;
            }
        }
        Ok(out)
    }

    fn shade_color(&mut self, img: &mut ColorImage) -> TrailResult<()> {
        let (w, h) = (img.width(), img.height());
        if w == 0 || h == 0 {
            return Ok(());
        }
        let mut prev_row: Vec<Color> = img.row(0).to_vec();
        let mut smoother = Smoother::new(w as usize);
        for y in 0..h {
            let row = img.row_mut(y);
            let mut prev_x = i32::from(row[0].r);
            smoother.start_row();
            for x in 0..w as usize {
                let color = row[x];
                let prev_y = i32::from(prev_row[x].r);
                prev_row[x] = color;
                let px = i32::from(color.r);
                let slope = smoother.step(x, prev_x, prev_y, px);
                let scale = smoothed_scale(slope);
                if slope > 0.0 {
                    row[x] = color.brighten(scale, color.a);
                } else if slope < 0.0 {
                    row[x] = color.darken(scale, color.a);
                }
                prev_x = px;
            }
        }
        Ok(())
    }
}

/// Slope on a box-blurred intensity grid, colors interpolated along the output palette.
pub struct BlurredSlopeShader {
    cache: MappingCache,
}

impl BlurredSlopeShader {
    pub fn new(out_palette: Palette) -> Self {
        Self {
            cache: MappingCache::new(out_palette),
        }
    }
}

/// Additive brighten: every channel gains `255 * (rate - 1)`.
fn lift(color: Color, rate: f32) -> Color {
    let amt = (255.0 * (rate - 1.0)).max(0.0) as u32;
    let ch = |c: u8| (u32::from(c) + amt).min(255) as u8;
    Color::rgba(ch(color.r), ch(color.g), ch(color.b), color.a)
}

impl Shader for BlurredSlopeShader {
    fn name(&self) -> &'static str {
        "blurred"
    }

    fn shade_indexed(&mut self, src: &IndexedImage) -> TrailResult<ColorImage> {
        check_palette(src)?;
        let (w, h) = (src.width() as usize, src.height() as usize);
        let grid = to_float_grid(self.cache.get(src.palette()), src);
        let grid = box_blur(&grid, src.width(), src.height(), BLURRED_RADIUS)?;
        let palette = self.cache.destination();

        let mut out = ColorImage::new(src.width(), src.height());
        for y in 0..h {
            let prev_y_row = if y == 0 { 0 } else { y - 1 };
            let mut prev_x = grid.get(y * w).copied().unwrap_or(0.0);
            for x in 0..w {
                let px = grid[y * w + x];
                let prev_y = grid[prev_y_row * w + x];
                let slope_x = (prev_x - px) / 255.0;
                let slope_y = (prev_y - px) / 255.0;
                let slope = 1.0 + (slope_x + slope_y) * BLURRED_GAIN;

                let base = palette_color_at(palette, px);
                let shaded = if slope > 1.0 {
                    lift(base, slope.min(2.0))
                } else if slope < 1.0 {
                    base.darken(slope.max(0.0), base.a)
                } else {
                    base
                };
                out.set(x as u32, y as u32, shaded);
                prev_x = px;
            }
        }
        Ok(out)
    }

    fn shade_color(&mut self, img: &mut ColorImage) -> TrailResult<()> {
        shade_color_raw(img, SLOPE_GAIN);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/shade.rs"]
mod tests;
