//! Stateless per-file drivers: every input is processed on its own and written under the same
//! file name.

use std::path::PathBuf;
use std::str::FromStr;

use crate::assets::decode::decode_file;
use crate::color::rgba::Color;
use crate::config::model::TrailConfig;
use crate::effects::blur::blur_indexed;
use crate::effects::shade::{ShadeKind, create_shader};
use crate::encode::sink::FrameSink;
use crate::foundation::core::CancelToken;
use crate::foundation::error::{TrailError, TrailResult};
use crate::palette::mapping::{MappingCache, get_mapping};
use crate::palette::palette::{MAX_COLORS, Palette};
use crate::pipeline::blend::frame_name;
use crate::raster::buffer::{ColorImage, IndexedImage, PixelBuffer};

pub const DEFAULT_BLUR_RADIUS: u32 = 2;
pub const DEFAULT_MONTAGE_NAME: &str = "montage.png";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

fn run_each(
    op: &'static str,
    paths: &[PathBuf],
    cancel: &CancelToken,
    mut f: impl FnMut(&str, PixelBuffer) -> TrailResult<()>,
) -> BatchStats {
    let mut paths = paths.to_vec();
    paths.sort();
    let mut stats = BatchStats::default();
    for path in &paths {
        if cancel.is_cancelled() {
            tracing::warn!(op, "cancelled");
            stats.cancelled = true;
            break;
        }
        let result = frame_name(path)
            .ok_or_else(|| TrailError::validation("path has no file name"))
            .and_then(|name| decode_file(path).and_then(|frame| f(&name, frame)));
        match result {
            Ok(()) => stats.processed += 1,
            Err(err) => {
                tracing::warn!(
                    op,
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "skipping file"
                );
                stats.skipped += 1;
            }
        }
    }
    tracing::info!(
        op,
        processed = stats.processed,
        skipped = stats.skipped,
        "batch finished"
    );
    stats
}

/// Box blur every indexed input through the output palette.
///
/// Mappings are cached per distinct source palette. Non-indexed inputs are skipped.
pub fn run_blur(
    paths: &[PathBuf],
    config: &TrailConfig,
    radius: u32,
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
) -> TrailResult<BatchStats> {
    if config.out_palette.is_empty() {
        return Err(TrailError::config("blur needs an out-palette"));
    }
    let out_palette = &config.out_palette;
    let mut cache = MappingCache::new(out_palette.clone());
    Ok(run_each("blur", paths, cancel, |name, frame| {
        let depth = frame.bit_depth();
        let PixelBuffer::Indexed(img) = frame else {
            return Err(TrailError::UnsupportedDepth(depth));
        };
        let out = blur_indexed(cache.get(img.palette()), out_palette, &img, radius)?;
        sink.push_frame(name, PixelBuffer::Rgba(out))
    }))
}

/// Slope shade every input with the variant `kind`, built once for the whole run.
pub fn run_shade(
    paths: &[PathBuf],
    config: &TrailConfig,
    kind: ShadeKind,
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
) -> TrailResult<BatchStats> {
    let mut shader = create_shader(kind, &config.out_palette)?;
    tracing::info!(shader = shader.name(), "shading");
    Ok(run_each("shade", paths, cancel, |name, frame| {
        let out = match frame {
            PixelBuffer::Indexed(img) => PixelBuffer::Rgba(shader.shade_indexed(&img)?),
            PixelBuffer::Rgb(mut img) => {
                shader.shade_color(&mut img)?;
                PixelBuffer::Rgb(img)
            }
            PixelBuffer::Rgba(mut img) => {
                shader.shade_color(&mut img)?;
                PixelBuffer::Rgba(img)
            }
        };
        sink.push_frame(name, out)
    }))
}

/// Convert 32/24-bit gray frames to 8-bit indexed frames.
///
/// The red channel becomes the index. Entry `c` of the output palette is gray `c` with alpha
/// `min(255, 2c)`, entry 0 is transparent.
pub fn run_to_gray(
    paths: &[PathBuf],
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
) -> TrailResult<BatchStats> {
    let palette = gray_palette()?;
    Ok(run_each("togray", paths, cancel, |name, frame| {
        let img = match frame {
            PixelBuffer::Rgb(img) | PixelBuffer::Rgba(img) => img,
            PixelBuffer::Indexed(_) => return Err(TrailError::UnsupportedDepth(8)),
        };
        sink.push_frame(name, PixelBuffer::Indexed(to_gray(&img, &palette)?))
    }))
}

fn gray_palette() -> TrailResult<Palette> {
    let mut colors: Vec<Color> = (0..=255u8)
        .map(|c| Color::rgba(c, c, c, c.saturating_mul(2)))
        .collect();
    colors[0] = Color::TRANSPARENT;
    Palette::from_colors(colors, true)
}

fn to_gray(img: &ColorImage, palette: &Palette) -> TrailResult<IndexedImage> {
    let pixels = img.pixels().iter().map(|c| c.r).collect();
    IndexedImage::from_parts(img.width(), img.height(), pixels, palette.clone())
}

/// Tile layout of a montage: `columns` tiles per row, `rows` derived from the tile count when
/// not given.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub columns: u32,
    pub rows: Option<u32>,
}

impl FromStr for TileGrid {
    type Err = TrailError;

    /// `4`, `4x3` or `4X3`. A missing row count (`4x`) is derived later.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || {
            TrailError::config(format!(
                "tile grid expects COLUMNSxROWS, e.g. 4x3, not '{s}'"
            ))
        };
        let trimmed = s.trim();
        let (columns, rows) = match trimmed.split_once(|c: char| !c.is_ascii_digit()) {
            Some((columns, rest)) => {
                (columns, rest.trim_start_matches(|c: char| !c.is_ascii_digit()))
            }
            None => (trimmed, ""),
        };
        let columns: u32 = columns.parse().map_err(|_| bad())?;
        let rows = if rows.is_empty() {
            None
        } else {
            Some(rows.parse::<u32>().map_err(|_| bad())?)
        };
        if columns == 0 || rows == Some(0) {
            return Err(bad());
        }
        Ok(Self { columns, rows })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MontageStats {
    pub tiles: usize,
    pub skipped: usize,
    /// Colors appended to the montage palette by tiles whose palettes differ.
    pub colors_added: usize,
    pub cancelled: bool,
}

/// Tile same-size frames, in sorted path order, into one image emitted as `out_name`.
///
/// Indexed tiles produce an indexed montage. Its palette starts from `base_palette` (or the first
/// tile's palette when that is empty) and grows by merging every tile palette. Tiles whose
/// palette does not line up with it are remapped. Color tiles produce a 32-bit montage.
/// Unreadable tiles are skipped; tiles that differ in size or depth from the first one abort the
/// montage.
#[tracing::instrument(level = "info", skip_all, fields(tiles = paths.len()))]
pub fn run_montage(
    paths: &[PathBuf],
    base_palette: Option<&Palette>,
    grid: TileGrid,
    out_name: &str,
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
) -> TrailResult<MontageStats> {
    let mut paths = paths.to_vec();
    paths.sort();
    let mut stats = MontageStats::default();
    let mut tiles = Vec::with_capacity(paths.len());
    for path in &paths {
        if cancel.is_cancelled() {
            tracing::warn!("montage cancelled");
            stats.cancelled = true;
            return Ok(stats);
        }
        match decode_file(path) {
            Ok(tile) => tiles.push((path, tile)),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "skipping tile"
                );
                stats.skipped += 1;
            }
        }
    }

    let Some((_, first)) = tiles.first() else {
        tracing::warn!("no tiles to montage");
        return Ok(stats);
    };
    let (size, depth) = (first.size(), first.bit_depth());
    for (path, tile) in &tiles[1..] {
        if tile.size() != size || tile.bit_depth() != depth {
            return Err(TrailError::validation(format!(
                "{} is {}x{} {}-bit, first tile is {}x{} {depth}-bit",
                path.display(),
                tile.width(),
                tile.height(),
                tile.bit_depth(),
                size.width,
                size.height,
            )));
        }
    }

    let columns = grid.columns;
    let rows = grid
        .rows
        .unwrap_or_else(|| (tiles.len() as u32).div_ceil(columns));
    let capacity = (columns * rows) as usize;
    if tiles.len() > capacity {
        tracing::warn!(dropped = tiles.len() - capacity, "more tiles than grid cells");
        tiles.truncate(capacity);
    }
    let tiles: Vec<PixelBuffer> = tiles.into_iter().map(|(_, tile)| tile).collect();

    let out = match &tiles[0] {
        PixelBuffer::Indexed(_) => {
            let (img, added) = montage_indexed(&tiles, base_palette, columns, rows)?;
            stats.colors_added = added;
            PixelBuffer::Indexed(img)
        }
        PixelBuffer::Rgb(_) | PixelBuffer::Rgba(_) => {
            PixelBuffer::Rgba(montage_color(&tiles, columns, rows))
        }
    };
    stats.tiles = tiles.len();
    sink.push_frame(out_name, out)?;
    tracing::info!(
        tiles = stats.tiles,
        columns,
        rows,
        colors_added = stats.colors_added,
        "montage finished"
    );
    Ok(stats)
}

fn montage_indexed(
    tiles: &[PixelBuffer],
    base_palette: Option<&Palette>,
    columns: u32,
    rows: u32,
) -> TrailResult<(IndexedImage, usize)> {
    let indexed: Vec<&IndexedImage> = tiles
        .iter()
        .filter_map(|tile| match tile {
            PixelBuffer::Indexed(img) => Some(img),
            _ => None,
        })
        .collect();
    let Some(first) = indexed.first() else {
        return Err(TrailError::validation("montage needs at least one indexed tile"));
    };

    let mut palette = match base_palette {
        Some(p) if !p.is_empty() => p.clone(),
        _ => first.palette().clone(),
    };
    let mut added = 0;
    for tile in &indexed {
        added += palette.merge(tile.palette(), MAX_COLORS);
    }
    if palette.iter().any(|c| c.a != 255) {
        palette.set_has_transparency(true);
    }

    let (tw, th) = (first.width(), first.height());
    let mut out = IndexedImage::new(tw * columns, th * rows, palette);
    for (i, tile) in indexed.iter().enumerate() {
        let (x0, y0) = ((i as u32 % columns) * tw, (i as u32 / columns) * th);
        let mapping = get_mapping(tile.palette(), out.palette());
        let lut = (mapping.shift_count() != 0).then(|| mapping.lut());
        tracing::debug!(tile = i, shift_count = mapping.shift_count(), "tile mapping");
        for y in 0..th {
            let dst = &mut out.row_mut(y0 + y)[x0 as usize..(x0 + tw) as usize];
            dst.copy_from_slice(tile.row(y));
            if let Some(lut) = &lut {
                for px in dst {
                    *px = lut[usize::from(*px)];
                }
            }
        }
    }
    Ok((out, added))
}

fn montage_color(tiles: &[PixelBuffer], columns: u32, rows: u32) -> ColorImage {
    let size = tiles[0].size();
    let (tw, th) = (size.width, size.height);
    let mut out = ColorImage::new(tw * columns, th * rows);
    for (i, tile) in tiles.iter().enumerate() {
        let tile = tile.to_color();
        let (x0, y0) = ((i as u32 % columns) * tw, (i as u32 / columns) * th);
        for y in 0..th {
            out.row_mut(y0 + y)[x0 as usize..(x0 + tw) as usize].copy_from_slice(tile.row(y));
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/batch.rs"]
mod tests;
