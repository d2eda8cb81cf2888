use std::fmt::Write as _;

use crate::palette::palette::Palette;
use crate::raster::buffer::{IndexedImage, PixelBuffer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    pub palette_len: usize,
    pub has_transparency: bool,
}

pub fn describe(buffer: &PixelBuffer) -> ImageInfo {
    let palette = buffer.palette();
    ImageInfo {
        width: buffer.width(),
        height: buffer.height(),
        bit_depth: buffer.bit_depth(),
        palette_len: palette.map_or(0, Palette::len),
        has_transparency: palette.is_some_and(Palette::has_transparency),
    }
}

/// Pixel count per palette index.
pub fn index_histogram(img: &IndexedImage) -> [u64; 256] {
    let mut counts = [0u64; 256];
    for &px in img.pixels() {
        counts[usize::from(px)] += 1;
    }
    counts
}

/// One line per entry: index, `r,g,b,a`, HSV, and the entry name if any.
pub fn palette_listing(palette: &Palette) -> Vec<String> {
    palette
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            let hsv = c.to_hsv();
            let mut line = format!(
                "{idx:3} {:<15} hsv={:6.3},{:5.3},{:5.3}",
                c.to_string(),
                hsv.hue,
                hsv.sat,
                hsv.value
            );
            if let Some(name) = palette.name(idx) {
                let _ = write!(line, " {name}");
            }
            line
        })
        .collect()
}

/// Human readable summary used by `radartrail dump`.
pub fn report(name: &str, buffer: &PixelBuffer) -> String {
    let info = describe(buffer);
    let mut out = format!(
        "{name}: {}x{} {}-bit",
        info.width, info.height, info.bit_depth
    );
    if let PixelBuffer::Indexed(img) = buffer {
        let _ = write!(
            out,
            ", {} colors{}",
            info.palette_len,
            if info.has_transparency {
                " with alpha"
            } else {
                ""
            }
        );
        let counts = index_histogram(img);
        for (idx, line) in palette_listing(img.palette()).into_iter().enumerate() {
            let _ = write!(out, "\n  {line} used={}", counts[idx]);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assets/inspect.rs"]
mod tests;
