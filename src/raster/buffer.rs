use crate::color::rgba::Color;
use crate::foundation::core::Size;
use crate::foundation::error::{TrailError, TrailResult};
use crate::palette::palette::Palette;

fn check_len(width: u32, height: u32, len: usize) -> TrailResult<()> {
    let expected = Size::new(width, height).pixel_count();
    if len != expected {
        return Err(TrailError::validation(format!(
            "pixel buffer for {width}x{height} needs {expected} pixels, got {len}"
        )));
    }
    Ok(())
}

/// 8-bit palette-indexed image: one palette index per pixel, rows top to bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    palette: Palette,
}

impl IndexedImage {
    /// All-zero image carrying `palette`.
    pub fn new(width: u32, height: u32, palette: Palette) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; Size::new(width, height).pixel_count()],
            palette,
        }
    }

    pub fn from_parts(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        palette: Palette,
    ) -> TrailResult<Self> {
        check_len(width, height, pixels.len())?;
        Ok(Self {
            width,
            height,
            pixels,
            palette,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &mut self.pixels[start..start + w]
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, idx: u8) {
        let w = self.width as usize;
        self.pixels[y as usize * w + x as usize] = idx;
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    /// Color of the pixel at `(x, y)`; indices past the palette end read as transparent.
    pub fn color_at(&self, x: u32, y: u32) -> Color {
        self.palette
            .get(usize::from(self.get(x, y)))
            .unwrap_or(Color::TRANSPARENT)
    }

    /// Expand through the palette into a 32-bit image.
    pub fn to_color(&self) -> ColorImage {
        let colors = self.palette.colors();
        let pixels = self
            .pixels
            .iter()
            .map(|&idx| {
                colors
                    .get(usize::from(idx))
                    .copied()
                    .unwrap_or(Color::TRANSPARENT)
            })
            .collect();
        ColorImage {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// Straight RGBA image, rows top to bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorImage {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl ColorImage {
    /// Fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Color::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; Size::new(width, height).pixel_count()],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> TrailResult<Self> {
        check_len(width, height, pixels.len())?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from interleaved RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> TrailResult<Self> {
        if !bytes.len().is_multiple_of(4) {
            return Err(TrailError::validation(
                "rgba8 buffer length must be a multiple of 4",
            ));
        }
        let pixels = bytes.chunks_exact(4).map(Color::from_slice).collect();
        Self::from_pixels(width, height, pixels)
    }

    /// Build from interleaved RGB8 bytes; every pixel is opaque.
    pub fn from_rgb8(width: u32, height: u32, bytes: &[u8]) -> TrailResult<Self> {
        if !bytes.len().is_multiple_of(3) {
            return Err(TrailError::validation(
                "rgb8 buffer length must be a multiple of 3",
            ));
        }
        let pixels = bytes
            .chunks_exact(3)
            .map(|px| Color::rgb(px[0], px[1], px[2]))
            .collect();
        Self::from_pixels(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    pub fn row(&self, y: u32) -> &[Color] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [Color] {
        let w = self.width as usize;
        let start = y as usize * w;
        &mut self.pixels[start..start + w]
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let w = self.width as usize;
        self.pixels[y as usize * w + x as usize] = color;
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| c.to_array()).collect()
    }

    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| [c.r, c.g, c.b]).collect()
    }
}

/// Decoded frame as handed over by the codec: indexed 8-bit, or 24/32-bit color.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelBuffer {
    Indexed(IndexedImage),
    /// 24-bit color; alpha is always 255.
    Rgb(ColorImage),
    Rgba(ColorImage),
}

impl PixelBuffer {
    pub fn bit_depth(&self) -> u32 {
        match self {
            PixelBuffer::Indexed(_) => 8,
            PixelBuffer::Rgb(_) => 24,
            PixelBuffer::Rgba(_) => 32,
        }
    }

    pub fn size(&self) -> Size {
        match self {
            PixelBuffer::Indexed(img) => img.size(),
            PixelBuffer::Rgb(img) | PixelBuffer::Rgba(img) => img.size(),
        }
    }

    pub fn width(&self) -> u32 {
        self.size().width
    }

    pub fn height(&self) -> u32 {
        self.size().height
    }

    /// Palette of an indexed buffer.
    pub fn palette(&self) -> Option<&Palette> {
        match self {
            PixelBuffer::Indexed(img) => Some(img.palette()),
            _ => None,
        }
    }

    /// 32-bit working copy.
    pub fn to_color(&self) -> ColorImage {
        match self {
            PixelBuffer::Indexed(img) => img.to_color(),
            PixelBuffer::Rgb(img) | PixelBuffer::Rgba(img) => img.clone(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/buffer.rs"]
mod tests;
