use std::io::Cursor;
use std::path::Path;

use anyhow::Context;

use crate::color::rgba::Color;
use crate::foundation::error::{TrailError, TrailResult};
use crate::palette::palette::Palette;
use crate::raster::buffer::{ColorImage, IndexedImage, PixelBuffer};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Read and decode an image file.
pub fn decode_file(path: &Path) -> TrailResult<PixelBuffer> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes).map_err(|e| match e {
        TrailError::Decode(msg) => TrailError::decode(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Decode encoded image bytes.
///
/// PNG keeps palette indices, PLTE and tRNS (1/2/4-bit data is unpacked to one index per
/// pixel, grayscale gets a gray ramp palette). Every other container goes through `image` and
/// must decode to RGB8 or RGBA8.
pub fn decode_image(bytes: &[u8]) -> TrailResult<PixelBuffer> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        return decode_png(bytes);
    }

    let img = image::load_from_memory(bytes)
        .map_err(|e| TrailError::decode(format!("decode image: {e}")))?;
    let (width, height) = (img.width(), img.height());
    match img {
        image::DynamicImage::ImageRgb8(rgb) => Ok(PixelBuffer::Rgb(ColorImage::from_rgb8(
            width,
            height,
            rgb.as_raw(),
        )?)),
        image::DynamicImage::ImageRgba8(rgba) => Ok(PixelBuffer::Rgba(ColorImage::from_rgba8(
            width,
            height,
            rgba.as_raw(),
        )?)),
        other => Err(TrailError::UnsupportedDepth(u32::from(
            other.color().bits_per_pixel(),
        ))),
    }
}

fn decode_png(bytes: &[u8]) -> TrailResult<PixelBuffer> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder
        .read_info()
        .map_err(|e| TrailError::decode(format!("png header: {e}")))?;

    let (plte, trns) = {
        let info = reader.info();
        (
            info.palette.as_ref().map(|p| p.to_vec()),
            info.trns.as_ref().map(|t| t.to_vec()),
        )
    };

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| TrailError::decode(format!("png frame: {e}")))?;
    buf.truncate(frame.buffer_size());
    let (width, height) = (frame.width, frame.height);
    let bits = frame.bit_depth as u8;

    match (frame.color_type, frame.bit_depth) {
        (png::ColorType::Indexed, png::BitDepth::Sixteen) => Err(TrailError::UnsupportedDepth(16)),
        (png::ColorType::Indexed, _) => {
            let plte = plte.ok_or_else(|| TrailError::decode("indexed png without PLTE"))?;
            let palette = png_palette(&plte, trns.as_deref())?;
            let pixels = unpack_indices(&buf, width, height, frame.line_size, bits);
            Ok(PixelBuffer::Indexed(IndexedImage::from_parts(
                width, height, pixels, palette,
            )?))
        }
        (png::ColorType::Grayscale, depth) if depth != png::BitDepth::Sixteen => {
            let palette = gray_palette(bits)?;
            let pixels = unpack_indices(&buf, width, height, frame.line_size, bits);
            Ok(PixelBuffer::Indexed(IndexedImage::from_parts(
                width, height, pixels, palette,
            )?))
        }
        (png::ColorType::Rgb, png::BitDepth::Eight) => Ok(PixelBuffer::Rgb(
            ColorImage::from_rgb8(width, height, &buf)?,
        )),
        (png::ColorType::Rgba, png::BitDepth::Eight) => Ok(PixelBuffer::Rgba(
            ColorImage::from_rgba8(width, height, &buf)?,
        )),
        (color_type, _) => Err(TrailError::UnsupportedDepth(
            color_type.samples() as u32 * u32::from(bits),
        )),
    }
}

fn png_palette(plte: &[u8], trns: Option<&[u8]>) -> TrailResult<Palette> {
    let colors = plte
        .chunks_exact(3)
        .enumerate()
        .map(|(idx, rgb)| {
            let a = trns.and_then(|t| t.get(idx)).copied().unwrap_or(255);
            Color::rgba(rgb[0], rgb[1], rgb[2], a)
        })
        .collect();
    Palette::from_colors(colors, trns.is_some())
}

fn gray_palette(bits: u8) -> TrailResult<Palette> {
    let levels = 1u32 << bits;
    let colors = (0..levels)
        .map(|i| {
            let v = (i * 255 / (levels - 1)) as u8;
            Color::rgb(v, v, v)
        })
        .collect();
    Palette::from_colors(colors, false)
}

/// One byte per pixel from packed PNG rows.
fn unpack_indices(buf: &[u8], width: u32, height: u32, line_size: usize, bits: u8) -> Vec<u8> {
    let w = width as usize;
    if bits == 8 {
        let mut out = Vec::with_capacity(w * height as usize);
        for row in buf.chunks(line_size).take(height as usize) {
            out.extend_from_slice(&row[..w.min(row.len())]);
        }
        return out;
    }

    let per_byte = 8 / bits as usize;
    let mask = (1u8 << bits) - 1;
    let mut out = Vec::with_capacity(w * height as usize);
    for row in buf.chunks(line_size).take(height as usize) {
        for x in 0..w {
            let byte = row.get(x / per_byte).copied().unwrap_or(0);
            let shift = 8 - bits as usize * (x % per_byte + 1);
            out.push((byte >> shift) & mask);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
