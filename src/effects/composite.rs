//! Layer compositing on straight-alpha images.
//!
//! Every operation works on the overlapping region of its operands; pixels outside of the
//! smaller image are left alone.

use crate::color::rgba::Color;
use crate::foundation::core::Size;
use crate::palette::palette::Palette;
use crate::raster::buffer::{ColorImage, IndexedImage};

fn for_each_shared(
    dst: &mut ColorImage,
    src_w: u32,
    src_h: u32,
    mut f: impl FnMut(&mut Color, u32, u32),
) {
    let shared = dst.size().intersect(Size::new(src_w, src_h));
    for y in 0..shared.height {
        let row = dst.row_mut(y);
        for (x, px) in row.iter_mut().take(shared.width as usize).enumerate() {
            f(px, x as u32, y);
        }
    }
}

/// `src` over `dst`, result in `dst`.
pub fn over_in_place(dst: &mut ColorImage, src: &ColorImage) {
    for_each_shared(dst, src.width(), src.height(), |d, x, y| {
        *d = src.get(x, y).over(*d);
    });
}

/// `dst` over `src`, result in `dst`.
pub fn under_in_place(dst: &mut ColorImage, src: &ColorImage) {
    for_each_shared(dst, src.width(), src.height(), |d, x, y| {
        *d = d.over(src.get(x, y));
    });
}

/// Recolor `src` indices through `palette` and composite the result over `dst`.
pub fn indexed_over(dst: &mut ColorImage, src: &IndexedImage, palette: &Palette) {
    let colors = palette.colors();
    for_each_shared(dst, src.width(), src.height(), |d, x, y| {
        let idx = usize::from(src.get(x, y));
        let top = colors.get(idx).copied().unwrap_or(Color::TRANSPARENT);
        *d = top.over(*d);
    });
}

/// Composite `dst` over the recolored `src`, result in `dst`.
///
/// With `max_alpha`, every `src` color is first capped to that alpha.
pub fn indexed_under(
    dst: &mut ColorImage,
    src: &IndexedImage,
    palette: &Palette,
    max_alpha: Option<u8>,
) {
    let colors = palette.colors();
    for_each_shared(dst, src.width(), src.height(), |d, x, y| {
        let idx = usize::from(src.get(x, y));
        let mut under = colors.get(idx).copied().unwrap_or(Color::TRANSPARENT);
        if let Some(max) = max_alpha {
            under.a = under.a.min(max);
        }
        *d = d.over(under);
    });
}

/// Per-pixel maximum of palette indices, result in `dst`.
pub fn maximum_indexed(dst: &mut IndexedImage, src: &IndexedImage) {
    let shared = dst.size().intersect(src.size());
    for y in 0..shared.height {
        let w = shared.width as usize;
        let s = &src.row(y)[..w];
        for (d, &s) in dst.row_mut(y)[..w].iter_mut().zip(s) {
            *d = (*d).max(s);
        }
    }
}

/// Scale every alpha by `multiple` (0..1).
///
/// With a non-zero `minimum`, pixels that are currently above the minimum never fade below it;
/// pixels already at or below it keep fading.
pub fn fade_alpha(img: &mut ColorImage, multiple: f32, minimum: u8) {
    let scale = (256.0 * multiple.clamp(0.0, 1.0)) as u32;
    for px in img.pixels_mut() {
        let a = u32::from(px.a);
        let mut faded = (a * scale / 256) as u8;
        if minimum > 0 && px.a > minimum {
            faded = faded.max(minimum);
        }
        px.a = faded;
    }
}

/// Clamp every alpha to at most `max`.
pub fn cap_alpha(img: &mut ColorImage, max: u8) {
    for px in img.pixels_mut() {
        px.a = px.a.min(max);
    }
}

/// Green/red dominant pixels of a truecolor radar frame.
///
/// A pixel is active when green exceeds twice its blue and red exceeds three times its blue;
/// everything else becomes transparent.
pub fn is_active(c: Color) -> bool {
    let (r, g, b) = (u16::from(c.r), u16::from(c.g), u16::from(c.b));
    g > 2 * b && r > 3 * b
}

pub fn select_active(img: &ColorImage) -> ColorImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        if !is_active(*px) {
            *px = Color::TRANSPARENT;
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
