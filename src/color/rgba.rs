use std::str::FromStr;

use crate::foundation::error::{TrailError, TrailResult};

/// Darken/brighten offset divisor: the channel spread divided by this is subtracted (or added)
/// on top of the multiplicative rate.
const OFFSET_RATE: u32 = 32;

/// Straight (non-premultiplied) RGBA8 color.
///
/// The fourth channel is a true alpha for image pixels. In configuration palettes it can also
/// carry an encoded magnitude, which is why palette lookups partition on exact alpha equality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Hue (radians), saturation and value of a color, as used for nearest-color matching.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsv {
    pub hue: f32,
    pub sat: f32,
    pub value: f32,
}

impl Hsv {
    /// Squared Euclidean distance in (hue, saturation, value) space.
    pub fn distance(self, other: Hsv) -> f32 {
        let dh = self.hue - other.hue;
        let ds = self.sat - other.sat;
        let dv = self.value - other.value;
        dh * dh + ds * ds + dv * dv
    }
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_slice(px: &[u8]) -> Self {
        Self::rgba(px[0], px[1], px[2], px[3])
    }

    pub fn max_value(self) -> u8 {
        self.r.max(self.g).max(self.b)
    }

    pub fn min_value(self) -> u8 {
        self.r.min(self.g).min(self.b)
    }

    /// Largest channel value and its index (0=red, 1=green, 2=blue, 3=all equal).
    pub fn max_channel(self) -> (u8, usize) {
        if self.r == self.g && self.r == self.b {
            return (self.r, 3);
        }
        let max = self.max_value();
        let idx = if self.r == max {
            0
        } else if self.g == max {
            1
        } else {
            2
        };
        (max, idx)
    }

    pub fn luminosity(self) -> f64 {
        0.241 * f64::from(self.r) + 0.691 * f64::from(self.g) + 0.068 * f64::from(self.b)
    }

    /// True when the channel spread is small relative to the brightest channel.
    pub fn is_gray(self) -> bool {
        let max = self.max_value();
        max - self.min_value() < max / 8
    }

    /// HSV triple used by [`Color::distance_hsv`].
    ///
    /// Colors with (almost) zero chroma collapse onto a fixed sentinel point instead of going
    /// through an unstable `atan2`, so near-black entries order deterministically.
    pub fn to_hsv(self) -> Hsv {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let c = r + g + b;
        if c < 1e-4 {
            return Hsv {
                hue: 0.0,
                sat: 0.0,
                value: 0.0,
            };
        }

        let pv = 2.0 * (b * b + g * g + r * r - g * r - b * g - b * r);
        let p = if pv > 1e-10 { pv.sqrt() } else { 0.0 };
        let h = (b - g).atan2((2.0 * r - b - g) / 3f64.sqrt());
        Hsv {
            hue: h as f32,
            sat: (p / (c + p)) as f32,
            value: ((c + p) / 3.0) as f32,
        }
    }

    pub fn distance_hsv(self, other: Color) -> f32 {
        self.to_hsv().distance(other.to_hsv())
    }

    pub fn distance_rgb(self, other: Color) -> u32 {
        let d = |a: u8, b: u8| {
            let v = i32::from(a) - i32::from(b);
            (v * v) as u32
        };
        d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b)
    }

    fn offset(self) -> u32 {
        u32::from(self.max_value() - self.min_value()) / OFFSET_RATE + 1
    }

    /// Multiply channels by `rate` (< 1) and pull them further down by a spread-derived offset.
    pub fn darken(self, rate: f32, alpha: u8) -> Color {
        let offset = self.offset();
        let ch = |c: u8| {
            let big = (f32::from(c) * rate.max(0.0)) as u32;
            big.saturating_sub(offset).min(255) as u8
        };
        Color::rgba(ch(self.r), ch(self.g), ch(self.b), alpha)
    }

    /// Multiply channels by `rate` (> 1) and add a spread-derived offset, clamped to 255.
    ///
    /// The rate is capped so that the brightest channel cannot overflow on its own.
    pub fn brighten(self, rate: f32, alpha: u8) -> Color {
        let max = self.max_value();
        let rate = if max > 0 {
            rate.min(255.0 / f32::from(max))
        } else {
            rate
        };
        let offset = self.offset() as f32;
        let ch = |c: u8| (f32::from(c) * rate + offset).clamp(0.0, 255.0) as u8;
        Color::rgba(ch(self.r), ch(self.g), ch(self.b), alpha)
    }

    /// `rate == 1` is identity, below darkens, above brightens.
    pub fn scale(self, rate: f32, alpha: u8) -> Color {
        if rate == 1.0 {
            self
        } else if rate < 1.0 {
            self.darken(rate, alpha)
        } else {
            self.brighten(rate, alpha)
        }
    }

    /// Linear interpolation from `self` (at 0) to `other` (at 1), alpha included.
    pub fn lerp(self, other: Color, per: f32) -> Color {
        let ch = |a: u8, b: u8| {
            let v = 0.5 + (f32::from(b) - f32::from(a)) * per + f32::from(a);
            v.clamp(0.0, 255.0) as u8
        };
        Color::rgba(
            ch(self.r, other.r),
            ch(self.g, other.g),
            ch(self.b, other.b),
            ch(self.a, other.a),
        )
    }

    /// Composite `self` over `bottom`.
    ///
    /// A transparent source leaves the destination untouched; a transparent destination is
    /// replaced outright; otherwise every channel, alpha included, moves toward the source by
    /// `self.a / 255`.
    pub fn over(self, bottom: Color) -> Color {
        if self.a == 0 {
            return bottom;
        }
        if bottom.a == 0 {
            return self;
        }
        let a = u32::from(self.a);
        let ch = |t: u8, b: u8| ((u32::from(t) * a + u32::from(b) * (255 - a)) / 255) as u8;
        Color::rgba(
            ch(self.r, bottom.r),
            ch(self.g, bottom.g),
            ch(self.b, bottom.b),
            ch(self.a, bottom.a),
        )
    }
}

/// Composite `top` over `bottom`, see [`Color::over`].
pub fn blend_over(top: Color, bottom: Color) -> Color {
    top.over(bottom)
}

/// Parse `"r,g,b"` or `"r,g,b,a"`.
///
/// Integer parts are 0..255; if any part contains a `.` all parts are read as 0..1 floats.
/// Values are clamped, alpha defaults to fully opaque.
pub fn parse_color(s: &str) -> TrailResult<Color> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(TrailError::config(format!(
            "{s}: expected 3 or 4 color values, e.g. 1,128,255 or 0.1,0.5,1.0"
        )));
    }

    let floats = s.contains('.');
    let mut out = [0u8, 0, 0, 255];
    for (slot, part) in out.iter_mut().zip(&parts) {
        let v = if floats {
            let f: f64 = part
                .parse()
                .map_err(|_| TrailError::config(format!("{s}: bad color component '{part}'")))?;
            (f * 255.0) as i64
        } else {
            part.parse::<i64>()
                .map_err(|_| TrailError::config(format!("{s}: bad color component '{part}'")))?
        };
        *slot = v.clamp(0, 255) as u8;
    }
    Ok(Color::rgba(out[0], out[1], out[2], out[3]))
}

impl FromStr for Color {
    type Err = TrailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/color/rgba.rs"]
mod tests;
