use crate::color::rgba::Color;
use crate::foundation::error::{TrailError, TrailResult};
use crate::palette::mapping::{PalMapping, get_mapping};

/// Maximum number of entries an indexed palette can hold.
pub const MAX_COLORS: usize = 256;

/// Ordered color table.
///
/// The position of a color is its index. Configuration palettes also carry one name per entry;
/// image palettes leave `names` empty. `has_transparency` records whether the source carried
/// per-entry alpha (a PNG `tRNS` chunk, or a config entry with explicit alpha).
///
/// Palettes built independently for different images can describe the same colors in a
/// different order, so index equality never implies color equality across palettes; go through
/// [`get_mapping`] instead.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
    names: Vec<String>,
    has_transparency: bool,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_colors(colors: Vec<Color>, has_transparency: bool) -> TrailResult<Self> {
        if colors.len() > MAX_COLORS {
            return Err(TrailError::validation(format!(
                "palette has {} entries, at most {MAX_COLORS} allowed",
                colors.len()
            )));
        }
        Ok(Self {
            colors,
            names: Vec::new(),
            has_transparency,
        })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn get(&self, idx: usize) -> Option<Color> {
        self.colors.get(idx).copied()
    }

    /// Overwrite an existing entry. Out-of-range indices are ignored.
    pub fn set(&mut self, idx: usize, color: Color) {
        if let Some(slot) = self.colors.get_mut(idx) {
            *slot = color;
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    pub fn has_transparency(&self) -> bool {
        self.has_transparency
    }

    pub fn set_has_transparency(&mut self, value: bool) {
        self.has_transparency = value;
    }

    pub fn push(&mut self, color: Color) -> TrailResult<()> {
        if self.colors.len() >= MAX_COLORS {
            return Err(TrailError::validation("palette is full (256 entries)"));
        }
        self.colors.push(color);
        Ok(())
    }

    pub fn push_named(&mut self, color: Color, name: impl Into<String>) -> TrailResult<()> {
        self.push(color)?;
        self.names.push(name.into());
        Ok(())
    }

    /// Insert at `idx`, shifting later entries up. Unnamed palettes only.
    pub fn insert(&mut self, idx: usize, color: Color) -> TrailResult<()> {
        if self.colors.len() >= MAX_COLORS {
            return Err(TrailError::validation("palette is full (256 entries)"));
        }
        self.colors.insert(idx.min(self.colors.len()), color);
        Ok(())
    }

    /// Index of the first entry equal to `color` in all four channels.
    pub fn find_color(&self, color: Color) -> Option<usize> {
        self.colors.iter().position(|c| *c == color)
    }

    /// Remove the first exact occurrence of `color`. Returns whether one was found.
    pub fn remove(&mut self, color: Color) -> bool {
        match self.find_color(color) {
            Some(idx) => {
                self.colors.remove(idx);
                if idx < self.names.len() {
                    self.names.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Nearest entry by HSV distance among entries whose alpha equals `color.a` exactly.
    ///
    /// No distance threshold is applied: any alpha-compatible entry is a candidate, however far.
    /// Returns the index and its distance, or `None` when no entry shares the query's alpha.
    pub fn find_closest(&self, color: Color) -> Option<(usize, f32)> {
        let hsv = color.to_hsv();
        let mut best: Option<(usize, f32)> = None;
        for (idx, candidate) in self.colors.iter().enumerate() {
            if candidate.a != color.a {
                continue;
            }
            let dist = hsv.distance(candidate.to_hsv());
            if best.is_none_or(|(_, min)| dist < min) {
                best = Some((idx, dist));
            }
        }
        best
    }

    /// First entry with exactly the query's alpha.
    ///
    /// Only answers for palettes that carry transparency and for queries that are not fully
    /// opaque; used as a fallback when [`Palette::find_closest`] finds nothing.
    pub fn find_alpha(&self, color: Color) -> Option<usize> {
        if color.a == 255 || !self.has_transparency {
            return None;
        }
        self.colors.iter().position(|c| c.a == color.a)
    }

    /// Remapping table from `self` into `dst`.
    pub fn mapping_to(&self, dst: &Palette) -> PalMapping {
        get_mapping(self, dst)
    }

    /// Append colors of `other` that this palette does not represent yet.
    ///
    /// No-op when every entry of `other` already maps onto its own index here, or when this
    /// palette already holds `max_colors` entries. Otherwise the entries of `other` are ordered by
    /// ascending match distance and taken from the median outward (median, median+1,
    /// median-1, ...), skipping exact duplicates, until `max_colors` is reached. Returns the
    /// number of colors added.
    pub fn merge(&mut self, other: &Palette, max_colors: usize) -> usize {
        let max_colors = max_colors.min(MAX_COLORS);
        let mapping = get_mapping(other, self);
        if mapping.shift_count() == 0 || self.len() >= max_colors {
            return 0;
        }

        let mut by_dist: Vec<(f32, usize)> = (0..other.len())
            .map(|idx| (mapping.distance(idx), idx))
            .collect();
        by_dist.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let n = by_dist.len();
        let mid = n / 2;
        let mut order = Vec::with_capacity(n);
        for step in 0..=mid {
            if mid + step < n {
                order.push(by_dist[mid + step].1);
            }
            if step > 0
                && let Some(lo) = mid.checked_sub(step)
            {
                order.push(by_dist[lo].1);
            }
        }

        let mut added = 0;
        for idx in order {
            if self.len() >= max_colors {
                break;
            }
            let color = other.colors[idx];
            if self.find_color(color).is_some() {
                continue;
            }
            self.colors.push(color);
            if let Some(name) = other.name(idx)
                && self.names.len() + 1 == self.colors.len()
            {
                self.names.push(name.to_string());
            }
            added += 1;
        }
        added
    }

    /// Denser gradient palette built from the first `in_size` entries.
    ///
    /// Each consecutive pair contributes `out_size / in_size` colors, linearly interpolated with
    /// both endpoints included, alpha too. `in_size == 0` means the whole palette and
    /// `out_size == 0` means `min(255, 4 * in_size)`. When `out_size <= in_size` the palette is
    /// returned unchanged.
    pub fn spread(&self, in_size: usize, out_size: usize) -> Palette {
        let in_size = if in_size == 0 {
            self.len()
        } else {
            in_size.min(self.len())
        };
        let out_size = if out_size == 0 {
            (in_size * 4).min(255)
        } else {
            out_size.min(MAX_COLORS)
        };

        if out_size <= in_size || in_size < 2 {
            return Palette {
                colors: self.colors.clone(),
                names: Vec::new(),
                has_transparency: self.has_transparency,
            };
        }

        let count = (out_size / in_size).max(2);
        let mut colors = Vec::with_capacity((in_size - 1) * count);
        for pair in self.colors[..in_size].windows(2) {
            gradient(pair[0], pair[1], count, &mut colors);
        }
        colors.truncate(MAX_COLORS);
        Palette {
            colors,
            names: Vec::new(),
            has_transparency: self.has_transparency,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Color> {
        self.colors.iter()
    }
}

fn gradient(c1: Color, c2: Color, count: usize, out: &mut Vec<Color>) {
    let steps = (count - 1) as i32;
    let ch = |a: u8, b: u8, i: i32| {
        let a = i32::from(a);
        (a + (i32::from(b) - a) * i / steps).clamp(0, 255) as u8
    };
    for i in 0..count as i32 {
        out.push(Color::rgba(
            ch(c1.r, c2.r, i),
            ch(c1.g, c2.g, i),
            ch(c1.b, c2.b, i),
            ch(c1.a, c2.a, i),
        ));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/palette/palette.rs"]
mod tests;
