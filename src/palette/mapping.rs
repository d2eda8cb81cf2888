use crate::palette::palette::Palette;

/// Table slot value for source indices that found no destination entry.
pub const NO_MATCH: u16 = 256;

const LEN: usize = 256;

/// Index remapping table from a source palette into a destination palette.
///
/// Only the first `len()` slots (the source palette size) are meaningful; the rest keep
/// [`NO_MATCH`]. `shift_count` is the number of meaningful slots whose target differs from
/// their own index, so an identity mapping has a shift count of zero.
#[derive(Clone, Debug, PartialEq)]
pub struct PalMapping {
    from: [u8; LEN],
    to: [u16; LEN],
    distance: [f32; LEN],
    shift_count: u32,
    len: usize,
}

impl Default for PalMapping {
    fn default() -> Self {
        let mut from = [0u8; LEN];
        for (idx, slot) in from.iter_mut().enumerate() {
            *slot = idx as u8;
        }
        Self {
            from,
            to: [NO_MATCH; LEN],
            distance: [0.0; LEN],
            shift_count: 0,
            len: 0,
        }
    }
}

impl PalMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the empty table: identity `from`, every `to` slot unmatched.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of meaningful slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn shift_count(&self) -> u32 {
        self.shift_count
    }

    pub fn from(&self, idx: usize) -> u8 {
        self.from[idx.min(LEN - 1)]
    }

    /// Raw target slot, [`NO_MATCH`] when unmatched or out of range.
    pub fn to(&self, idx: usize) -> u16 {
        self.to.get(idx).copied().unwrap_or(NO_MATCH)
    }

    /// Destination index for `idx`, if one was found.
    pub fn target(&self, idx: usize) -> Option<u8> {
        match self.to(idx) {
            NO_MATCH => None,
            t => Some(t as u8),
        }
    }

    pub fn distance(&self, idx: usize) -> f32 {
        self.distance.get(idx).copied().unwrap_or(0.0)
    }

    /// Byte lookup table; unmatched slots collapse to index 0.
    pub fn lut(&self) -> [u8; LEN] {
        let mut lut = [0u8; LEN];
        for (slot, &to) in lut.iter_mut().zip(self.to.iter()) {
            if to != NO_MATCH {
                *slot = to as u8;
            }
        }
        lut
    }

    /// Translate an indexed pixel buffer in place.
    pub fn apply(&self, indices: &mut [u8]) {
        let lut = self.lut();
        for px in indices {
            *px = lut[usize::from(*px)];
        }
    }

    fn record(&mut self, src_idx: usize, to: u16, distance: f32) {
        self.from[src_idx] = src_idx as u8;
        self.to[src_idx] = to;
        self.distance[src_idx] = distance;
        if usize::from(to) != src_idx {
            self.shift_count += 1;
        }
        self.len = self.len.max(src_idx + 1);
    }
}

/// Match every entry of `src` against `dst`.
///
/// Each source color takes its nearest alpha-compatible destination entry. If there is none and
/// the source color is not fully opaque, the first destination entry with the same alpha is used
/// instead (see [`Palette::find_alpha`]).
pub fn get_mapping(src: &Palette, dst: &Palette) -> PalMapping {
    let mut mapping = PalMapping::default();
    for (src_idx, &color) in src.colors().iter().enumerate() {
        let (to, dist) = match dst.find_closest(color) {
            Some((idx, dist)) => (idx as u16, dist),
            None => match dst.find_alpha(color) {
                Some(idx) => {
                    let dist = dst
                        .get(idx)
                        .map_or(f32::MAX, |c| color.distance_hsv(c));
                    (idx as u16, dist)
                }
                None => (NO_MATCH, f32::MAX),
            },
        };
        mapping.record(src_idx, to, dist);
    }
    mapping
}

/// Single-entry cache of the mapping from the most recently seen source palette into a fixed
/// destination palette.
///
/// Frames of one sequence usually share a palette, so the table is only rebuilt when the source
/// palette actually changes.
#[derive(Clone, Debug)]
pub struct MappingCache {
    dst: Palette,
    cached: Option<(Palette, PalMapping)>,
}

impl MappingCache {
    pub fn new(dst: Palette) -> Self {
        Self { dst, cached: None }
    }

    pub fn destination(&self) -> &Palette {
        &self.dst
    }

    pub fn get(&mut self, src: &Palette) -> &PalMapping {
        let stale = self.cached.as_ref().is_none_or(|(seen, _)| seen != src);
        if stale {
            tracing::debug!(
                src_len = src.len(),
                dst_len = self.dst.len(),
                "rebuilding palette mapping"
            );
            self.cached = None;
        }
        let dst = &self.dst;
        &self
            .cached
            .get_or_insert_with(|| (src.clone(), get_mapping(src, dst)))
            .1
    }
}

#[cfg(test)]
#[path = "../../tests/unit/palette/mapping.rs"]
mod tests;
