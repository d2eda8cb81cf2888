//! Layers carried across one ordered blend run.
//!
//! The accumulator is single-writer state: frames must be fed strictly in sequence order because
//! every update depends on the history built by the frames before it.

use crate::color::rgba::Color;
use crate::foundation::core::Size;
use crate::palette::palette::Palette;
use crate::raster::buffer::{ColorImage, IndexedImage};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Idle,
    Accumulating,
    Fading,
    Done,
}

/// History of one run: the fading `overlay` trail and the `bottom` coverage record.
///
/// Both layers are allocated on first use with the size of the frame that needed them.
#[derive(Debug, Default)]
pub struct Accumulator {
    stage: Stage,
    overlay: Option<ColorImage>,
    bottom: Option<IndexedImage>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Idle -> Accumulating. Allocates nothing.
    pub fn begin(&mut self) {
        if self.stage == Stage::Idle {
            self.stage = Stage::Accumulating;
        }
    }

    /// Accumulating -> Fading when an overlay exists, otherwise straight to Done.
    ///
    /// Returns whether fade frames should be rendered.
    pub fn start_fade(&mut self) -> bool {
        if self.stage != Stage::Accumulating {
            return false;
        }
        if self.overlay.is_some() {
            self.stage = Stage::Fading;
            true
        } else {
            self.stage = Stage::Done;
            false
        }
    }

    /// Release both layers. The accumulator is inert afterwards.
    pub fn close(&mut self) {
        self.overlay = None;
        self.bottom = None;
        self.stage = Stage::Done;
    }

    pub fn overlay(&self) -> Option<&ColorImage> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut ColorImage> {
        self.overlay.as_mut()
    }

    pub fn bottom(&self) -> Option<&IndexedImage> {
        self.bottom.as_ref()
    }

    /// Overlay layer, allocated fully transparent at `size` if missing.
    pub fn overlay_or_insert(&mut self, size: Size) -> &mut ColorImage {
        self.overlay.get_or_insert_with(|| {
            tracing::debug!(width = size.width, height = size.height, "overlay layer created");
            ColorImage::filled(size.width, size.height, Color::TRANSPARENT)
        })
    }

    /// Coverage layer, allocated at index 0 with `palette` if missing.
    pub fn bottom_or_insert(&mut self, size: Size, palette: &Palette) -> &mut IndexedImage {
        self.bottom.get_or_insert_with(|| {
            tracing::debug!(width = size.width, height = size.height, "bottom layer created");
            IndexedImage::new(size.width, size.height, palette.clone())
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/accumulator.rs"]
mod tests;
