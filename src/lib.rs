//! radartrail composites ordered sequences of palette-indexed radar frames.
//!
//! Every frame is reconciled against a reference palette, drawn together with two history
//! layers (a fading color trail of earlier activity and a coverage record of the highest level
//! seen per pixel), and emitted. After the last frame a run of fade-out frames decays the trail.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: files become a [`PixelBuffer`] (8-bit indexed with palette, or 24/32-bit color)
//! 2. **Map**: frame palettes are matched against configured palettes ([`get_mapping`])
//! 3. **Blend**: [`BlendPipeline`] updates the [`Accumulator`] strictly in sequence order
//! 4. **Emit**: frames go to a [`FrameSink`]; [`DirSink`] writes them on a background thread
//!
//! Blur and slope shading reuse the same palette machinery as stateless per-file drivers.
#![forbid(unsafe_code)]

pub mod assets;
pub mod color;
pub mod config;
pub mod effects;
pub mod encode;
pub mod foundation;
pub mod palette;
pub mod pipeline;
pub mod raster;

pub use crate::color::rgba::Color;
pub use crate::config::model::TrailConfig;
pub use crate::encode::save_queue::{DEFAULT_QUEUE_CAPACITY, SaveQueue, SaveReport};
pub use crate::encode::sink::{DirSink, FrameSink, InMemorySink};
pub use crate::foundation::core::CancelToken;
pub use crate::foundation::error::{TrailError, TrailResult};
pub use crate::palette::mapping::{PalMapping, get_mapping};
pub use crate::palette::palette::Palette;
pub use crate::pipeline::accumulator::{Accumulator, Stage};
pub use crate::pipeline::blend::{BlendOptions, BlendPipeline, BlendStats, run_blend};
pub use crate::pipeline::batch::{
    BatchStats, MontageStats, TileGrid, run_blur, run_montage, run_shade, run_to_gray,
};
pub use crate::raster::buffer::{ColorImage, IndexedImage, PixelBuffer};
