//! Sequence blend: every frame is composited with the faded trail of the frames before it and
//! with the coverage record, then fade-out frames are rendered from the last frame.

use std::path::{Path, PathBuf};

use crate::assets::decode::decode_file;
use crate::color::rgba::Color;
use crate::config::model::{OverlayOrder, TrailConfig};
use crate::effects::composite::{
    cap_alpha, fade_alpha, indexed_over, indexed_under, maximum_indexed, over_in_place,
    select_active, under_in_place,
};
use crate::encode::sink::FrameSink;
use crate::foundation::core::CancelToken;
use crate::foundation::error::{TrailError, TrailResult};
use crate::palette::mapping::get_mapping;
use crate::palette::palette::{MAX_COLORS, Palette};
use crate::pipeline::accumulator::{Accumulator, Stage};
use crate::raster::buffer::{ColorImage, IndexedImage, PixelBuffer};

/// Alpha multiplier applied to a truecolor frame whenever history is drawn over it.
const TRUECOLOR_FRAME_ALPHA: f32 = 0.3;

pub const OVERLAY_LAYER_NAME: &str = "overlay.png";
pub const BOTTOM_LAYER_NAME: &str = "bottom.png";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlendOptions {
    /// Emit the final overlay and bottom layers before the fade stage.
    pub dump_layers: bool,
    /// Overrides the configured fade frame count.
    pub extra_frames: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlendStats {
    pub frames: usize,
    pub processed: usize,
    pub skipped: usize,
    pub fade_frames: u32,
    pub cancelled: bool,
}

/// Numeric level encoded in a palette entry name such as `rain-7`.
fn name_level(name: &str) -> Option<u32> {
    let part = name.split('-').nth(1)?;
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    part[..end].parse().ok()
}

/// Grayscale coverage palette.
///
/// Entry `i` of the input palette named `label-N` becomes a gray of brightness
/// `(max - N) * (256 / max)` with the base alpha, so higher levels read darker. Index 0 is
/// transparent, index 255 black, every other entry the base color. `max_level` defaults to the
/// largest level found in the names.
pub fn bottom_palette(
    in_palette: &Palette,
    base: Color,
    max_level: Option<u32>,
) -> TrailResult<Palette> {
    let levels: Vec<Option<u32>> = (0..in_palette.len())
        .map(|idx| in_palette.name(idx).and_then(name_level))
        .collect();
    let max = max_level
        .or_else(|| levels.iter().flatten().copied().max())
        .unwrap_or(0);

    let mut colors = vec![base; MAX_COLORS];
    colors[0] = Color::TRANSPARENT;
    colors[MAX_COLORS - 1] = Color::BLACK;
    if max > 0 {
        let step = 256 / max;
        for (idx, level) in levels.iter().enumerate().take(MAX_COLORS - 1).skip(1) {
            if let Some(level) = level {
                let v = ((max - (*level).min(max)) * step).min(255) as u8;
                colors[idx] = Color::rgba(v, v, v, base.a);
            }
        }
    } else {
        tracing::warn!("no label-N names in in-palette, coverage layer uses the base color");
    }
    Palette::from_colors(colors, true)
}

/// Swap colors of `palette` that appear exactly in `in_palette` for the output color at the same
/// position. Returns how many entries changed.
pub fn reconcile_palette(
    palette: &mut Palette,
    in_palette: &Palette,
    out_palette: &Palette,
) -> usize {
    let mut changed = 0;
    for idx in 0..palette.len() {
        let Some(color) = palette.get(idx) else {
            continue;
        };
        if let Some(matched) = in_palette.find_color(color)
            && let Some(out) = out_palette.get(matched)
            && out != color
        {
            palette.set(idx, out);
            changed += 1;
        }
    }
    if changed > 0 && palette.iter().any(|c| c.a != 255) {
        palette.set_has_transparency(true);
    }
    changed
}

/// Bare file name of a frame path.
pub(crate) fn frame_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn fade_name(stem: &str, ext: &str, idx: u32) -> String {
    if ext.is_empty() {
        format!("{stem}-{idx:03}")
    } else {
        format!("{stem}-{idx:03}.{ext}")
    }
}

/// Overlay alpha ceiling for fade step `idx` of `count`, a linear ramp down from `255 * multiple`.
fn fade_cap(multiple: f32, idx: u32, count: u32) -> u8 {
    let remaining = count.saturating_sub(idx) as f32 / count.max(1) as f32;
    (255.0 * multiple * remaining).clamp(0.0, 255.0) as u8
}

/// Palette index of the closest input palette color for every active pixel, 0 elsewhere.
///
/// Coverage records that a pixel was active, not how opaque it was, so every visible pixel is
/// matched as if it were opaque.
fn classify_active(active: &ColorImage, in_palette: &Palette) -> TrailResult<IndexedImage> {
    let pixels = active
        .pixels()
        .iter()
        .map(|&c| {
            if c.a == 0 {
                return 0;
            }
            in_palette
                .find_closest(c.with_alpha(255))
                .map_or(0, |(idx, _)| idx.min(MAX_COLORS - 1) as u8)
        })
        .collect();
    IndexedImage::from_parts(active.width(), active.height(), pixels, in_palette.clone())
}

/// Stateful per-run driver around an [`Accumulator`].
pub struct BlendPipeline<'a> {
    config: &'a TrailConfig,
    overlay_palette: &'a Palette,
    bottom_palette: Option<Palette>,
    acc: Accumulator,
}

impl<'a> BlendPipeline<'a> {
    pub fn new(config: &'a TrailConfig) -> TrailResult<Self> {
        let overlay_palette = config.require_overlay_palette()?;
        let bottom_palette = if config.bottom.enabled() {
            tracing::info!("blend includes bottom coverage layer");
            Some(bottom_palette(
                &config.in_palette,
                config.bottom.color,
                config.bottom.max_level,
            )?)
        } else {
            None
        };
        let mut acc = Accumulator::new();
        acc.begin();
        Ok(Self {
            config,
            overlay_palette,
            bottom_palette,
            acc,
        })
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.acc
    }

    /// Composite one frame, emit it as `name`, then fold it into the history layers.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(name = name, depth = frame.bit_depth())
    )]
    pub fn process_frame(
        &mut self,
        name: &str,
        frame: PixelBuffer,
        sink: &mut dyn FrameSink,
    ) -> TrailResult<()> {
        if self.acc.stage() != Stage::Accumulating {
            return Err(TrailError::validation(format!(
                "frame '{name}' arrived in stage {:?}",
                self.acc.stage()
            )));
        }
        match frame {
            PixelBuffer::Indexed(img) => self.blend_indexed(name, img, sink),
            PixelBuffer::Rgb(img) | PixelBuffer::Rgba(img) => {
                self.blend_truecolor(name, img, sink)
            }
        }
    }

    fn blend_indexed(
        &mut self,
        name: &str,
        mut img: IndexedImage,
        sink: &mut dyn FrameSink,
    ) -> TrailResult<()> {
        let cfg = self.config;
        let changed = reconcile_palette(img.palette_mut(), &cfg.in_palette, &cfg.out_palette);
        tracing::debug!(changed, "palette reconciled");

        let mut composite = img.to_color();
        self.draw_history(&mut composite, cfg.overlay.order);
        sink.push_frame(name, PixelBuffer::Rgba(composite))?;
        tracing::info!(name, "blended");

        // Frame palettes may change from one frame to the next, so the mapping is never reused.
        let mapping = get_mapping(img.palette(), &cfg.out_palette);
        tracing::debug!(shift_count = mapping.shift_count(), "overlay mapping");
        mapping.apply(img.pixels_mut());

        let size = img.size();
        indexed_over(self.acc.overlay_or_insert(size), &img, self.overlay_palette);
        if let Some(bottom_palette) = &self.bottom_palette {
            maximum_indexed(self.acc.bottom_or_insert(size, bottom_palette), &img);
        }
        Ok(())
    }

    fn blend_truecolor(
        &mut self,
        name: &str,
        img: ColorImage,
        sink: &mut dyn FrameSink,
    ) -> TrailResult<()> {
        let active = select_active(&img);

        let mut composite = img;
        if self.acc.overlay().is_some() {
            fade_alpha(&mut composite, TRUECOLOR_FRAME_ALPHA, 0);
            self.draw_history(&mut composite, OverlayOrder::Over);
        }
        sink.push_frame(name, PixelBuffer::Rgba(composite))?;
        tracing::info!(name, "blended");

        let size = active.size();
        over_in_place(self.acc.overlay_or_insert(size), &active);
        if let Some(bottom_palette) = &self.bottom_palette {
            let levels = classify_active(&active, &self.config.in_palette)?;
            maximum_indexed(self.acc.bottom_or_insert(size, bottom_palette), &levels);
        }
        Ok(())
    }

    /// Fade the overlay one step and draw it with the coverage layer into `frame`.
    fn draw_history(&mut self, frame: &mut ColorImage, order: OverlayOrder) {
        let overlay_cfg = self.config.overlay;
        let Some(overlay) = self.acc.overlay_mut() else {
            return;
        };
        fade_alpha(overlay, overlay_cfg.alpha_multiple, overlay_cfg.alpha_minimum);
        match order {
            OverlayOrder::Over => over_in_place(frame, overlay),
            OverlayOrder::Under => under_in_place(frame, overlay),
        }
        self.draw_bottom(frame, None);
    }

    fn draw_bottom(&self, frame: &mut ColorImage, max_alpha: Option<u8>) {
        if let Some(bottom) = self.acc.bottom() {
            indexed_under(frame, bottom, bottom.palette(), max_alpha);
        }
    }

    /// Emit the current overlay and bottom layers.
    pub fn dump_layers(&self, sink: &mut dyn FrameSink) -> TrailResult<()> {
        if let Some(overlay) = self.acc.overlay() {
            sink.push_frame(OVERLAY_LAYER_NAME, PixelBuffer::Rgba(overlay.clone()))?;
        }
        if let Some(bottom) = self.acc.bottom() {
            sink.push_frame(BOTTOM_LAYER_NAME, PixelBuffer::Indexed(bottom.clone()))?;
        }
        Ok(())
    }

    /// Render `extra_frames` fade frames plus one final frame from `last`, the reloaded last
    /// frame of the sequence. Frames are named `<stem>-NNN.<ext>` after `name`.
    ///
    /// Each fade step fades the overlay by the configured multiple and caps its alpha on a
    /// linear ramp to zero. The final frame drops the overlay and draws the coverage layer at
    /// half the base alpha. Returns the number of frames emitted; 0 when there is no overlay.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(name = name, extra_frames = extra_frames)
    )]
    pub fn fade(
        &mut self,
        name: &str,
        last: PixelBuffer,
        extra_frames: u32,
        sink: &mut dyn FrameSink,
    ) -> TrailResult<u32> {
        if !self.acc.start_fade() {
            tracing::warn!(name, "no overlay layer, fade skipped");
            return Ok(0);
        }
        let base = match last {
            PixelBuffer::Indexed(mut img) => {
                let cfg = self.config;
                reconcile_palette(img.palette_mut(), &cfg.in_palette, &cfg.out_palette);
                img.to_color()
            }
            PixelBuffer::Rgb(img) | PixelBuffer::Rgba(img) => img,
        };
        let path = Path::new(name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let multiple = self.config.overlay.alpha_multiple;
        let mut emitted = 0;
        for idx in 0..extra_frames {
            let mut frame = base.clone();
            if let Some(overlay) = self.acc.overlay_mut() {
                fade_alpha(overlay, multiple, 0);
                cap_alpha(overlay, fade_cap(multiple, idx, extra_frames));
                over_in_place(&mut frame, overlay);
            }
            self.draw_bottom(&mut frame, None);
            sink.push_frame(&fade_name(&stem, &ext, idx), PixelBuffer::Rgba(frame))?;
            emitted += 1;
        }

        let mut last_frame = base;
        self.draw_bottom(&mut last_frame, Some(self.config.bottom.color.a / 2));
        sink.push_frame(
            &fade_name(&stem, &ext, extra_frames),
            PixelBuffer::Rgba(last_frame),
        )?;
        emitted += 1;
        tracing::info!(frames = emitted, "fade finished");

        self.acc.close();
        Ok(emitted)
    }

    /// Release the history layers.
    pub fn finish(&mut self) {
        self.acc.close();
    }
}

/// Blend a frame sequence into `sink`.
///
/// Paths are processed in sorted order. Frames that fail to decode or blend are logged and
/// skipped. After the sequence the last successfully blended frame is decoded again and used
/// for the fade stage. Cancellation is checked between frames; a cancelled run skips the fade.
#[tracing::instrument(level = "info", skip_all, fields(frames = paths.len()))]
pub fn run_blend(
    paths: &[PathBuf],
    config: &TrailConfig,
    options: &BlendOptions,
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
) -> TrailResult<BlendStats> {
    let mut paths = paths.to_vec();
    paths.sort();
    let mut stats = BlendStats {
        frames: paths.len(),
        ..BlendStats::default()
    };
    if paths.is_empty() {
        tracing::warn!("no images to blend");
        return Ok(stats);
    }

    let mut pipeline = BlendPipeline::new(config)?;
    let mut last_ok: Option<(&Path, String)> = None;
    for path in &paths {
        if cancel.is_cancelled() {
            tracing::warn!("blend cancelled");
            stats.cancelled = true;
            break;
        }
        let Some(name) = frame_name(path) else {
            tracing::warn!(path = %path.display(), "skipping path without a file name");
            stats.skipped += 1;
            continue;
        };
        let result =
            decode_file(path).and_then(|frame| pipeline.process_frame(&name, frame, sink));
        match result {
            Ok(()) => {
                stats.processed += 1;
                last_ok = Some((path.as_path(), name));
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "skipping frame"
                );
                stats.skipped += 1;
            }
        }
    }

    if options.dump_layers
        && let Err(err) = pipeline.dump_layers(sink)
    {
        tracing::warn!(error = %format!("{err:#}"), "could not emit history layers");
    }

    if !stats.cancelled
        && let Some((path, name)) = last_ok
    {
        let extra = options.extra_frames.unwrap_or(config.extra_frames);
        match decode_file(path).and_then(|frame| pipeline.fade(&name, frame, extra, sink)) {
            Ok(count) => stats.fade_frames = count,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "fade failed"
                );
            }
        }
    }
    pipeline.finish();

    tracing::info!(
        processed = stats.processed,
        skipped = stats.skipped,
        fade_frames = stats.fade_frames,
        "blend finished"
    );
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/blend.rs"]
mod tests;
