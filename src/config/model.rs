use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};

use crate::color::rgba::{Color, parse_color};
use crate::foundation::error::{TrailError, TrailResult};
use crate::palette::palette::Palette;

/// Fade frames rendered after the last real frame unless configured otherwise.
pub const DEFAULT_EXTRA_FRAMES: u32 = 30;

/// Darken/brighten preset referenced by name from derived palettes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterCfg {
    /// Below 1 darkens, 1 keeps, above 1 brightens.
    pub rate: f32,
    pub start_alpha: u8,
    pub end_alpha: u8,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            rate: 0.9,
            start_alpha: 255,
            end_alpha: 0,
        }
    }
}

impl FilterCfg {
    pub fn apply(&self, color: Color) -> Color {
        color.scale(self.rate, self.start_alpha)
    }
}

/// Whether the faded history is drawn over or under the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayOrder {
    Over,
    #[default]
    Under,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayCfg {
    /// Per-frame alpha multiplier, `0 < m <= 1`.
    pub alpha_multiple: f32,
    /// Alpha floor for pixels that are above it, 0 disables.
    pub alpha_minimum: u8,
    pub order: OverlayOrder,
}

impl Default for OverlayCfg {
    fn default() -> Self {
        Self {
            alpha_multiple: 0.99,
            alpha_minimum: 0,
            order: OverlayOrder::Under,
        }
    }
}

/// Coverage layer settings. A base color with alpha 0 disables the layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BottomCfg {
    pub color: Color,
    /// Highest `label-N` level of the grayscale ramp; derived from the palette names when unset.
    pub max_level: Option<u32>,
}

impl BottomCfg {
    pub fn enabled(&self) -> bool {
        self.color.a != 0
    }
}

/// Parsed and resolved configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct TrailConfig {
    pub in_palette: Palette,
    pub out_palette: Palette,
    pub overlay_palette: Option<Palette>,
    pub filters: BTreeMap<String, FilterCfg>,
    pub overlay: OverlayCfg,
    pub bottom: BottomCfg,
    pub extra_frames: u32,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    #[serde(default)]
    in_palette: Option<Map<String, Value>>,
    #[serde(default)]
    out_palette: Option<Map<String, Value>>,
    #[serde(default)]
    overlay_palette: Option<Map<String, Value>>,
    #[serde(default)]
    overlay_filters: Map<String, Value>,
    #[serde(default)]
    overlay: Option<RawOverlay>,
    #[serde(default)]
    bottom: Option<RawBottom>,
    #[serde(default)]
    extra_frames: Option<u32>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawOverlay {
    alpha_multiple: Option<Value>,
    alpha_minimum: Option<Value>,
    #[serde(default)]
    order: OverlayOrder,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawBottom {
    rgba: Option<String>,
    max_level: Option<u32>,
}

fn number(v: &Value, what: &str) -> TrailResult<f32> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.map(|n| n as f32)
        .ok_or_else(|| TrailError::config(format!("{what}: expected a number, got {v}")))
}

/// Percent (0..100) to an 8-bit alpha.
fn percent_to_alpha(p: f32) -> u8 {
    (p / 100.0 * 255.0).clamp(0.0, 255.0) as u8
}

fn parse_filter(name: &str, v: &Value) -> TrailResult<FilterCfg> {
    let Value::Object(fields) = v else {
        return Err(TrailError::config(format!(
            "overlay-filters.{name}: expected an object"
        )));
    };
    let get = |key: &str, default: f32| -> TrailResult<f32> {
        match fields.get(key) {
            Some(v) => number(v, &format!("overlay-filters.{name}.{key}")),
            None => Ok(default),
        }
    };
    let alpha = get("alpha", 100.0)?;
    Ok(FilterCfg {
        rate: get("rate", 100.0)? / 100.0,
        start_alpha: percent_to_alpha(get("start-alpha", alpha)?),
        end_alpha: percent_to_alpha(get("end-alpha", 0.0)?),
    })
}

/// Build one palette from its `name -> color | filter` table.
///
/// A filter entry transforms the color at the same position of `reference`. Entries that are
/// neither are logged and skipped; an empty result is an error.
fn parse_palette(
    id: &str,
    entries: &Map<String, Value>,
    reference: Option<&Palette>,
    filters: &BTreeMap<String, FilterCfg>,
) -> TrailResult<Palette> {
    let mut palette = Palette::new();
    for (idx, (name, value)) in entries.iter().enumerate() {
        let Some(item) = value.as_str() else {
            tracing::warn!(palette = id, entry = %name, "palette entry is not a string, skipped");
            continue;
        };
        let color = match parse_color(item) {
            Ok(color) => color,
            Err(err) => match (filters.get(item.trim()), reference) {
                (Some(filter), Some(reference)) => match reference.get(idx) {
                    Some(base) => filter.apply(base),
                    None => {
                        tracing::warn!(
                            palette = id,
                            entry = %name,
                            "palette has more entries than its reference palette, skipped"
                        );
                        continue;
                    }
                },
                _ => {
                    tracing::warn!(
                        palette = id,
                        entry = %name,
                        error = %format!("{err:#}"),
                        "unknown or malformed palette entry, skipped"
                    );
                    continue;
                }
            },
        };
        palette.push_named(color, name.as_str())?;
    }

    if palette.is_empty() {
        return Err(TrailError::config(format!("{id} has no usable colors")));
    }
    let translucent = palette.iter().any(|c| c.a != 255);
    palette.set_has_transparency(translucent);
    Ok(palette)
}

impl TrailConfig {
    /// Load a configuration file. `~` at the start of the path means the home directory.
    pub fn from_path(path: &Path) -> TrailResult<Self> {
        let path = expand_home(path);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text)
            .map_err(|e| TrailError::config(format!("{}: {e}", path.display())))
    }

    /// Parse configuration JSON. `//` and `/* */` comments are allowed.
    pub fn from_json_str(text: &str) -> TrailResult<Self> {
        let cleaned = strip_json_comments(text);
        let raw: RawConfig = serde_json::from_str(&cleaned)
            .map_err(|e| TrailError::config(format!("invalid config json: {e}")))?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawConfig) -> TrailResult<Self> {
        let mut filters = BTreeMap::new();
        for (name, value) in &raw.overlay_filters {
            filters.insert(name.clone(), parse_filter(name, value)?);
        }

        let in_entries = raw
            .in_palette
            .as_ref()
            .ok_or_else(|| TrailError::config("missing in-palette"))?;
        let in_palette = parse_palette("in-palette", in_entries, None, &filters)?;

        let out_palette = match &raw.out_palette {
            Some(entries) => {
                match parse_palette("out-palette", entries, Some(&in_palette), &filters) {
                    Ok(p) => p,
                    Err(err) => {
                        tracing::warn!(
                            error = %format!("{err:#}"),
                            "out-palette unusable, using in-palette"
                        );
                        in_palette.clone()
                    }
                }
            }
            None => in_palette.clone(),
        };

        let overlay_palette = match &raw.overlay_palette {
            Some(entries) => Some(parse_palette(
                "overlay-palette",
                entries,
                Some(&out_palette),
                &filters,
            )?),
            None => None,
        };

        let mut overlay = OverlayCfg::default();
        if let Some(o) = &raw.overlay {
            if let Some(v) = &o.alpha_multiple {
                overlay.alpha_multiple = number(v, "overlay.alpha-multiple")? / 100.0;
            }
            if let Some(v) = &o.alpha_minimum {
                overlay.alpha_minimum = percent_to_alpha(number(v, "overlay.alpha-minimum")?);
            }
            overlay.order = o.order;
        }

        let mut bottom = BottomCfg::default();
        if let Some(b) = &raw.bottom {
            bottom.color = parse_color(b.rgba.as_deref().unwrap_or("128,128,128,16"))?;
            bottom.max_level = b.max_level;
        }

        let cfg = Self {
            in_palette,
            out_palette,
            overlay_palette,
            filters,
            overlay,
            bottom,
            extra_frames: raw.extra_frames.unwrap_or(DEFAULT_EXTRA_FRAMES),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> TrailResult<()> {
        let m = self.overlay.alpha_multiple;
        if !(m > 0.0 && m <= 1.0) {
            return Err(TrailError::config(format!(
                "overlay.alpha-multiple must be in (0, 100], got {}",
                m * 100.0
            )));
        }
        if self.bottom.max_level == Some(0) {
            return Err(TrailError::config("bottom.max-level must be >= 1"));
        }
        Ok(())
    }

    /// Overlay palette, required by the blend pipeline.
    pub fn require_overlay_palette(&self) -> TrailResult<&Palette> {
        self.overlay_palette
            .as_ref()
            .ok_or_else(|| TrailError::config("missing overlay-palette"))
    }
}

fn expand_home(path: &Path) -> std::path::PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = std::env::var_os("HOME")
    {
        return Path::new(&home).join(rest);
    }
    path.to_path_buf()
}

/// Remove `//` line comments and `/* */` block comments outside of string literals.
pub fn strip_json_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/config/model.rs"]
mod tests;
