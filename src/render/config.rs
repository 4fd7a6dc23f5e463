use std::time::Duration;

use crate::foundation::core::Rect;
use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::parts::partition::{
    MAX_MIN_PART_SPAN, MAX_PARTS_PER_AXIS, MAX_TILE_CROP, MIN_PART_SPAN, TilingMode,
};
use crate::result::model::LayerConfig;

/// Most worker threads the tile scheduler runs.
pub const MAX_RENDER_THREADS: usize = 2;
/// Most motion-blur sub-frames per frame.
pub const MAX_BLUR_SAMPLES: u32 = 32;

/// Motion blur accumulation settings.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MotionBlurConfig {
    /// Sub-frames rendered and averaged.
    pub samples: u32,
    /// Shutter length in frames; sub-frame `i` of `n` is offset by `shutter * i / n`.
    pub shutter: f32,
    /// Blend the combined buffer with alpha keying.
    pub key_alpha: bool,
}

impl Default for MotionBlurConfig {
    fn default() -> Self {
        Self {
            samples: 5,
            shutter: 0.5,
            key_alpha: false,
        }
    }
}

impl MotionBlurConfig {
    /// Time offset of 1-based sub-frame `i`.
    pub fn time_offset(&self, i: u32) -> f32 {
        self.shutter * i as f32 / self.samples.max(1) as f32
    }
}

/// Interlaced field rendering settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Render the odd rows first.
    pub odd_first: bool,
    /// Both fields share one moment in time.
    pub still: bool,
}

impl FieldConfig {
    /// Time offset of the second field.
    pub fn second_field_offset(&self) -> f32 {
        if self.still { 0.0 } else { 0.5 }
    }
}

/// Render settings shared read-only by every worker.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub parts_x: u32,
    pub parts_y: u32,
    /// Filter margin in pixels rendered around every part.
    pub tile_crop: u32,
    /// Smallest part span in pixels; requested part counts shrink to honor it.
    pub min_part_span: u32,
    /// Normalized border (0..1 on both axes). `None` renders the full image.
    pub border: Option<Rect>,
    /// Keep only the border region in the final result.
    pub crop_to_border: bool,
    /// Worker threads, clamped to `1..=MAX_RENDER_THREADS`.
    pub threads: usize,
    /// Global resolution scale in percent (1..=100).
    pub percentage: u32,
    pub tiling: TilingMode,
    /// Render layers; empty synthesizes one default combined layer.
    pub layers: Vec<LayerConfig>,
    pub motion_blur: Option<MotionBlurConfig>,
    pub fields: Option<FieldConfig>,
    /// Blend sub-frames in gamma-decoded space.
    pub gamma_correct: bool,
    /// Upper bound on the coordinator's wait between completion polls.
    pub poll_interval_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            parts_x: 4,
            parts_y: 4,
            tile_crop: 0,
            min_part_span: MIN_PART_SPAN as u32,
            border: None,
            crop_to_border: false,
            threads: MAX_RENDER_THREADS,
            percentage: 100,
            tiling: TilingMode::Grid,
            layers: Vec::new(),
            motion_blur: None,
            fields: None,
            gamma_correct: false,
            poll_interval_ms: 2,
        }
    }
}

impl RenderConfig {
    /// Parse a (possibly partial) JSON document.
    pub fn from_json_str(s: &str) -> TileRenderResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Check every field and normalize the lenient ones (thread count, full-image border).
    pub fn validated(mut self) -> TileRenderResult<Self> {
        if self.parts_x > MAX_PARTS_PER_AXIS || self.parts_y > MAX_PARTS_PER_AXIS {
            return Err(TileRenderError::config(format!(
                "part count exceeds {MAX_PARTS_PER_AXIS} per axis"
            )));
        }
        if !(1..=100).contains(&self.percentage) {
            return Err(TileRenderError::config("percentage must lie in 1..=100"));
        }
        if !(1..=MAX_MIN_PART_SPAN).contains(&self.min_part_span) {
            return Err(TileRenderError::config(format!(
                "min_part_span must lie in 1..={MAX_MIN_PART_SPAN}"
            )));
        }
        if self.tile_crop > MAX_TILE_CROP {
            return Err(TileRenderError::config(format!(
                "tile_crop must not exceed {MAX_TILE_CROP}"
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(TileRenderError::config("poll_interval_ms must be >= 1"));
        }
        if let Some(b) = self.border {
            if !(b.x1 > b.x0 && b.y1 > b.y0) {
                return Err(TileRenderError::config("border has zero area"));
            }
            if b.x0 <= 0.0 && b.y0 <= 0.0 && b.x1 >= 1.0 && b.y1 >= 1.0 {
                self.border = None;
            }
        }
        if let Some(mb) = self.motion_blur {
            if mb.samples == 0 || mb.samples > MAX_BLUR_SAMPLES {
                return Err(TileRenderError::config(format!(
                    "motion blur samples must lie in 1..={MAX_BLUR_SAMPLES}"
                )));
            }
            if !(mb.shutter.is_finite() && mb.shutter >= 0.0) {
                return Err(TileRenderError::config("shutter must be finite and >= 0"));
            }
        }
        {
            let mut names = std::collections::HashSet::new();
            for layer in &self.layers {
                if !names.insert(layer.name.as_str()) {
                    return Err(TileRenderError::config(format!(
                        "duplicate layer name '{}'",
                        layer.name
                    )));
                }
            }
        }
        self.threads = self.threads.clamp(1, MAX_RENDER_THREADS);
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Image size after the percentage scale, at least one pixel per axis.
    pub fn scaled_size(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = |v: u32| ((u64::from(v) * u64::from(self.percentage)) / 100).max(1) as u32;
        (scale(width), scale(height))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/config.rs"]
mod tests;
