//! Contract between the tile scheduler and the per-pixel shading stage.

pub mod ground;

use std::sync::Arc;

use glam::Vec3;

use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::TileRenderResult;
use crate::parts::partition::PanoramaSlice;
use crate::render::config::RenderConfig;
use crate::render::scene::Camera;
use crate::result::model::RenderResult;
use crate::schedule::cancel::CancelToken;
use crate::shadow::{ShadowBuffer, SpotLight};

/// A light together with the shadow buffer built for the current sub-frame.
#[derive(Clone, Debug)]
pub struct ShadowedLight {
    pub light: SpotLight,
    pub buffer: Option<ShadowBuffer>,
}

/// Read-only render state shared by every worker of one sub-frame.
#[derive(Clone, Debug)]
pub struct ShadeContext {
    pub config: Arc<RenderConfig>,
    /// Full output image.
    pub image: Canvas,
    /// Display rectangle in image coordinates.
    pub display: PixelRect,
    pub camera: Camera,
    pub lights: Arc<[ShadowedLight]>,
    /// Sub-frame time offset in frames.
    pub time: f32,
    /// Field parity when rendering one interlaced field: result rows map to every
    /// second display row starting at this parity.
    pub field: Option<u32>,
}

impl ShadeContext {
    pub fn new(config: Arc<RenderConfig>, image: Canvas, display: PixelRect, camera: Camera) -> Self {
        Self {
            config,
            image,
            display,
            camera,
            lights: Arc::from(Vec::new()),
            time: 0.0,
            field: None,
        }
    }

    /// Image pixel covered by buffer pixel `(x, y)` of `job`'s result.
    pub fn image_pixel(&self, job: &TileJob, x: u32, y: u32) -> (i32, i32) {
        let dx = job.rect.xmin + x as i32;
        let dy = job.rect.ymin + y as i32;
        let row = match self.field {
            Some(parity) => 2 * dy + parity as i32,
            None => dy,
        };
        (self.display.xmin + dx, self.display.ymin + row)
    }

    /// Camera ray through image point `(px, py)` for `job`, honoring its panorama slice.
    pub fn primary_ray(&self, job: &TileJob, px: f32, py: f32) -> (Vec3, Vec3) {
        let (shift, rotation) = job
            .slice
            .map_or((0.0, 0.0), |s| (s.pixel_shift as f32, s.rotation));
        self.camera
            .ray(px + shift, py, self.image.width, self.image.height, rotation)
    }
}

/// One dispatched part as seen by the shading stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileJob {
    pub part: usize,
    /// Rendered rectangle relative to the display rectangle, crop included.
    pub rect: PixelRect,
    pub crop: u32,
    pub display_order: u64,
    pub worker: usize,
    pub slice: Option<PanoramaSlice>,
}

/// How a shading call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadeOutcome {
    /// Every pixel was written.
    Complete,
    /// Cancellation was observed; the result is partial and must not be merged.
    Aborted,
}

/// Per-pixel shading stage filling one tile result.
pub trait TileShader: Send + Sync {
    /// Fill `out`, which covers `job.rect` and arrives zeroed.
    ///
    /// Implementations poll `cancel` at a regular interval and return
    /// [`ShadeOutcome::Aborted`] once it fires.
    fn shade_tile(
        &self,
        ctx: &ShadeContext,
        job: &TileJob,
        out: &mut RenderResult,
        cancel: &CancelToken,
    ) -> TileRenderResult<ShadeOutcome>;
}

#[cfg(test)]
#[path = "../../tests/unit/shade/context.rs"]
mod tests;
