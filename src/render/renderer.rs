use std::sync::Arc;

use glam::Mat4;

use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::parts::partition::TilingMode;
use crate::raster::DepthRasterizer;
use crate::raster::soup::TriangleSoup;
use crate::render::callbacks::{NoCallbacks, RenderCallbacks};
use crate::render::config::RenderConfig;
use crate::render::pipeline::{self, FrameInputs};
use crate::render::scene::Camera;
use crate::result::model::{RenderResult, ResultLayout};
use crate::result::pool::{TileAllocator, TilePoolOpts, TilePoolStats};
use crate::schedule::cancel::CancelToken;
use crate::schedule::scheduler::RenderStats;
use crate::shade::ground::GroundShader;
use crate::shade::{ShadowedLight, TileShader};
use crate::shadow::{JitterCache, SpotLight};

/// Validated per-render state, frozen by [`Renderer::init_render_state`].
struct RenderState {
    config: Arc<RenderConfig>,
    image: Canvas,
    display: PixelRect,
    layout: Arc<ResultLayout>,
    allocator: TileAllocator,
}

/// Drives tiled renders of one scene.
///
/// Typical use: [`Renderer::init_render_state`], scene setters, then
/// [`Renderer::run_tiled_render`] and [`Renderer::take_result`].
pub struct Renderer {
    state: Option<RenderState>,
    camera: Camera,
    lights: Vec<SpotLight>,
    rasterizer: Arc<dyn DepthRasterizer>,
    shader: Arc<dyn TileShader>,
    callbacks: Arc<dyn RenderCallbacks>,
    cancel: CancelToken,
    jitter: JitterCache,
    result: Option<RenderResult>,
    stats: Option<RenderStats>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Renderer with an empty scene: no lights, no occluders, the ground shader.
    pub fn new() -> Self {
        Self {
            state: None,
            camera: Camera::default(),
            lights: Vec::new(),
            rasterizer: Arc::new(()),
            shader: Arc::new(GroundShader::default()),
            callbacks: Arc::new(NoCallbacks),
            cancel: CancelToken::new(),
            jitter: JitterCache::new(),
            result: None,
            stats: None,
        }
    }

    /// Validate `config` against a `width` x `height` image and freeze it for the
    /// next renders.
    ///
    /// The display rectangle is `display` when given, otherwise the configured
    /// border, otherwise the whole image. Errors go to the error callback before
    /// being returned, and leave the renderer uninitialized.
    pub fn init_render_state(
        &mut self,
        config: RenderConfig,
        width: u32,
        height: u32,
        display: Option<PixelRect>,
    ) -> TileRenderResult<()> {
        self.result = None;
        self.stats = None;
        match build_state(config, width, height, display) {
            Ok(state) => {
                tracing::debug!(
                    width,
                    height,
                    display = ?state.display,
                    parts_x = state.config.parts_x,
                    parts_y = state.config.parts_y,
                    "render state initialized"
                );
                self.state = Some(state);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "render state rejected");
                self.callbacks.report_error(&e);
                self.state = None;
                Err(e)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn config(&self) -> Option<&RenderConfig> {
        self.state.as_ref().map(|s| s.config.as_ref())
    }

    /// Display rectangle in image coordinates.
    pub fn display_rect(&self) -> Option<PixelRect> {
        self.state.as_ref().map(|s| s.display)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Replace the camera-to-world transform; it must be invertible.
    pub fn set_camera_transform(&mut self, to_world: Mat4) -> TileRenderResult<()> {
        self.camera.set_transform(to_world)
    }

    pub fn set_lights(&mut self, lights: Vec<SpotLight>) -> TileRenderResult<()> {
        for light in &lights {
            light.validate()?;
        }
        self.lights = lights;
        Ok(())
    }

    pub fn lights(&self) -> &[SpotLight] {
        &self.lights
    }

    pub fn set_rasterizer(&mut self, rasterizer: Arc<dyn DepthRasterizer>) {
        self.rasterizer = rasterizer;
    }

    pub fn set_shader(&mut self, shader: Arc<dyn TileShader>) {
        self.shader = shader;
    }

    /// Use `occluders` both for shadow buffers and for the ground shader.
    pub fn set_occluders(&mut self, occluders: Arc<TriangleSoup>) {
        self.shader = Arc::new(GroundShader::new(occluders.clone()));
        self.rasterizer = occluders;
    }

    pub fn set_callbacks(&mut self, callbacks: Arc<dyn RenderCallbacks>) {
        self.callbacks = callbacks;
    }

    /// Poll `test_break` for cancellation from now on. Handles from
    /// [`Renderer::cancel_token`] stay connected.
    pub fn set_test_break(&mut self, test_break: impl Fn() -> bool + Send + Sync + 'static) {
        self.cancel.set_test_break(test_break);
    }

    /// Handle for cancelling a running render from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Tile allocation counters of the current render state.
    pub fn pool_stats(&self) -> Option<TilePoolStats> {
        self.state.as_ref().map(|s| s.allocator.stats())
    }

    /// Build every light's shadow buffer at `time` without rendering.
    pub fn build_shadow_buffers(&self, time: f32) -> TileRenderResult<Vec<ShadowedLight>> {
        let percentage = self.config().map_or(100, |c| c.percentage);
        pipeline::build_lights(&self.lights, percentage, self.rasterizer.as_ref(), time, &self.jitter)
    }

    /// Render the current frame into a fresh result.
    ///
    /// Cancellation is not an error: the render stops early, keeps what was
    /// merged and reports `cancelled` in the returned stats.
    #[tracing::instrument(skip(self))]
    pub fn run_tiled_render(&mut self) -> TileRenderResult<RenderStats> {
        let Some(state) = self.state.as_ref() else {
            let e = TileRenderError::config("render state is not initialized");
            self.callbacks.report_error(&e);
            return Err(e);
        };

        tracing::info!(
            width = state.image.width,
            height = state.image.height,
            lights = self.lights.len(),
            threads = state.config.threads,
            "render start"
        );
        let inputs = FrameInputs {
            config: &state.config,
            image: state.image,
            display: state.display,
            layout: &state.layout,
            allocator: &state.allocator,
            camera: &self.camera,
            lights: &self.lights,
            rasterizer: self.rasterizer.as_ref(),
            shader: self.shader.as_ref(),
            jitter: &self.jitter,
            cancel: &self.cancel,
            callbacks: self.callbacks.as_ref(),
        };

        match pipeline::render_frame(&inputs) {
            Ok((result, stats)) => {
                tracing::info!(
                    parts_total = stats.parts_total,
                    parts_merged = stats.parts_merged,
                    parts_dropped = stats.parts_dropped,
                    parts_invalid = stats.parts_invalid,
                    polls = stats.polls,
                    cancelled = stats.cancelled,
                    "render finished"
                );
                self.result = Some(result);
                self.stats = Some(stats);
                Ok(stats)
            }
            Err(e) => {
                tracing::error!(error = %e, "render failed");
                self.callbacks.report_error(&e);
                self.result = None;
                self.stats = None;
                Err(e)
            }
        }
    }

    /// Final result of the last successful render.
    pub fn result(&self) -> Option<&RenderResult> {
        self.result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<RenderResult> {
        self.result.take()
    }

    pub fn stats(&self) -> Option<RenderStats> {
        self.stats
    }
}

fn build_state(
    config: RenderConfig,
    width: u32,
    height: u32,
    display: Option<PixelRect>,
) -> TileRenderResult<RenderState> {
    let config = config.validated()?;
    let image = Canvas::new(width, height)?;
    let display = match (display, config.border) {
        (Some(rect), _) => rect,
        (None, Some(border)) => PixelRect::from_normalized(border, width, height)?,
        (None, None) => image.rect(),
    };
    if display.width() < 1 || display.height() < 1 {
        return Err(TileRenderError::config("image too small"));
    }
    if !image.rect().contains_rect(display) {
        return Err(TileRenderError::config(
            "display rectangle exceeds the image",
        ));
    }
    if config.tiling == TilingMode::Panorama && display.width() != width as i32 {
        return Err(TileRenderError::config(
            "panorama rendering needs a border spanning the full image width",
        ));
    }
    if config.fields.is_some() && display.height() < 2 {
        return Err(TileRenderError::config(
            "field rendering needs at least two display rows",
        ));
    }

    // Every sub-frame must have something to render before anything is allocated.
    for rows in pipeline::subframe_rows(&config, display) {
        pipeline::plan_parts(&config, image, display, rows, 0.0)?;
    }

    let layout = Arc::new(ResultLayout::new(&config.layers));
    Ok(RenderState {
        allocator: TileAllocator::new(TilePoolOpts::default(), layout.clone()),
        config: Arc::new(config),
        image,
        display,
        layout,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
