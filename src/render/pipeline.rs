use std::sync::Arc;

use crate::accumulate::{BlurAccumulator, BlurOptions, field_height, interleave_fields};
use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::parts::partition::{
    PartSpec, PartitionRequest, TilingMode, panorama_pixel_rotation, partition,
};
use crate::raster::DepthRasterizer;
use crate::render::callbacks::RenderCallbacks;
use crate::render::config::RenderConfig;
use crate::render::scene::Camera;
use crate::result::merge::merge_result;
use crate::result::model::{RenderResult, ResultLayout};
use crate::result::pool::TileAllocator;
use crate::schedule::cancel::CancelToken;
use crate::schedule::scheduler::{RenderStats, SchedulerOpts, run_parts};
use crate::shade::{ShadeContext, ShadowedLight, TileShader};
use crate::shadow::{JitterCache, SpotLight, build_shadow_buffer};

/// Everything one frame render borrows from the renderer.
pub(crate) struct FrameInputs<'a> {
    pub config: &'a Arc<RenderConfig>,
    pub image: Canvas,
    pub display: PixelRect,
    pub layout: &'a Arc<ResultLayout>,
    pub allocator: &'a TileAllocator,
    pub camera: &'a Camera,
    pub lights: &'a [SpotLight],
    pub rasterizer: &'a dyn DepthRasterizer,
    pub shader: &'a dyn TileShader,
    pub jitter: &'a JitterCache,
    pub cancel: &'a CancelToken,
    pub callbacks: &'a dyn RenderCallbacks,
}

/// Build the shadow buffer of every shadow-casting light for the moment `time`.
pub(crate) fn build_lights(
    lights: &[SpotLight],
    percentage: u32,
    rasterizer: &dyn DepthRasterizer,
    time: f32,
    jitter: &JitterCache,
) -> TileRenderResult<Vec<ShadowedLight>> {
    lights
        .iter()
        .map(|light| {
            let buffer = if light.casts_shadows {
                Some(build_shadow_buffer(light, percentage, rasterizer, time, jitter)?)
            } else {
                None
            };
            Ok(ShadowedLight {
                light: light.clone(),
                buffer,
            })
        })
        .collect()
}

/// Display rows a render of `display` produces per sub-frame: one entry for a
/// progressive frame, one per field when interlacing.
pub(crate) fn subframe_rows(config: &RenderConfig, display: PixelRect) -> Vec<u32> {
    let height = display.height().max(0) as u32;
    match config.fields {
        None => vec![height],
        Some(_) => vec![field_height(height, 0), field_height(height, 1)],
    }
}

/// Parts covering `rows` rows of the display rectangle. Fails when the crop
/// margin leaves no part to render.
pub(crate) fn plan_parts(
    config: &RenderConfig,
    image: Canvas,
    display: PixelRect,
    rows: u32,
    pixel_rotation: f32,
) -> TileRenderResult<Vec<PartSpec>> {
    // Parts are laid out over the rows this render produces; a field render
    // covers every second display row.
    let specs = partition(&PartitionRequest {
        image: Canvas::new(image.width, rows)?,
        display: PixelRect::new(display.xmin, 0, display.xmax, rows as i32),
        columns: config.parts_x,
        rows: config.parts_y,
        crop: config.tile_crop,
        mode: config.tiling,
        min_span: config.min_part_span as i32,
        pixel_rotation,
    })?;
    if !specs.iter().any(|p| p.valid) {
        return Err(TileRenderError::config(
            "no valid parts: the crop margin swallows every part",
        ));
    }
    Ok(specs)
}

/// Render one frame: both fields when interlacing, every motion-blur sub-frame,
/// then re-insert a bordered render into the full image unless cropping to it.
pub(crate) fn render_frame(inp: &FrameInputs<'_>) -> TileRenderResult<(RenderResult, RenderStats)> {
    let mut stats = RenderStats::default();
    let result = match inp.config.fields {
        None => render_blurred(inp, None, 0.0, &mut stats)?,
        Some(fields) => {
            let height = inp.display.height() as u32;
            if height < 2 {
                return Err(TileRenderError::config(
                    "field rendering needs at least two display rows",
                ));
            }
            let (first_parity, second_parity) = if fields.odd_first { (1, 0) } else { (0, 1) };
            let first = render_blurred(inp, Some(first_parity), 0.0, &mut stats)?;
            let second = if inp.cancel.poll() {
                tracing::warn!("render cancelled after the first field");
                RenderResult::new(
                    inp.layout,
                    PixelRect::from_size(inp.display.width() as u32, field_height(height, second_parity)),
                    0,
                )?
            } else {
                render_blurred(
                    inp,
                    Some(second_parity),
                    fields.second_field_offset(),
                    &mut stats,
                )?
            };
            interleave_fields(&first, &second, fields.odd_first)?
        }
    };

    let bordered = inp.display != inp.image.rect();
    let result = if bordered && !inp.config.crop_to_border {
        uncrop(result, inp.image, inp.display, inp.layout)?
    } else {
        result
    };
    Ok((result, stats))
}

fn render_blurred(
    inp: &FrameInputs<'_>,
    field: Option<u32>,
    base_time: f32,
    stats: &mut RenderStats,
) -> TileRenderResult<RenderResult> {
    let Some(blur) = inp.config.motion_blur else {
        return render_subframe(inp, field, base_time, stats);
    };

    let mut acc = BlurAccumulator::new(BlurOptions {
        gamma: inp.config.gamma_correct,
        key_alpha: blur.key_alpha,
    });
    for i in 1..=blur.samples {
        let time = base_time + blur.time_offset(i);
        tracing::debug!(sample = i, samples = blur.samples, time, "rendering blur sub-frame");
        acc.add_sample(render_subframe(inp, field, time, stats)?)?;
        if inp.cancel.poll() {
            tracing::warn!(done = i, samples = blur.samples, "motion blur cut short by cancellation");
            break;
        }
    }
    acc.finish()
        .ok_or_else(|| TileRenderError::evaluation("motion blur produced no sub-frame"))
}

/// One scheduled render of the display rectangle (or one field of it) at `time`.
fn render_subframe(
    inp: &FrameInputs<'_>,
    field: Option<u32>,
    time: f32,
    stats: &mut RenderStats,
) -> TileRenderResult<RenderResult> {
    let cfg = inp.config;
    let width = inp.display.width() as u32;
    let rows = match field {
        Some(parity) => field_height(inp.display.height() as u32, parity),
        None => inp.display.height() as u32,
    };

    let pixel_rotation = match cfg.tiling {
        TilingMode::Grid => 0.0,
        TilingMode::Panorama => {
            let aspect = inp.image.width as f32 / inp.image.height as f32;
            panorama_pixel_rotation(
                inp.camera.viewplane_width(aspect),
                inp.camera.params.clip_start,
                inp.image.width,
                inp.display.width(),
                cfg.parts_x,
            )
        }
    };
    let specs = plan_parts(cfg, inp.image, inp.display, rows, pixel_rotation)?;

    let lights = build_lights(inp.lights, cfg.percentage, inp.rasterizer, time, inp.jitter)?;

    let mut full = RenderResult::new(inp.layout, PixelRect::from_size(width, rows), 0)?;
    inp.callbacks.display_init(&full);

    let ctx = ShadeContext {
        lights: Arc::from(lights),
        time,
        field,
        ..ShadeContext::new(cfg.clone(), inp.image, inp.display, *inp.camera)
    };
    let report = run_parts(
        specs,
        &mut full,
        inp.shader,
        &ctx,
        inp.allocator,
        inp.cancel,
        inp.callbacks,
        &SchedulerOpts {
            threads: cfg.threads,
            poll_interval: cfg.poll_interval(),
        },
    )?;
    stats.accumulate(&report.stats);
    Ok(full)
}

/// Place a border render into a zeroed result covering the whole image.
pub(crate) fn uncrop(
    mut bordered: RenderResult,
    image: Canvas,
    display: PixelRect,
    layout: &ResultLayout,
) -> TileRenderResult<RenderResult> {
    let mut full = RenderResult::new(layout, image.rect(), 0)?;
    bordered.tile_rect = display;
    bordered.crop = 0;
    merge_result(&mut full, &bordered)?;
    Ok(full)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
