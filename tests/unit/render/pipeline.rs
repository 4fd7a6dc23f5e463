use super::*;
use crate::render::callbacks::NoCallbacks;
use crate::render::config::{FieldConfig, MotionBlurConfig};
use crate::result::model::{COMBINED_CHANNELS, LayerConfig, PassKind};
use crate::result::pool::TilePoolOpts;
use crate::shade::{ShadeOutcome, TileJob};

/// Writes the image row and the sub-frame time of every pixel.
struct RowShader;

impl TileShader for RowShader {
    fn shade_tile(
        &self,
        ctx: &ShadeContext,
        job: &TileJob,
        out: &mut RenderResult,
        _cancel: &CancelToken,
    ) -> TileRenderResult<ShadeOutcome> {
        let w = out.width;
        for y in 0..out.height {
            for x in 0..w {
                let (_, row) = ctx.image_pixel(job, x, y);
                let i = (y * w + x) as usize * COMBINED_CHANNELS;
                let c = &mut out.layers[0].combined;
                c[i] = row as f32;
                c[i + 1] = ctx.time;
                c[i + 3] = 1.0;
            }
        }
        Ok(ShadeOutcome::Complete)
    }
}

fn small_config() -> RenderConfig {
    RenderConfig {
        parts_x: 2,
        parts_y: 2,
        min_part_span: 1,
        poll_interval_ms: 1,
        ..RenderConfig::default()
    }
}

fn render(config: RenderConfig, w: u32, h: u32, display: PixelRect) -> (RenderResult, RenderStats) {
    let config = Arc::new(config.validated().unwrap());
    let layout = Arc::new(ResultLayout::new(&config.layers));
    let allocator = TileAllocator::new(TilePoolOpts::default(), layout.clone());
    let camera = Camera::default();
    let jitter = JitterCache::new();
    let cancel = CancelToken::new();
    let inputs = FrameInputs {
        config: &config,
        image: Canvas::new(w, h).unwrap(),
        display,
        layout: &layout,
        allocator: &allocator,
        camera: &camera,
        lights: &[],
        rasterizer: &(),
        shader: &RowShader,
        jitter: &jitter,
        cancel: &cancel,
        callbacks: &NoCallbacks,
    };
    let out = render_frame(&inputs).unwrap();
    assert_eq!(allocator.stats().live_results, 0);
    out
}

#[test]
fn plain_frame_covers_every_row() {
    let (rr, stats) = render(small_config(), 6, 5, PixelRect::from_size(6, 5));
    assert_eq!((rr.width, rr.height), (6, 5));
    assert_eq!(stats.parts_merged, 4);
    for y in 0..5 {
        for x in 0..6 {
            assert_eq!(rr.combined_pixel(x, y).unwrap()[0], y as f32);
        }
    }
}

#[test]
fn fields_interleave_onto_their_display_rows() {
    for odd_first in [false, true] {
        let config = RenderConfig {
            fields: Some(FieldConfig {
                odd_first,
                still: false,
            }),
            ..small_config()
        };
        let (rr, stats) = render(config, 4, 5, PixelRect::from_size(4, 5));
        assert_eq!(rr.height, 5);
        assert_eq!(stats.parts_merged, 8);
        for y in 0..5 {
            let px = rr.combined_pixel(1, y).unwrap();
            assert_eq!(px[0], y as f32, "row {y}, odd_first {odd_first}");
            // The second field renders half a frame later.
            let second_parity = if odd_first { 0 } else { 1 };
            let expect_time = if y % 2 == second_parity { 0.5 } else { 0.0 };
            assert_eq!(px[1], expect_time);
        }
    }
}

#[test]
fn motion_blur_averages_subframe_times() {
    let config = RenderConfig {
        motion_blur: Some(MotionBlurConfig {
            samples: 4,
            shutter: 1.0,
            key_alpha: false,
        }),
        ..small_config()
    };
    let (rr, stats) = render(config, 4, 4, PixelRect::from_size(4, 4));
    assert_eq!(stats.parts_merged, 16);
    let px = rr.combined_pixel(2, 3).unwrap();
    assert!((px[1] - 0.625).abs() < 1e-6, "time average {}", px[1]);
    assert_eq!(px[0], 3.0);
    assert_eq!(px[3], 1.0);
}

#[test]
fn border_render_is_uncropped_unless_requested() {
    let display = PixelRect::new(1, 1, 4, 3);
    let (rr, _) = render(small_config(), 5, 4, display);
    assert_eq!((rr.width, rr.height), (5, 4));
    for y in 0..4u32 {
        for x in 0..5u32 {
            let px = rr.combined_pixel(x, y).unwrap();
            if display.contains(x as i32, y as i32) {
                assert_eq!(px, [y as f32, 0.0, 0.0, 1.0]);
            } else {
                assert_eq!(px, [0.0; 4]);
            }
        }
    }

    let config = RenderConfig {
        crop_to_border: true,
        ..small_config()
    };
    let (rr, _) = render(config, 5, 4, display);
    assert_eq!((rr.width, rr.height), (3, 2));
    assert_eq!(rr.combined_pixel(0, 0).unwrap()[0], 1.0);
}

#[test]
fn uncrop_keeps_passes_aligned() {
    let layout = ResultLayout::new(&[LayerConfig::new("main", &[PassKind::Depth])]);
    let mut bordered = RenderResult::new(&layout, PixelRect::from_size(2, 1), 0).unwrap();
    bordered.layers[0].pass_mut(PassKind::Depth).unwrap().data = vec![7.0, 8.0];

    let full = uncrop(bordered, Canvas::new(3, 2).unwrap(), PixelRect::new(1, 1, 3, 2), &layout)
        .unwrap();
    assert_eq!(full.tile_rect, PixelRect::from_size(3, 2));
    let depth = &full.layers[0].pass(PassKind::Depth).unwrap().data;
    assert_eq!(depth, &vec![0.0, 0.0, 0.0, 0.0, 7.0, 8.0]);
}

#[test]
fn lights_without_shadows_get_no_buffer() {
    let lights = vec![
        SpotLight::default(),
        SpotLight {
            casts_shadows: false,
            ..SpotLight::default()
        },
    ];
    let jitter = JitterCache::new();
    let built = build_lights(&lights, 50, &(), 0.0, &jitter).unwrap();
    assert_eq!(built.len(), 2);
    assert_eq!(built[0].buffer.as_ref().map(|b| b.size()), Some(512));
    assert!(built[1].buffer.is_none());
}

#[derive(Default)]
struct InitCounter(std::sync::atomic::AtomicUsize);

impl RenderCallbacks for InitCounter {
    fn display_init(&self, _result: &RenderResult) {
        self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CountingRasterizer(std::sync::atomic::AtomicUsize);

impl DepthRasterizer for CountingRasterizer {
    fn rasterize_depth(
        &self,
        _persp: &glam::Mat4,
        _time: f32,
        _size: u32,
        _depth: &mut [i32],
    ) -> TileRenderResult<()> {
        self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn swallowed_parts_fail_before_shadows_and_display() {
    use std::sync::atomic::Ordering;

    let config = Arc::new(
        RenderConfig {
            parts_x: 1,
            parts_y: 1,
            tile_crop: 1,
            ..small_config()
        }
        .validated()
        .unwrap(),
    );
    let layout = Arc::new(ResultLayout::new(&config.layers));
    let allocator = TileAllocator::new(TilePoolOpts::default(), layout.clone());
    let camera = Camera::default();
    let jitter = JitterCache::new();
    let cancel = CancelToken::new();
    let rasterizer = CountingRasterizer::default();
    let callbacks = InitCounter::default();
    let lights = [SpotLight::default()];
    let inputs = FrameInputs {
        config: &config,
        image: Canvas::new(1, 1).unwrap(),
        display: PixelRect::from_size(1, 1),
        layout: &layout,
        allocator: &allocator,
        camera: &camera,
        lights: &lights,
        rasterizer: &rasterizer,
        shader: &RowShader,
        jitter: &jitter,
        cancel: &cancel,
        callbacks: &callbacks,
    };

    assert!(render_frame(&inputs).unwrap_err().is_config());
    assert_eq!(rasterizer.0.load(Ordering::SeqCst), 0);
    assert_eq!(callbacks.0.load(Ordering::SeqCst), 0);
    assert_eq!(allocator.stats().alloc_results, 0);
}

#[test]
fn field_renders_plan_each_field_height() {
    let config = RenderConfig {
        fields: Some(FieldConfig::default()),
        ..small_config()
    };
    assert_eq!(subframe_rows(&config, PixelRect::from_size(4, 5)), vec![3, 2]);
    assert_eq!(subframe_rows(&small_config(), PixelRect::from_size(4, 5)), vec![5]);
}
