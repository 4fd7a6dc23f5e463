use super::*;
use std::sync::Mutex;

use glam::{Vec2, Vec3};

use crate::foundation::core::Rect;
use crate::render::scene::CameraParams;
use crate::shadow::ShadowSettings;

#[derive(Default)]
struct ErrorLog(Mutex<Vec<String>>);

impl RenderCallbacks for ErrorLog {
    fn report_error(&self, err: &TileRenderError) {
        self.0.lock().unwrap().push(err.to_string());
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

fn renderer_with_log() -> (Renderer, Arc<ErrorLog>) {
    let log = Arc::new(ErrorLog::default());
    let mut r = Renderer::new();
    r.set_callbacks(log.clone());
    (r, log)
}

#[test]
fn zero_area_border_is_reported_and_rejected() {
    let (mut r, log) = renderer_with_log();
    let config = RenderConfig {
        border: Some(Rect::new(0.5, 0.2, 0.5, 0.8)),
        ..small_config()
    };
    let err = r.init_render_state(config, 64, 64, None).unwrap_err();
    assert!(err.is_config());
    assert!(!r.is_initialized());
    assert_eq!(log.0.lock().unwrap().len(), 1);
}

#[test]
fn tiny_border_is_too_small() {
    let (mut r, _) = renderer_with_log();
    // 0.1 of 4 pixels truncates to an empty rectangle.
    let config = RenderConfig {
        border: Some(Rect::new(0.0, 0.0, 0.1, 1.0)),
        ..small_config()
    };
    assert!(r.init_render_state(config, 4, 4, None).unwrap_err().is_config());
}

#[test]
fn border_maps_to_display_rect() {
    let mut r = Renderer::new();
    let config = RenderConfig {
        border: Some(Rect::new(0.25, 0.5, 0.75, 1.0)),
        ..small_config()
    };
    r.init_render_state(config, 8, 4, None).unwrap();
    assert_eq!(r.display_rect(), Some(PixelRect::new(2, 2, 6, 4)));
}

#[test]
fn explicit_display_must_fit_the_image() {
    let (mut r, log) = renderer_with_log();
    let err = r
        .init_render_state(small_config(), 8, 8, Some(PixelRect::new(4, 4, 12, 8)))
        .unwrap_err();
    assert!(err.is_config());
    assert_eq!(log.0.lock().unwrap().len(), 1);
}

#[test]
fn panorama_needs_full_width_border() {
    let mut r = Renderer::new();
    let config = RenderConfig {
        tiling: TilingMode::Panorama,
        border: Some(Rect::new(0.0, 0.0, 0.5, 1.0)),
        ..small_config()
    };
    assert!(r.init_render_state(config, 64, 64, None).unwrap_err().is_config());
}

#[test]
fn fields_need_two_rows() {
    let mut r = Renderer::new();
    let config = RenderConfig {
        fields: Some(Default::default()),
        ..small_config()
    };
    assert!(r.init_render_state(config, 8, 1, None).unwrap_err().is_config());
}

#[test]
fn crop_swallowing_every_part_fails_at_init() {
    let (mut r, log) = renderer_with_log();
    let config = RenderConfig {
        parts_x: 1,
        parts_y: 1,
        tile_crop: 1,
        ..small_config()
    };
    assert!(r.init_render_state(config, 1, 1, None).unwrap_err().is_config());
    assert!(!r.is_initialized());
    assert!(r.pool_stats().is_none());
    assert_eq!(log.0.lock().unwrap().len(), 1);
}

#[test]
fn crop_is_checked_against_field_height() {
    let config = RenderConfig {
        parts_x: 1,
        parts_y: 1,
        tile_crop: 1,
        ..small_config()
    };
    // Four rows leave a valid part; each two-row field does not.
    let mut r = Renderer::new();
    r.init_render_state(config.clone(), 8, 4, None).unwrap();

    let fields = RenderConfig {
        fields: Some(Default::default()),
        ..config
    };
    assert!(r.init_render_state(fields, 8, 4, None).unwrap_err().is_config());
    assert!(!r.is_initialized());
}

#[test]
fn oversized_part_settings_fail_at_init() {
    let mut r = Renderer::new();
    for config in [
        RenderConfig {
            min_part_span: i32::MAX as u32,
            ..small_config()
        },
        RenderConfig {
            tile_crop: 1 << 31,
            ..small_config()
        },
    ] {
        assert!(r.init_render_state(config, 100, 100, None).unwrap_err().is_config());
        assert!(!r.is_initialized());
    }
}

#[test]
fn render_requires_initialization() {
    let (mut r, log) = renderer_with_log();
    assert!(r.run_tiled_render().unwrap_err().is_config());
    assert!(r.result().is_none());
    assert_eq!(log.0.lock().unwrap().len(), 1);
}

#[test]
fn camera_transform_must_be_invertible() {
    let mut r = Renderer::new();
    assert!(r.set_camera_transform(Mat4::ZERO).is_err());
    let m = Mat4::from_translation(Vec3::new(0.0, 1.0, 5.0));
    r.set_camera_transform(m).unwrap();
    assert_eq!(r.camera().eye(), Vec3::new(0.0, 1.0, 5.0));
}

#[test]
fn shadowed_ground_render_completes() {
    let mut r = Renderer::new();
    r.init_render_state(small_config(), 24, 16, None).unwrap();
    r.set_camera(
        Camera::look_at(Vec3::new(0.0, 12.0, 0.01), Vec3::ZERO, CameraParams::default()).unwrap(),
    );
    r.set_lights(vec![SpotLight {
        spot_angle: 1.6,
        shadow: ShadowSettings {
            buffer_size: 512,
            ..ShadowSettings::default()
        },
        ..SpotLight::default()
    }])
    .unwrap();
    let mut soup = TriangleSoup::default();
    soup.push_quad_xz(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0), 5.0);
    r.set_occluders(Arc::new(soup));

    let stats = r.run_tiled_render().unwrap();
    assert_eq!(stats.parts_merged, 4);
    assert!(!stats.cancelled);
    assert_eq!(r.stats(), Some(stats));
    assert_eq!(r.pool_stats().unwrap().live_results, 0);

    let rr = r.take_result().unwrap();
    assert_eq!((rr.width, rr.height), (24, 16));
    // Every pixel sees the ground or the quad, so alpha is set everywhere.
    assert!(rr.primary_layer().combined.chunks_exact(4).all(|px| px[3] == 1.0));
    assert!(r.result().is_none());
}

#[test]
fn cancelled_render_keeps_partial_result() {
    let mut r = Renderer::new();
    r.init_render_state(small_config(), 16, 16, None).unwrap();
    r.set_test_break(|| true);
    let stats = r.run_tiled_render().unwrap();
    assert!(stats.cancelled);
    assert_eq!(stats.parts_merged, 0);
    assert_eq!(stats.parts_dropped, 4);
    let rr = r.result().unwrap();
    assert!(rr.primary_layer().combined.iter().all(|&v| v == 0.0));
}

#[test]
fn cancel_handle_survives_test_break() {
    let mut r = Renderer::new();
    r.init_render_state(small_config(), 16, 16, None).unwrap();
    let handle = r.cancel_token();
    r.set_test_break(|| false);
    handle.cancel();

    let stats = r.run_tiled_render().unwrap();
    assert!(stats.cancelled);
    assert_eq!(stats.parts_merged, 0);
}

#[test]
fn shadow_buffers_follow_percentage() {
    let mut r = Renderer::new();
    let config = RenderConfig {
        percentage: 50,
        ..small_config()
    };
    r.init_render_state(config, 8, 8, None).unwrap();
    r.set_lights(vec![SpotLight {
        shadow: ShadowSettings {
            buffer_size: 2048,
            ..ShadowSettings::default()
        },
        ..SpotLight::default()
    }])
    .unwrap();
    let built = r.build_shadow_buffers(0.0).unwrap();
    let buffer = built[0].buffer.as_ref().unwrap();
    assert_eq!(buffer.size(), 1024);
    assert_eq!(buffer.stats().tiles_by_kind[0], 64 * 64);
}
