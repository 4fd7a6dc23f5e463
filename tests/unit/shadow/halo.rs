use super::*;
use crate::raster::soup::TriangleSoup;
use crate::shadow::buffer::build_shadow_buffer;
use crate::shadow::jitter::JitterCache;
use crate::shadow::light::{ShadowSettings, SpotLight};
use glam::Vec2;

fn build(soup: &TriangleSoup) -> ShadowBuffer {
    let light = SpotLight {
        shadow: ShadowSettings {
            buffer_size: 512,
            ..ShadowSettings::default()
        },
        ..SpotLight::default()
    };
    build_shadow_buffer(&light, 100, soup, 0.0, &JitterCache::new()).unwrap()
}

fn occluded() -> TriangleSoup {
    let mut soup = TriangleSoup::default();
    soup.push_quad_xz(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0), 5.0);
    soup
}

#[test]
fn empty_buffer_is_fully_lit() {
    let buf = build(&TriangleSoup::default());
    let v = query_shadow_halo(&buf, Vec3::new(-2.0, 0.0, -6.0), Vec3::new(2.0, 1.0, -9.0));
    assert_eq!(v, 1.0);
}

#[test]
fn segment_behind_light_is_lit() {
    let buf = build(&occluded());
    assert_eq!(
        buf.halo_visibility(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.5, 0.0, 3.0)),
        1.0
    );
}

#[test]
fn segment_inside_shadow_is_dark() {
    let buf = build(&occluded());
    let v = buf.halo_visibility(Vec3::new(-0.5, 0.0, -8.0), Vec3::new(0.5, 0.0, -8.0));
    assert_eq!(v, 0.0);
}

#[test]
fn segment_across_shadow_is_partly_lit() {
    let buf = build(&occluded());
    let v = buf.halo_visibility(Vec3::new(-3.0, 0.0, -8.0), Vec3::new(3.0, 0.0, -8.0));
    assert!(v > 0.3 && v < 0.65, "lit fraction {v}");
}

#[test]
fn samples_past_far_clip_are_lit() {
    let buf = build(&occluded());
    let v = buf.halo_visibility(Vec3::new(-0.5, 0.0, -45.0), Vec3::new(0.5, 0.0, -45.0));
    assert_eq!(v, 1.0);
}
