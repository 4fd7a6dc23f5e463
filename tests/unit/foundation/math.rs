use super::*;

#[test]
fn project_applies_translation() {
    let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(project(&m, Vec3::ZERO), Vec4::new(1.0, 2.0, 3.0, 1.0));
}

#[test]
fn fixed_depth_saturates_and_preserves_sign() {
    assert_eq!(ndc_depth_to_fixed(0.0), 0);
    assert!(ndc_depth_to_fixed(0.5) > 0);
    assert!(ndc_depth_to_fixed(-0.5) < 0);
    assert_eq!(ndc_depth_to_fixed(2.0), i32::MAX);
    assert_eq!(ndc_depth_to_fixed(-2.0), i32::MIN);
}

#[test]
fn ndc_maps_to_buffer_corners() {
    assert_eq!(ndc_to_buffer(Vec2::new(-1.0, -1.0), 512), Vec2::ZERO);
    assert_eq!(ndc_to_buffer(Vec2::new(1.0, 1.0), 512), Vec2::splat(512.0));
}

#[test]
fn spot_window_maps_clip_planes_to_unit_depth() {
    let w = spot_window(0.5, 1.0, 10.0).unwrap();
    let near = project(&w, Vec3::new(0.0, 0.0, -1.0));
    let far = project(&w, Vec3::new(0.0, 0.0, -10.0));
    assert!((near.z / near.w + 1.0).abs() < 1e-5);
    assert!((far.z / far.w - 1.0).abs() < 1e-5);
}

#[test]
fn spot_window_rejects_bad_parameters() {
    assert!(spot_window(0.0, 1.0, 2.0).is_err());
    assert!(spot_window(0.5, 2.0, 1.0).is_err());
    assert!(spot_window(0.5, 0.0, 2.0).is_err());
}

#[test]
fn gamma_round_trips_positive_values() {
    for v in [0.0f32, 0.25, 0.5, 1.0] {
        assert!((gamma_encode(gamma_decode(v)) - v).abs() < 1e-6);
    }
    assert_eq!(gamma_decode(-1.0), 0.0);
}
