use super::*;
use crate::render::scene::CameraParams;

fn ctx(field: Option<u32>) -> ShadeContext {
    let mut c = ShadeContext::new(
        Arc::new(RenderConfig::default()),
        Canvas::new(100, 40).unwrap(),
        PixelRect::new(10, 4, 90, 36),
        Camera::new(CameraParams::default()).unwrap(),
    );
    c.field = field;
    c
}

fn job(rect: PixelRect) -> TileJob {
    TileJob {
        part: 0,
        rect,
        crop: 0,
        display_order: 0,
        worker: 0,
        slice: None,
    }
}

#[test]
fn pixels_map_through_display_rect() {
    let c = ctx(None);
    let j = job(PixelRect::new(20, 8, 40, 16));
    assert_eq!(c.image_pixel(&j, 0, 0), (30, 12));
    assert_eq!(c.image_pixel(&j, 3, 2), (33, 14));
}

#[test]
fn field_rows_interleave() {
    let j = job(PixelRect::new(0, 0, 8, 8));
    assert_eq!(ctx(Some(0)).image_pixel(&j, 0, 3), (10, 10));
    assert_eq!(ctx(Some(1)).image_pixel(&j, 0, 3), (10, 11));
}

#[test]
fn crop_margin_maps_outside_the_cell() {
    let c = ctx(None);
    let j = job(PixelRect::new(-2, -2, 10, 10));
    assert_eq!(c.image_pixel(&j, 0, 0), (8, 2));
}

#[test]
fn panorama_slice_shifts_and_turns_the_ray() {
    let c = ctx(None);
    let mut j = job(PixelRect::new(0, 0, 10, 10));
    let (_, straight) = c.primary_ray(&j, 50.0, 20.0);
    assert!(straight.x.abs() < 1e-6);

    j.slice = Some(PanoramaSlice {
        index: 0,
        count: 2,
        pixel_shift: 25,
        rotation: 0.4,
    });
    // The slice center lands on the image center and looks left.
    let (_, turned) = c.primary_ray(&j, 25.0, 20.0);
    assert!((turned.x + 0.4f32.sin()).abs() < 1e-5);
}
