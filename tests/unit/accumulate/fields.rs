use super::*;
use crate::result::model::{PassKind, LayerConfig, ResultLayout};

fn rows(height: u32, base: f32) -> RenderResult {
    let layout = ResultLayout::new(&[LayerConfig::new("main", &[PassKind::Depth])]);
    let mut rr = RenderResult::new(&layout, PixelRect::new(0, 0, 2, height as i32), 0).unwrap();
    for (y, row) in rr.layers[0].combined.chunks_exact_mut(8).enumerate() {
        row.fill(base + y as f32);
    }
    for (y, row) in rr.layers[0].passes[0].data.chunks_exact_mut(2).enumerate() {
        row.fill(base + y as f32);
    }
    rr
}

fn column(rr: &RenderResult) -> Vec<f32> {
    (0..rr.height).map(|y| rr.combined_pixel(1, y).unwrap()[0]).collect()
}

#[test]
fn fields_alternate_rows() {
    let out = interleave_fields(&rows(2, 10.0), &rows(2, 20.0), false).unwrap();
    assert_eq!(out.height, 4);
    assert_eq!(out.tile_rect, PixelRect::new(0, 0, 2, 4));
    assert_eq!(column(&out), vec![10.0, 20.0, 11.0, 21.0]);
    assert_eq!(out.layers[0].passes[0].data, vec![10.0, 10.0, 20.0, 20.0, 11.0, 11.0, 21.0, 21.0]);
}

#[test]
fn odd_first_puts_first_field_on_odd_rows() {
    let out = interleave_fields(&rows(2, 10.0), &rows(2, 20.0), true).unwrap();
    assert_eq!(column(&out), vec![20.0, 10.0, 21.0, 11.0]);
}

#[test]
fn odd_heights_give_even_field_the_extra_row() {
    assert_eq!(field_height(5, 0), 3);
    assert_eq!(field_height(5, 1), 2);
    let out = interleave_fields(&rows(3, 0.0), &rows(2, 100.0), false).unwrap();
    assert_eq!(column(&out), vec![0.0, 100.0, 1.0, 101.0, 2.0]);
    assert!(interleave_fields(&rows(2, 0.0), &rows(3, 100.0), false).is_err());
}

#[test]
fn mismatched_fields_are_rejected() {
    let layout = ResultLayout::new(&[]);
    let narrow = RenderResult::new(&layout, PixelRect::new(0, 0, 1, 2), 0).unwrap();
    assert!(interleave_fields(&rows(2, 0.0), &narrow, false).is_err());
}
