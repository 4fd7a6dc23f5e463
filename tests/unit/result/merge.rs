use super::*;
use crate::result::model::{LayerConfig, PassKind, ResultLayout};

fn filled(len: usize, v: f32) -> Vec<f32> {
    vec![v; len]
}

#[test]
fn crop_is_stripped_and_outside_pixels_untouched() {
    // 6x6 destination, tile covers (0,0)-(4,4) with crop 1 -> writes (1,1)-(3,3).
    let mut dst = filled(6 * 6, -1.0);
    let tile_rect = PixelRect::new(0, 0, 4, 4);
    let src: Vec<f32> = (0..16).map(|i| i as f32).collect();

    let region = merge_channel_buffer(&mut dst, 6, 6, &src, tile_rect, 1, 1)
        .unwrap()
        .unwrap();
    assert_eq!(region, PixelRect::new(1, 1, 3, 3));

    for y in 0..6 {
        for x in 0..6 {
            let v = dst[y * 6 + x];
            if region.contains(x as i32, y as i32) {
                assert_eq!(v, (y * 4 + x) as f32);
            } else {
                assert_eq!(v, -1.0, "pixel ({x},{y}) modified");
            }
        }
    }
}

#[test]
fn destination_stride_uses_channel_count() {
    let mut dst = filled(4 * 2 * 3, 0.0);
    let src = filled(2 * 2 * 3, 5.0);
    let region = merge_channel_buffer(&mut dst, 4, 2, &src, PixelRect::new(2, 0, 4, 2), 0, 3)
        .unwrap()
        .unwrap();
    assert_eq!(region, PixelRect::new(2, 0, 4, 2));
    for y in 0..2 {
        for x in 0..4 {
            let expect = if x >= 2 { 5.0 } else { 0.0 };
            for c in 0..3 {
                assert_eq!(dst[(y * 4 + x) * 3 + c], expect);
            }
        }
    }
}

#[test]
fn tile_overhanging_the_edge_is_clipped() {
    let mut dst = filled(4 * 4, 0.0);
    let src = filled(4 * 4, 2.0);
    // Crop 1 tile at (-1,-1): stripped region (0,0)-(2,2).
    let region = merge_channel_buffer(&mut dst, 4, 4, &src, PixelRect::new(-1, -1, 3, 3), 1, 1)
        .unwrap()
        .unwrap();
    assert_eq!(region, PixelRect::new(0, 0, 2, 2));
    assert_eq!(dst.iter().filter(|v| **v == 2.0).count(), 4);
}

#[test]
fn fully_cropped_tile_writes_nothing() {
    let mut dst = filled(4, 0.0);
    let src = filled(4, 9.0);
    let region = merge_channel_buffer(&mut dst, 2, 2, &src, PixelRect::new(0, 0, 2, 2), 1, 1).unwrap();
    assert_eq!(region, None);
    assert!(dst.iter().all(|v| *v == 0.0));
}

#[test]
fn mismatched_buffers_are_errors() {
    let mut dst = filled(4, 0.0);
    assert!(merge_channel_buffer(&mut dst, 2, 2, &[1.0; 3], PixelRect::from_size(2, 2), 0, 1).is_err());
    assert!(merge_channel_buffer(&mut dst, 3, 2, &[1.0; 4], PixelRect::from_size(2, 2), 0, 1).is_err());
}

#[test]
fn merge_result_copies_every_layer_and_pass() {
    let layout = ResultLayout::new(&[
        LayerConfig::new("a", &[PassKind::Depth]),
        LayerConfig::new("b", &[PassKind::Normal]),
    ]);
    let mut full = RenderResult::new(&layout, PixelRect::from_size(4, 4), 0).unwrap();
    let mut tile = RenderResult::new(&layout, PixelRect::new(1, 1, 3, 3), 0).unwrap();
    for layer in &mut tile.layers {
        for (_, buf) in layer.buffers_mut() {
            buf.fill(3.0);
        }
    }

    let region = merge_result(&mut full, &tile).unwrap();
    assert_eq!(region, Some(PixelRect::new(1, 1, 3, 3)));
    for layer in &full.layers {
        for (channels, buf) in layer.buffers() {
            assert_eq!(buf.iter().filter(|v| **v == 3.0).count(), 4 * channels);
        }
    }
}

#[test]
fn merge_result_rejects_foreign_layout() {
    let a = ResultLayout::new(&[LayerConfig::new("a", &[])]);
    let b = ResultLayout::new(&[LayerConfig::new("b", &[])]);
    let mut full = RenderResult::new(&a, PixelRect::from_size(2, 2), 0).unwrap();
    let tile = RenderResult::new(&b, PixelRect::from_size(2, 2), 0).unwrap();
    assert!(merge_result(&mut full, &tile).is_err());
}
