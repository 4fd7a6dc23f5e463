use super::*;

#[test]
fn pass_channel_counts_follow_kind() {
    assert_eq!(PassKind::Depth.channels(), 1);
    for k in [
        PassKind::Normal,
        PassKind::Diffuse,
        PassKind::Specular,
        PassKind::Shadow,
        PassKind::AmbientOcclusion,
        PassKind::Reflection,
    ] {
        assert_eq!(k.channels(), 3, "{k:?}");
    }
    assert_eq!(PassKind::Vector.channels(), 4);
    assert_eq!(PassKind::Color.channels(), 4);
}

#[test]
fn empty_layer_config_synthesizes_default_layer() {
    let layout = ResultLayout::new(&[]);
    assert_eq!(layout.layers().len(), 1);
    assert_eq!(layout.layers()[0].name, DEFAULT_LAYER_NAME);

    let rr = RenderResult::new(&layout, PixelRect::from_size(3, 2), 0).unwrap();
    assert_eq!(rr.layers.len(), 1);
    assert_eq!(rr.primary_layer().combined.len(), 3 * 2 * 4);
    assert!(rr.primary_layer().passes.is_empty());
}

#[test]
fn passes_are_allocated_in_canonical_order() {
    let layout = ResultLayout::new(&[LayerConfig::new(
        "main",
        &[PassKind::Shadow, PassKind::Depth, PassKind::Vector, PassKind::Depth],
    )]);
    let rr = RenderResult::new(&layout, PixelRect::new(-1, -1, 3, 1), 1).unwrap();
    let kinds: Vec<_> = rr.layers[0].passes.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![PassKind::Depth, PassKind::Vector, PassKind::Shadow]);
    assert_eq!(rr.width, 4);
    assert_eq!(rr.height, 2);
    assert_eq!(rr.layers[0].pass(PassKind::Shadow).unwrap().data.len(), 4 * 2 * 3);
    assert_eq!(layout.floats_per_pixel(), 4 + 1 + 4 + 3);
    assert_eq!(rr.byte_len(), 8 * layout.floats_per_pixel() * 4);
}

#[test]
fn empty_rect_is_rejected() {
    let layout = ResultLayout::new(&[]);
    assert!(RenderResult::new(&layout, PixelRect::new(0, 0, 0, 4), 0).is_err());
}

#[test]
fn reset_zeroes_and_rehomes() {
    let layout = ResultLayout::new(&[LayerConfig::new("a", &[PassKind::Depth])]);
    let mut rr = RenderResult::new(&layout, PixelRect::from_size(2, 2), 0).unwrap();
    rr.layers[0].combined.fill(1.0);
    rr.layers[0].pass_mut(PassKind::Depth).unwrap().data.fill(7.0);
    rr.reset(PixelRect::new(4, 4, 6, 6), 1);
    assert_eq!(rr.tile_rect, PixelRect::new(4, 4, 6, 6));
    assert_eq!(rr.crop, 1);
    assert!(rr.layers[0].combined.iter().all(|v| *v == 0.0));
    assert!(rr.layers[0].pass(PassKind::Depth).unwrap().data.iter().all(|v| *v == 0.0));
}

#[test]
fn combined_pixel_reads_primary_layer() {
    let layout = ResultLayout::new(&[]);
    let mut rr = RenderResult::new(&layout, PixelRect::from_size(2, 2), 0).unwrap();
    let i = (2 + 1) * 4;
    rr.layers[0].combined[i..i + 4].copy_from_slice(&[0.1, 0.2, 0.3, 1.0]);
    assert_eq!(rr.combined_pixel(1, 1), Some([0.1, 0.2, 0.3, 1.0]));
    assert_eq!(rr.combined_pixel(2, 0), None);
}

#[test]
fn pass_flags_iterate_enabled_kinds() {
    let f = PassFlags::from_kinds(&[PassKind::Reflection, PassKind::Normal]);
    assert!(f.contains(PassKind::Normal));
    assert!(!f.contains(PassKind::Depth));
    assert_eq!(f.iter().collect::<Vec<_>>(), vec![PassKind::Normal, PassKind::Reflection]);
    assert!(PassFlags::default().is_empty());
}
