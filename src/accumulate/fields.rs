use crate::foundation::core::PixelRect;
use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::result::model::RenderResult;

/// Rows of a `height`-row image belonging to field `parity` (0 even, 1 odd).
pub fn field_height(height: u32, parity: u32) -> u32 {
    if parity == 0 {
        height.div_ceil(2)
    } else {
        height / 2
    }
}

/// Interleave two half-height field renders row by row.
///
/// `first` is the field rendered first. It lands on the even rows, or on the odd
/// rows when `odd_first` is set. Both results must share layout and width.
pub fn interleave_fields(
    first: &RenderResult,
    second: &RenderResult,
    odd_first: bool,
) -> TileRenderResult<RenderResult> {
    let (even, odd) = if odd_first {
        (second, first)
    } else {
        (first, second)
    };
    if !even.same_structure(odd) || even.width != odd.width {
        return Err(TileRenderError::evaluation(
            "field renders do not share one layout",
        ));
    }
    let height = even.height + odd.height;
    if even.height != field_height(height, 0) || odd.height != field_height(height, 1) {
        return Err(TileRenderError::evaluation(
            "field heights do not interleave into one image",
        ));
    }

    let width = even.width;
    let rect = PixelRect::new(
        even.tile_rect.xmin,
        even.tile_rect.ymin,
        even.tile_rect.xmin + width as i32,
        even.tile_rect.ymin + height as i32,
    );
    let mut out = even.clone();
    out.height = height;
    out.tile_rect = rect;

    for (layer, (le, lo)) in out.layers.iter_mut().zip(even.layers.iter().zip(&odd.layers)) {
        for (((channels, dst), (_, se)), (_, so)) in
            layer.buffers_mut().zip(le.buffers()).zip(lo.buffers())
        {
            let row = width as usize * channels;
            dst.clear();
            dst.resize(row * height as usize, 0.0);
            for (y, out_row) in dst.chunks_exact_mut(row).enumerate() {
                let (src, r) = if y % 2 == 0 { (se, y / 2) } else { (so, y / 2) };
                out_row.copy_from_slice(&src[r * row..(r + 1) * row]);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/accumulate/fields.rs"]
mod tests;
