use crate::foundation::core::PixelRect;
use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::result::model::RenderResult;

/// Copy one tile channel buffer into a destination buffer, stripping `crop` pixels from
/// every tile edge.
///
/// `tile_rect` is the tile's placement (crop included) in destination pixel coordinates.
/// Only pixels inside `tile_rect` shrunk by `crop` and inside the destination are written.
/// Returns the destination region actually written, if any.
#[allow(clippy::too_many_arguments)]
pub fn merge_channel_buffer(
    dst: &mut [f32],
    dst_width: u32,
    dst_height: u32,
    src: &[f32],
    tile_rect: PixelRect,
    crop: u32,
    channels: usize,
) -> TileRenderResult<Option<PixelRect>> {
    let src_w = tile_rect.width().max(0) as usize;
    let src_h = tile_rect.height().max(0) as usize;
    if src.len() != src_w * src_h * channels {
        return Err(TileRenderError::evaluation(
            "tile buffer does not match its rectangle",
        ));
    }
    if dst.len() != (dst_width as usize) * (dst_height as usize) * channels {
        return Err(TileRenderError::evaluation(
            "destination buffer does not match its dimensions",
        ));
    }

    let target = tile_rect.shrink(crop as i32);
    let Some(region) = target.intersect(PixelRect::from_size(dst_width, dst_height)) else {
        return Ok(None);
    };

    let row_len = (region.width() as usize) * channels;
    let dst_stride = (dst_width as usize) * channels;
    let src_stride = src_w * channels;
    let src_x = (region.xmin - tile_rect.xmin) as usize;
    let src_y = (region.ymin - tile_rect.ymin) as usize;

    for row in 0..region.height() as usize {
        let s = (src_y + row) * src_stride + src_x * channels;
        let d = (region.ymin as usize + row) * dst_stride + (region.xmin as usize) * channels;
        dst[d..d + row_len].copy_from_slice(&src[s..s + row_len]);
    }
    Ok(Some(region))
}

/// Merge every layer and pass of `tile` into `full`.
///
/// Layers and passes are matched positionally; both results must come from the same layout.
pub fn merge_result(full: &mut RenderResult, tile: &RenderResult) -> TileRenderResult<Option<PixelRect>> {
    if !full.same_structure(tile) {
        return Err(TileRenderError::evaluation(
            "tile result layers do not match the full result",
        ));
    }
    let (width, height) = (full.width, full.height);
    let mut written = None;
    for (dst_layer, src_layer) in full.layers.iter_mut().zip(&tile.layers) {
        for ((channels, dst), (_, src)) in dst_layer.buffers_mut().zip(src_layer.buffers()) {
            written = merge_channel_buffer(
                dst,
                width,
                height,
                src,
                tile.tile_rect,
                tile.crop,
                channels,
            )?;
        }
    }
    Ok(written)
}

#[cfg(test)]
#[path = "../../tests/unit/result/merge.rs"]
mod tests;
