use std::sync::Arc;

use glam::{Mat4, Vec2};

use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::foundation::math::{DEPTH_SCALE, FAR_DEPTH, spot_window};
use crate::raster::DepthRasterizer;
use crate::shadow::jitter::JitterCache;
use crate::shadow::light::SpotLight;
use crate::shadow::tile::{ShadowTile, TILE_PIXELS, TILE_SIZE};

/// Compression summary of one shadow buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShadowStats {
    pub size: u32,
    /// Tile count per kind, indexed by kind.
    pub tiles_by_kind: [usize; 4],
    /// Heap bytes held by tile payloads.
    pub payload_bytes: usize,
}

impl ShadowStats {
    pub fn tiles(&self) -> usize {
        self.tiles_by_kind.iter().sum()
    }

    /// Bytes the uncompressed 32-bit buffer would take.
    pub fn raw_bytes(&self) -> usize {
        (self.size as usize) * (self.size as usize) * 4
    }
}

/// Compressed depth map of one light.
#[derive(Clone, Debug)]
pub struct ShadowBuffer {
    pub(crate) size: u32,
    pub(crate) tiles_per_side: u32,
    pub(crate) tiles: Vec<ShadowTile>,
    pub(crate) jitter: Arc<[Vec2]>,
    pub(crate) samples: u32,
    pub(crate) softness: f32,
    pub(crate) base_bias: f32,
    pub(crate) view: Mat4,
    pub(crate) window: Mat4,
    pub(crate) persp: Mat4,
}

impl ShadowBuffer {
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn base_bias(&self) -> f32 {
        self.base_bias
    }

    /// World to light view space.
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    /// Light view space to clip space.
    pub fn window(&self) -> &Mat4 {
        &self.window
    }

    /// World to light clip space.
    pub fn persp(&self) -> &Mat4 {
        &self.persp
    }

    pub fn tiles(&self) -> &[ShadowTile] {
        &self.tiles
    }

    pub fn jitter(&self) -> &Arc<[Vec2]> {
        &self.jitter
    }

    #[inline]
    pub(crate) fn tile_index(&self, x: u32, y: u32) -> usize {
        let ts = TILE_SIZE as u32;
        ((y / ts) * self.tiles_per_side + x / ts) as usize
    }

    /// Stored depth at buffer pixel `(x, y)`; coordinates must be inside the buffer.
    #[inline]
    pub fn depth_at(&self, x: u32, y: u32) -> i32 {
        let ts = TILE_SIZE as u32;
        let tile = &self.tiles[self.tile_index(x, y)];
        tile.depth_at(((y % ts) * ts + x % ts) as usize)
    }

    pub fn stats(&self) -> ShadowStats {
        let mut st = ShadowStats {
            size: self.size,
            ..ShadowStats::default()
        };
        for t in &self.tiles {
            st.tiles_by_kind[t.kind() as usize] += 1;
            st.payload_bytes += t.payload_bytes();
        }
        st
    }
}

/// Build the compressed shadow buffer of `light` with occluders at `time`.
///
/// Empty regions keep the far sentinel, so a light that sees no geometry ends up
/// with uniform tiles only and lights everything.
#[tracing::instrument(skip(light, rasterizer, jitter), fields(buffer_size = light.shadow.buffer_size))]
pub fn build_shadow_buffer(
    light: &SpotLight,
    percentage: u32,
    rasterizer: &dyn DepthRasterizer,
    time: f32,
    jitter: &JitterCache,
) -> TileRenderResult<ShadowBuffer> {
    light.validate()?;
    let settings = &light.shadow;
    let size = settings.effective_size(percentage);
    let samples = settings.effective_samples();

    let view = light.view();
    let window = match light.projection {
        Some(m) => m,
        None => spot_window(0.5 * light.spot_angle, settings.clip_start, settings.clip_end)?,
    };
    let persp = window * view;
    if !persp.is_finite() {
        return Err(TileRenderError::config("light projection is not finite"));
    }

    let mut depth = vec![FAR_DEPTH; (size as usize) * (size as usize)];
    rasterizer.rasterize_depth(&persp, time, size, &mut depth)?;

    let tiles_per_side = size / TILE_SIZE as u32;
    let mut tiles = Vec::with_capacity((tiles_per_side * tiles_per_side) as usize);
    let mut samples_buf = [0i32; TILE_PIXELS];
    let stride = size as usize;
    for ty in 0..tiles_per_side as usize {
        for tx in 0..tiles_per_side as usize {
            for row in 0..TILE_SIZE {
                let src = (ty * TILE_SIZE + row) * stride + tx * TILE_SIZE;
                samples_buf[row * TILE_SIZE..(row + 1) * TILE_SIZE]
                    .copy_from_slice(&depth[src..src + TILE_SIZE]);
            }
            tiles.push(ShadowTile::encode(&samples_buf));
        }
    }
    drop(depth);

    let pct = percentage.clamp(1, 100) as f32;
    let buf = ShadowBuffer {
        size,
        tiles_per_side,
        tiles,
        jitter: jitter.table(samples),
        samples,
        softness: settings.softness,
        base_bias: 0.02 * settings.bias * DEPTH_SCALE * (100.0 / pct),
        view,
        window,
        persp,
    };

    let st = buf.stats();
    tracing::debug!(
        size,
        samples,
        uniform = st.tiles_by_kind[0],
        byte_delta = st.tiles_by_kind[1],
        short_delta = st.tiles_by_kind[2],
        triple = st.tiles_by_kind[3],
        payload_bytes = st.payload_bytes,
        "compressed shadow buffer"
    );
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/shadow/buffer.rs"]
mod tests;
