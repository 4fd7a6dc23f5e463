//! Depth rasterization used to build shadow buffers.

pub mod soup;

use glam::Mat4;

use crate::foundation::error::TileRenderResult;

/// Occluder geometry that can be z-buffered from an arbitrary viewpoint.
pub trait DepthRasterizer: Send + Sync {
    /// Rasterize every occluder at `time` through `persp` (world to clip space) into
    /// a `size` x `size` row-major buffer of fixed-point depths.
    ///
    /// The buffer arrives filled with [`FAR_DEPTH`](crate::FAR_DEPTH);
    /// implementations keep the nearest depth per pixel and leave uncovered pixels alone.
    fn rasterize_depth(
        &self,
        persp: &Mat4,
        time: f32,
        size: u32,
        depth: &mut [i32],
    ) -> TileRenderResult<()>;
}

/// Nothing to rasterize.
impl DepthRasterizer for () {
    fn rasterize_depth(&self, _: &Mat4, _: f32, _: u32, _: &mut [i32]) -> TileRenderResult<()> {
        Ok(())
    }
}
