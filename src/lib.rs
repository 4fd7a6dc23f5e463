//! tilerender is a tiled offline render core.
//!
//! It splits an image into parts, shades them on a small worker pool and merges
//! finished tiles into one layered result. Lights carry compressed shadow buffers
//! that the shading stage queries per pixel. Motion blur and interlaced fields are
//! accumulated from repeated sub-frame renders.
//!
//! - Configure and run a [`Renderer`]
//! - Plug in a [`TileShader`] and a [`DepthRasterizer`], or use the bundled
//!   [`GroundShader`] and [`TriangleSoup`]
//! - Read the final [`RenderResult`]
#![forbid(unsafe_code)]

mod foundation;

/// Sub-frame accumulation for motion blur and fields.
pub mod accumulate;
/// Image partitioning into parts.
pub mod parts;
/// Depth rasterization for shadow buffers.
pub mod raster;
/// Renderer state, configuration and orchestration.
pub mod render;
/// Layered render results, merging and tile allocation.
pub mod result;
/// Tile scheduling and cancellation.
pub mod schedule;
/// Shading-stage contract and the demo shader.
pub mod shade;
/// Compressed per-light shadow buffers.
pub mod shadow;

pub use crate::foundation::core::{Canvas, PixelRect, Rect};
pub use crate::foundation::error::{TileRenderError, TileRenderResult};
pub use crate::foundation::math::{FAR_DEPTH, project};

pub use crate::parts::partition::{PartSpec, PartitionRequest, TilingMode, partition};
pub use crate::raster::DepthRasterizer;
pub use crate::raster::soup::{Triangle, TriangleSoup};
pub use crate::render::{
    Camera, CameraParams, DisplayUpdate, FieldConfig, MotionBlurConfig, NoCallbacks,
    RenderCallbacks, RenderConfig, Renderer, SceneDesc,
};
pub use crate::result::model::{LayerConfig, PassKind, RenderLayer, RenderPass, RenderResult};
pub use crate::schedule::{CancelToken, RenderStats};
pub use crate::shade::ground::GroundShader;
pub use crate::shade::{ShadeContext, ShadeOutcome, TileJob, TileShader};
pub use crate::shadow::{
    ScreenDerivatives, ShadowBuffer, ShadowSettings, ShadowStats, SpotLight, build_shadow_buffer,
    query_shadow, query_shadow_halo,
};
