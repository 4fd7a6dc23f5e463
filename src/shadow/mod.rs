//! Per-light compressed shadow buffers and their sampling.

pub mod buffer;
pub mod halo;
pub mod jitter;
pub mod light;
pub mod sampler;
pub mod tile;

pub use buffer::{ShadowBuffer, ShadowStats, build_shadow_buffer};
pub use halo::query_shadow_halo;
pub use jitter::JitterCache;
pub use light::{ShadowSettings, SpotLight};
pub use sampler::{ScreenDerivatives, query_shadow};
