//! Render driving: configuration, camera, callbacks and frame orchestration.

pub mod callbacks;
pub mod config;
pub mod desc;
pub(crate) mod pipeline;
pub mod renderer;
pub mod scene;

pub use callbacks::{DisplayUpdate, NoCallbacks, RenderCallbacks};
pub use config::{FieldConfig, MotionBlurConfig, RenderConfig};
pub use desc::SceneDesc;
pub use renderer::Renderer;
pub use scene::{Camera, CameraParams};
