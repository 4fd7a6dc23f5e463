use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use glam::Vec3;

use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::raster::soup::{Triangle, TriangleSoup};
use crate::render::config::RenderConfig;
use crate::render::renderer::Renderer;
use crate::render::scene::{Camera, CameraParams};
use crate::shade::ground::GroundShader;
use crate::shadow::SpotLight;

/// Camera placement in a scene document.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraDesc {
    pub eye: Vec3,
    pub target: Vec3,
    #[serde(flatten)]
    pub params: CameraParams,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 4.0, 10.0),
            target: Vec3::ZERO,
            params: CameraParams::default(),
        }
    }
}

/// Ground plane of the demo shader.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GroundDesc {
    pub height: f32,
    pub color: Vec3,
    pub object_color: Vec3,
    pub ambient: f32,
}

impl Default for GroundDesc {
    fn default() -> Self {
        let shader = GroundShader::default();
        Self {
            height: shader.ground_height,
            color: shader.ground_color,
            object_color: shader.object_color,
            ambient: shader.ambient,
        }
    }
}

/// JSON scene document read by the command-line driver.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SceneDesc {
    pub width: u32,
    pub height: u32,
    pub config: RenderConfig,
    pub camera: CameraDesc,
    pub lights: Vec<SpotLight>,
    pub triangles: Vec<Triangle>,
    pub ground: GroundDesc,
}

impl Default for SceneDesc {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            config: RenderConfig::default(),
            camera: CameraDesc::default(),
            lights: vec![SpotLight::default()],
            triangles: Vec::new(),
            ground: GroundDesc::default(),
        }
    }
}

impl SceneDesc {
    pub fn from_json_str(s: &str) -> TileRenderResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_reader<R: Read>(r: R) -> TileRenderResult<Self> {
        Ok(serde_json::from_reader(r)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> TileRenderResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TileRenderError::config(format!("open scene JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn occluders(&self) -> TriangleSoup {
        TriangleSoup::new(self.triangles.clone())
    }

    /// A renderer initialized for this scene with the ground shader.
    pub fn build_renderer(&self) -> TileRenderResult<Renderer> {
        let mut renderer = Renderer::new();
        renderer.init_render_state(self.config.clone(), self.width, self.height, None)?;
        renderer.set_camera(Camera::look_at(
            self.camera.eye,
            self.camera.target,
            self.camera.params,
        )?);
        renderer.set_lights(self.lights.clone())?;

        let occluders = Arc::new(self.occluders());
        renderer.set_shader(Arc::new(GroundShader {
            occluders: occluders.clone(),
            ground_height: self.ground.height,
            ground_color: self.ground.color,
            object_color: self.ground.object_color,
            ambient: self.ground.ambient,
        }));
        renderer.set_rasterizer(occluders);
        Ok(renderer)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/desc.rs"]
mod tests;
