use glam::{Mat4, Vec3};

use crate::foundation::error::{TileRenderError, TileRenderResult};

/// Camera intrinsics.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub clip_start: f32,
    pub clip_end: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fov_y: 0.9,
            clip_start: 0.1,
            clip_end: 100.0,
        }
    }
}

impl CameraParams {
    pub fn validate(&self) -> TileRenderResult<()> {
        if !(self.fov_y.is_finite() && self.fov_y > 0.0 && self.fov_y < std::f32::consts::PI) {
            return Err(TileRenderError::config("camera fov must lie in (0, pi)"));
        }
        if !(self.clip_start.is_finite()
            && self.clip_end.is_finite()
            && self.clip_start > 0.0
            && self.clip_end > self.clip_start)
        {
            return Err(TileRenderError::config(
                "camera clip range must satisfy 0 < start < end",
            ));
        }
        Ok(())
    }
}

/// Render camera: intrinsics plus the camera-to-world transform.
///
/// Camera space looks down -Z with +Y up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub params: CameraParams,
    to_world: Mat4,
    view: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            params: CameraParams::default(),
            to_world: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    pub fn new(params: CameraParams) -> TileRenderResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            ..Self::default()
        })
    }

    pub fn look_at(eye: Vec3, target: Vec3, params: CameraParams) -> TileRenderResult<Self> {
        let dir = target - eye;
        if !eye.is_finite() || !dir.is_finite() || dir.length_squared() <= f32::EPSILON {
            return Err(TileRenderError::config("camera eye and target must differ"));
        }
        let dir = dir.normalize();
        let up = if dir.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
        let mut cam = Self::new(params)?;
        cam.set_transform(Mat4::look_to_rh(eye, dir, up).inverse())?;
        Ok(cam)
    }

    /// Replace the camera-to-world transform.
    pub fn set_transform(&mut self, to_world: Mat4) -> TileRenderResult<()> {
        let det = to_world.determinant();
        if !to_world.is_finite() || !det.is_finite() || det.abs() <= f32::EPSILON {
            return Err(TileRenderError::config("camera transform is not invertible"));
        }
        self.to_world = to_world;
        self.view = to_world.inverse();
        Ok(())
    }

    pub fn to_world(&self) -> &Mat4 {
        &self.to_world
    }

    /// World to camera space.
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    pub fn eye(&self) -> Vec3 {
        self.to_world.w_axis.truncate()
    }

    /// Camera window width at distance `clip_start` for an image of `aspect` (w / h).
    pub fn viewplane_width(&self, aspect: f32) -> f32 {
        2.0 * self.params.clip_start * (0.5 * self.params.fov_y).tan() * aspect
    }

    /// World-space ray through image point `(px, py)` (pixels, y down) of a
    /// `width` x `height` image, yawed by `rotation` radians about camera up.
    pub fn ray(&self, px: f32, py: f32, width: u32, height: u32, rotation: f32) -> (Vec3, Vec3) {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        let tan_half = (0.5 * self.params.fov_y).tan();
        let nx = 2.0 * px / w - 1.0;
        let ny = 1.0 - 2.0 * py / h;
        let dir_cam = Vec3::new(nx * tan_half * (w / h), ny * tan_half, -1.0);
        let dir_cam = if rotation != 0.0 {
            Mat4::from_rotation_y(rotation).transform_vector3(dir_cam)
        } else {
            dir_cam
        };
        let dir = self.to_world.transform_vector3(dir_cam).normalize_or(Vec3::NEG_Z);
        (self.eye(), dir)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
