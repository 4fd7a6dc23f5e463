use glam::{Mat4, Vec3};

use crate::foundation::error::{TileRenderError, TileRenderResult};

/// Smallest shadow buffer side after percentage scaling.
pub const MIN_SHADOW_SIZE: u32 = 512;
/// Largest configurable shadow buffer side.
pub const MAX_SHADOW_SIZE: u32 = 10240;
/// Most soft-shadow samples per axis.
pub const MAX_SHADOW_SAMPLES: u32 = 16;

/// Shadow buffer parameters of one light.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Buffer side at 100%.
    pub buffer_size: u32,
    /// Soft-shadow samples per axis; 1 takes a single hard tap.
    pub samples: u32,
    /// Filter footprint in buffer pixels.
    pub softness: f32,
    /// Depth bias as a fraction of the depth range, before the 0.02 scale.
    pub bias: f32,
    pub clip_start: f32,
    pub clip_end: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            samples: 3,
            softness: 3.0,
            bias: 1.0,
            clip_start: 0.5,
            clip_end: 40.0,
        }
    }
}

impl ShadowSettings {
    pub fn validate(&self) -> TileRenderResult<()> {
        if !(MIN_SHADOW_SIZE..=MAX_SHADOW_SIZE).contains(&self.buffer_size) {
            return Err(TileRenderError::config(format!(
                "shadow buffer size must lie in {MIN_SHADOW_SIZE}..={MAX_SHADOW_SIZE}"
            )));
        }
        if !(self.softness.is_finite() && self.softness >= 0.0) {
            return Err(TileRenderError::config("shadow softness must be >= 0"));
        }
        if !(self.bias.is_finite() && self.bias >= 0.0) {
            return Err(TileRenderError::config("shadow bias must be >= 0"));
        }
        Ok(())
    }

    /// Sample count actually used: an explicit 1 stays a single tap, everything
    /// else is clamped to `2..=MAX_SHADOW_SAMPLES`.
    pub fn effective_samples(&self) -> u32 {
        if self.samples == 1 {
            1
        } else {
            self.samples.clamp(2, MAX_SHADOW_SAMPLES)
        }
    }

    /// Buffer side for a global render percentage.
    pub fn effective_size(&self, percentage: u32) -> u32 {
        let base = self.buffer_size.max(MIN_SHADOW_SIZE);
        let scaled = (u64::from(base) * u64::from(percentage.clamp(1, 100)) / 100) as u32;
        scaled.clamp(MIN_SHADOW_SIZE, base) & !15
    }
}

/// Shadow-casting spot light.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SpotLight {
    pub position: Vec3,
    /// Cone axis; need not be normalized.
    pub direction: Vec3,
    /// Full cone angle in radians.
    pub spot_angle: f32,
    pub color: Vec3,
    pub energy: f32,
    pub casts_shadows: bool,
    pub shadow: ShadowSettings,
    /// Replaces the cone-derived window when set.
    pub projection: Option<Mat4>,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, 0.0),
            direction: Vec3::NEG_Y,
            spot_angle: 1.0,
            color: Vec3::ONE,
            energy: 1.0,
            casts_shadows: true,
            shadow: ShadowSettings::default(),
            projection: None,
        }
    }
}

impl SpotLight {
    pub fn validate(&self) -> TileRenderResult<()> {
        if !self.position.is_finite() || self.direction.length_squared() <= f32::EPSILON {
            return Err(TileRenderError::config(
                "light needs a finite position and a non-zero direction",
            ));
        }
        if self.casts_shadows {
            self.shadow.validate()?;
        }
        Ok(())
    }

    /// World to light view space.
    pub fn view(&self) -> Mat4 {
        let dir = self.direction.normalize_or(Vec3::NEG_Z);
        let up = if dir.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
        Mat4::look_to_rh(self.position, dir, up)
    }

    /// Unit vector from `p` toward the light.
    pub fn to_light(&self, p: Vec3) -> Vec3 {
        (self.position - p).normalize_or_zero()
    }

    /// Whether `p` lies inside the spot cone.
    pub fn in_cone(&self, p: Vec3) -> bool {
        let axis = self.direction.normalize_or(Vec3::NEG_Z);
        (p - self.position).normalize_or_zero().dot(axis) >= (0.5 * self.spot_angle).cos()
    }
}
