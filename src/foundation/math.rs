use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::foundation::error::{TileRenderError, TileRenderResult};

/// Scale mapping normalized depth in `-1..=1` onto the signed 32-bit depth range.
pub const DEPTH_SCALE: f32 = i32::MAX as f32;

/// Depth written for pixels no geometry covers.
pub const FAR_DEPTH: i32 = 0x7FFF_FFFE;

/// Homogeneous projection of a world-space point through `m`.
#[inline]
pub fn project(m: &Mat4, p: Vec3) -> Vec4 {
    *m * p.extend(1.0)
}

/// Fixed-point depth of a normalized device z. Saturates outside `-1..=1`.
#[inline]
pub fn ndc_depth_to_fixed(z: f32) -> i32 {
    (z * DEPTH_SCALE) as i32
}

/// Map normalized device xy onto a square buffer of `size` pixels per side.
#[inline]
pub fn ndc_to_buffer(ndc: Vec2, size: u32) -> Vec2 {
    let half = size as f32 * 0.5;
    Vec2::new((ndc.x + 1.0) * half, (ndc.y + 1.0) * half)
}

/// Symmetric perspective window for a spot cone with the given half angle (radians).
///
/// Depth follows the GL convention: `near` maps to -1 and `far` to +1.
pub fn spot_window(half_angle: f32, near: f32, far: f32) -> TileRenderResult<Mat4> {
    if !(half_angle.is_finite() && half_angle > 0.0 && half_angle < std::f32::consts::FRAC_PI_2) {
        return Err(TileRenderError::config(
            "spot half angle must lie in (0, pi/2)",
        ));
    }
    validate_clip(near, far)?;
    Ok(Mat4::perspective_rh_gl(2.0 * half_angle, 1.0, near, far))
}

fn validate_clip(near: f32, far: f32) -> TileRenderResult<()> {
    if !(near.is_finite() && far.is_finite() && near > 0.0 && far > near) {
        return Err(TileRenderError::config(
            "clip range must satisfy 0 < near < far",
        ));
    }
    Ok(())
}

/// Convert a gamma-encoded channel into linear blending space.
#[inline]
pub fn gamma_decode(v: f32) -> f32 {
    if v <= 0.0 { 0.0 } else { v * v }
}

/// Inverse of [`gamma_decode`].
#[inline]
pub fn gamma_encode(v: f32) -> f32 {
    if v <= 0.0 { 0.0 } else { v.sqrt() }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
