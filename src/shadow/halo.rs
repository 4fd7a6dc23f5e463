use glam::{Vec3, Vec4};

use crate::foundation::math::{ndc_depth_to_fixed, ndc_to_buffer};
use crate::shadow::buffer::ShadowBuffer;

const NEAR_W_EPS: f32 = 1e-4;

impl ShadowBuffer {
    /// Lit fraction along the segment `p1..p2`, both in light view space.
    ///
    /// The projected segment is walked one buffer pixel at a time. Samples past
    /// the far clip, in front of the near clip or outside the buffer count as lit;
    /// a sample also reads as lit while it is within the bias behind the stored surface.
    pub fn halo_visibility(&self, p1: Vec3, p2: Vec3) -> f32 {
        let mut h1 = self.window * p1.extend(1.0);
        let mut h2 = self.window * p2.extend(1.0);
        if h1.w <= NEAR_W_EPS && h2.w <= NEAR_W_EPS {
            return 1.0;
        }
        // Trim the part of the segment behind the light.
        let cut = |a: Vec4, b: Vec4| a.lerp(b, (NEAR_W_EPS - a.w) / (b.w - a.w));
        if h1.w <= NEAR_W_EPS {
            h1 = cut(h1, h2);
        } else if h2.w <= NEAR_W_EPS {
            h2 = cut(h2, h1);
        }

        let n1 = h1.truncate() / h1.w;
        let n2 = h2.truncate() / h2.w;
        let s1 = ndc_to_buffer(n1.truncate(), self.size);
        let s2 = ndc_to_buffer(n2.truncate(), self.size);
        let d = s2 - s1;
        let steps = d.x.abs().max(d.y.abs()).ceil().clamp(1.0, 4.0 * self.size as f32) as u32;

        let size = self.size as f32;
        let bias = f64::from(self.base_bias);
        let mut lit = 0u32;
        for i in 0..steps {
            let t = (i as f32 + 0.5) / steps as f32;
            let s = s1 + d * t;
            let zf = n1.z + (n2.z - n1.z) * t;
            if zf <= -1.0 || zf >= 1.0 || s.x < 0.0 || s.y < 0.0 || s.x >= size || s.y >= size {
                lit += 1;
                continue;
            }
            let tap = i64::from(self.depth_at(s.x as u32, s.y as u32));
            let zs = i64::from(ndc_depth_to_fixed(zf));
            if (tap as f64) > zs as f64 - bias {
                lit += 1;
            }
        }
        lit as f32 / steps as f32
    }
}

/// Lit fraction of the light-space segment `p1..p2` for volumetric light shafts.
pub fn query_shadow_halo(buffer: &ShadowBuffer, p1: Vec3, p2: Vec3) -> f32 {
    buffer.halo_visibility(p1, p2)
}

#[cfg(test)]
#[path = "../../tests/unit/shadow/halo.rs"]
mod tests;
