use glam::{Vec2, Vec3};

use crate::foundation::math::{ndc_depth_to_fixed, ndc_to_buffer, project};
use crate::shadow::buffer::ShadowBuffer;
use crate::shadow::tile::ShadowTile;

/// World-space offsets of the neighbouring pixels' shading points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenDerivatives {
    pub dx: Vec3,
    pub dy: Vec3,
}

/// Quadratic falloff of one depth comparison.
#[inline]
pub(crate) fn compare(tap: i32, zs: i32, bias: f32) -> f32 {
    if tap > zs {
        return 1.0;
    }
    let diff = (i64::from(zs) - i64::from(tap)) as f64;
    let bias = f64::from(bias);
    if bias <= 0.0 || diff > bias {
        return if diff == 0.0 { 1.0 } else { 0.0 };
    }
    let f = diff / bias;
    (1.0 - f * f) as f32
}

impl ShadowBuffer {
    /// Light-space buffer coordinates and normalized depth of a world point;
    /// `None` when it lies behind the light.
    fn locate(&self, p: Vec3) -> Option<(Vec2, f32)> {
        let h = project(&self.persp, p);
        if h.w <= 0.0 {
            return None;
        }
        let ndc = h.truncate() / h.w;
        Some((ndc_to_buffer(ndc.truncate(), self.size), ndc.z))
    }

    #[inline]
    fn clamp_xy(&self, x: f32, y: f32) -> (u32, u32) {
        let max = (self.size - 1) as f32;
        (x.clamp(0.0, max) as u32, y.clamp(0.0, max) as u32)
    }

    #[inline]
    fn tap(&self, x: f32, y: f32, zs: i32, bias: f32) -> f32 {
        let (x, y) = self.clamp_xy(x, y);
        compare(self.depth_at(x, y), zs, bias)
    }

    /// Lit fraction of `p` in `0..=1`.
    ///
    /// `cos_incidence` is the cosine between surface normal and light direction;
    /// `derivatives` widens the filter footprint for minified surfaces.
    pub fn visibility(
        &self,
        p: Vec3,
        cos_incidence: f32,
        derivatives: Option<&ScreenDerivatives>,
    ) -> f32 {
        let Some((xy, z)) = self.locate(p) else {
            return 1.0;
        };
        if z > 1.0 {
            return 0.0;
        }
        if z < -1.0 {
            return 1.0;
        }
        let zs = ndc_depth_to_fixed(z);
        let c = cos_incidence.clamp(-1.0, 1.0);
        let bias = (1.1 - c * c) * self.base_bias;

        if self.samples <= 1 {
            return self.tap(xy.x, xy.y, zs, bias);
        }

        let soft = self.softness.max(1.0);
        let mut foot = Vec2::splat(soft);
        if let Some(d) = derivatives {
            let delta = |offset: Vec3| {
                self.locate(p + offset)
                    .map_or(Vec2::ZERO, |(q, _)| (q - xy).abs())
            };
            let (bx, by) = (delta(d.dx), delta(d.dy));
            foot = foot.max(soft * (bx + by));
        }
        foot = foot.min(Vec2::splat(self.size as f32));
        let origin = xy - 0.5 * foot;

        // Whole footprint inside one uniform tile: a single tap answers for all.
        let corners = [
            origin,
            origin + Vec2::new(foot.x, 0.0),
            origin + Vec2::new(0.0, foot.y),
            origin + foot,
        ];
        let first = {
            let (x, y) = self.clamp_xy(corners[0].x, corners[0].y);
            self.tile_index(x, y)
        };
        let same_tile = corners[1..].iter().all(|c| {
            let (x, y) = self.clamp_xy(c.x, c.y);
            self.tile_index(x, y) == first
        });
        if same_tile && let ShadowTile::Uniform(v) = self.tiles[first] {
            return compare(v, zs, bias);
        }

        let sum: f32 = self
            .jitter
            .iter()
            .map(|j| {
                let s = origin + *j * foot;
                self.tap(s.x, s.y, zs, bias)
            })
            .sum();
        sum / self.jitter.len() as f32
    }
}

/// Lit fraction of `p` as seen by the light owning `buffer`.
pub fn query_shadow(
    buffer: &ShadowBuffer,
    p: Vec3,
    cos_incidence: f32,
    derivatives: Option<&ScreenDerivatives>,
) -> f32 {
    buffer.visibility(p, cos_incidence, derivatives)
}

#[cfg(test)]
#[path = "../../tests/unit/shadow/sampler.rs"]
mod tests;
