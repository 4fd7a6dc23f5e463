use std::sync::Arc;

use glam::Vec3;

use crate::foundation::error::TileRenderResult;
use crate::raster::soup::TriangleSoup;
use crate::result::model::{COMBINED_CHANNELS, PassKind, RenderResult};
use crate::schedule::cancel::CancelToken;
use crate::shade::{ShadeContext, ShadeOutcome, TileJob, TileShader};
use crate::shadow::ScreenDerivatives;

/// Offset along the normal before shadow lookups.
const SURFACE_EPS: f32 = 1e-3;

/// Demo shading stage: an infinite ground plane plus the occluder triangles,
/// lit by the context's spot lights with shadow-buffer visibility.
#[derive(Clone, Debug)]
pub struct GroundShader {
    pub occluders: Arc<TriangleSoup>,
    pub ground_height: f32,
    pub ground_color: Vec3,
    pub object_color: Vec3,
    pub ambient: f32,
}

impl Default for GroundShader {
    fn default() -> Self {
        Self {
            occluders: Arc::new(TriangleSoup::default()),
            ground_height: 0.0,
            ground_color: Vec3::splat(0.8),
            object_color: Vec3::new(0.8, 0.3, 0.2),
            ambient: 0.05,
        }
    }
}

struct Hit {
    t: f32,
    normal: Vec3,
    albedo: Vec3,
}

#[derive(Default)]
struct Sample {
    rgba: [f32; 4],
    depth: f32,
    normal: Vec3,
    albedo: Vec3,
    diffuse: Vec3,
    shadow: Vec3,
}

impl GroundShader {
    pub fn new(occluders: Arc<TriangleSoup>) -> Self {
        Self {
            occluders,
            ..Self::default()
        }
    }

    fn trace(&self, origin: Vec3, dir: Vec3, time: f32) -> Option<Hit> {
        let object = self.occluders.intersect(origin, dir, time).map(|(t, normal)| Hit {
            t,
            normal,
            albedo: self.object_color,
        });
        let ground = (dir.y < 0.0)
            .then(|| (self.ground_height - origin.y) / dir.y)
            .filter(|&t| t > 0.0 && origin.y > self.ground_height)
            .map(|t| Hit {
                t,
                normal: Vec3::Y,
                albedo: self.ground_color,
            });
        match (object, ground) {
            (Some(o), Some(g)) => Some(if o.t <= g.t { o } else { g }),
            (o, g) => o.or(g),
        }
    }

    fn shade_pixel(&self, ctx: &ShadeContext, job: &TileJob, px: f32, py: f32) -> Sample {
        let (origin, dir) = ctx.primary_ray(job, px, py);
        let Some(hit) = self.trace(origin, dir, ctx.time) else {
            return Sample {
                depth: f32::MAX,
                ..Sample::default()
            };
        };
        let p = origin + dir * hit.t;

        // Footprint of one pixel on the hit surface.
        let (_, dir_x) = ctx.primary_ray(job, px + 1.0, py);
        let (_, dir_y) = ctx.primary_ray(job, px, py + 1.0);
        let derivs = ScreenDerivatives {
            dx: (dir_x - dir) * hit.t,
            dy: (dir_y - dir) * hit.t,
        };

        let mut diffuse = Vec3::ZERO;
        let mut unshadowed = Vec3::ZERO;
        for sl in ctx.lights.iter() {
            let light = &sl.light;
            if !light.in_cone(p) {
                continue;
            }
            let lambert = hit.normal.dot(light.to_light(p)).max(0.0);
            if lambert <= 0.0 {
                continue;
            }
            let vis = sl.buffer.as_ref().map_or(1.0, |buf| {
                buf.visibility(p + hit.normal * SURFACE_EPS, lambert, Some(&derivs))
            });
            let energy = light.color * light.energy * lambert;
            unshadowed += energy;
            diffuse += energy * vis;
        }
        let shadow = Vec3::select(
            unshadowed.cmpgt(Vec3::ZERO),
            diffuse / unshadowed.max(Vec3::splat(f32::MIN_POSITIVE)),
            Vec3::ONE,
        );
        let rgb = hit.albedo * (Vec3::splat(self.ambient) + diffuse);
        Sample {
            rgba: [rgb.x, rgb.y, rgb.z, 1.0],
            depth: hit.t,
            normal: hit.normal,
            albedo: hit.albedo,
            diffuse,
            shadow,
        }
    }
}

fn put(out: &mut RenderResult, kind: PassKind, idx: usize, values: &[f32]) {
    for layer in &mut out.layers {
        if let Some(pass) = layer.pass_mut(kind) {
            let n = kind.channels().min(values.len());
            pass.data[idx * kind.channels()..][..n].copy_from_slice(&values[..n]);
        }
    }
}

impl TileShader for GroundShader {
    fn shade_tile(
        &self,
        ctx: &ShadeContext,
        job: &TileJob,
        out: &mut RenderResult,
        cancel: &CancelToken,
    ) -> TileRenderResult<ShadeOutcome> {
        for y in 0..out.height {
            if cancel.poll() {
                return Ok(ShadeOutcome::Aborted);
            }
            for x in 0..out.width {
                let (ix, iy) = ctx.image_pixel(job, x, y);
                let s = self.shade_pixel(ctx, job, ix as f32 + 0.5, iy as f32 + 0.5);
                let idx = (y * out.width + x) as usize;

                for layer in &mut out.layers {
                    let c = idx * COMBINED_CHANNELS;
                    layer.combined[c..c + COMBINED_CHANNELS].copy_from_slice(&s.rgba);
                }
                put(out, PassKind::Depth, idx, &[s.depth]);
                put(out, PassKind::Normal, idx, &s.normal.to_array());
                put(out, PassKind::Color, idx, &[s.albedo.x, s.albedo.y, s.albedo.z, s.rgba[3]]);
                put(out, PassKind::Diffuse, idx, &s.diffuse.to_array());
                put(out, PassKind::Shadow, idx, &s.shadow.to_array());
            }
        }
        Ok(ShadeOutcome::Complete)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shade/ground.rs"]
mod tests;
