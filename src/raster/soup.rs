use glam::{Mat4, Vec2, Vec3, Vec4};
use smallvec::SmallVec;

use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::foundation::math::{ndc_depth_to_fixed, ndc_to_buffer, project};
use crate::raster::DepthRasterizer;

// A triangle clipped by a single plane has at most four vertices.
type ClipPoly = SmallVec<[Vec4; 4]>;

const AREA_EPS: f32 = 1e-8;

/// One occluder triangle, optionally moving linearly with time.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    /// World units per frame.
    #[serde(default)]
    pub velocity: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            a,
            b,
            c,
            velocity: Vec3::ZERO,
        }
    }

    /// Vertices displaced to `time`.
    pub fn at(&self, time: f32) -> [Vec3; 3] {
        let d = self.velocity * time;
        [self.a + d, self.b + d, self.c + d]
    }

    /// Ray hit distance and unit face normal (facing the ray), Moller-Trumbore.
    pub fn intersect(&self, origin: Vec3, dir: Vec3, time: f32) -> Option<(f32, Vec3)> {
        let [a, b, c] = self.at(time);
        let e1 = b - a;
        let e2 = c - a;
        let p = dir.cross(e2);
        let det = e1.dot(p);
        if det.abs() < AREA_EPS {
            return None;
        }
        let inv = 1.0 / det;
        let s = origin - a;
        let u = s.dot(p) * inv;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = dir.dot(q) * inv;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv;
        if t <= 0.0 {
            return None;
        }
        let mut n = e1.cross(e2).normalize_or_zero();
        if n.dot(dir) > 0.0 {
            n = -n;
        }
        Some((t, n))
    }
}

/// Occluders as a flat triangle list.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TriangleSoup {
    pub triangles: Vec<Triangle>,
}

impl TriangleSoup {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Axis-aligned quad in the plane `y = height`, split into two triangles.
    pub fn push_quad_xz(&mut self, min: Vec2, max: Vec2, height: f32) {
        let p = |x: f32, z: f32| Vec3::new(x, height, z);
        self.triangles.push(Triangle::new(
            p(min.x, min.y),
            p(max.x, min.y),
            p(max.x, max.y),
        ));
        self.triangles.push(Triangle::new(
            p(min.x, min.y),
            p(max.x, max.y),
            p(min.x, max.y),
        ));
    }

    /// Nearest ray hit among all triangles.
    pub fn intersect(&self, origin: Vec3, dir: Vec3, time: f32) -> Option<(f32, Vec3)> {
        self.triangles
            .iter()
            .filter_map(|t| t.intersect(origin, dir, time))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }
}

impl DepthRasterizer for TriangleSoup {
    fn rasterize_depth(
        &self,
        persp: &Mat4,
        time: f32,
        size: u32,
        depth: &mut [i32],
    ) -> TileRenderResult<()> {
        if depth.len() != (size as usize) * (size as usize) {
            return Err(TileRenderError::evaluation(format!(
                "depth buffer holds {} samples, expected {size}x{size}",
                depth.len()
            )));
        }
        for tri in &self.triangles {
            let clip = tri.at(time).map(|v| project(persp, v));
            let poly = clip_near(&clip);
            // Fan triangulation of the clipped polygon.
            for i in 1..poly.len().saturating_sub(1) {
                raster_triangle([poly[0], poly[i], poly[i + 1]], size, depth);
            }
        }
        Ok(())
    }
}

/// Clip against the near plane `z + w >= 0`.
fn clip_near(tri: &[Vec4; 3]) -> ClipPoly {
    let mut out = ClipPoly::new();
    for i in 0..3 {
        let cur = tri[i];
        let next = tri[(i + 1) % 3];
        let dc = cur.z + cur.w;
        let dn = next.z + next.w;
        if dc >= 0.0 {
            out.push(cur);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            let t = dc / (dc - dn);
            out.push(cur.lerp(next, t));
        }
    }
    out
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn raster_triangle(clip: [Vec4; 3], size: u32, depth: &mut [i32]) {
    if clip.iter().any(|v| v.w <= 0.0) {
        return;
    }
    let ndc = clip.map(|v| v.truncate() / v.w);
    let s = ndc.map(|v| ndc_to_buffer(v.truncate(), size));
    let z = ndc.map(|v| v.z);

    let mut area = edge(s[0], s[1], s[2]);
    if area.abs() < AREA_EPS {
        return;
    }
    // Both windings are occluders.
    let sign = area.signum();
    area *= sign;

    let max = size as f32;
    let x0 = s.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let y0 = s.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let x1 = s.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil().min(max) as u32;
    let y1 = s.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil().min(max) as u32;

    for y in y0..y1 {
        let row = (y as usize) * (size as usize);
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(s[1], s[2], p) * sign;
            let w1 = edge(s[2], s[0], p) * sign;
            let w2 = edge(s[0], s[1], p) * sign;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let zn = (w0 * z[0] + w1 * z[1] + w2 * z[2]) / area;
            if !(-1.0..=1.0).contains(&zn) {
                continue;
            }
            let zi = ndc_depth_to_fixed(zn);
            let slot = &mut depth[row + x as usize];
            if zi < *slot {
                *slot = zi;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/soup.rs"]
mod tests;
