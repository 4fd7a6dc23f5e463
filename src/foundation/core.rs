use crate::foundation::error::{TileRenderError, TileRenderResult};

pub use kurbo::Rect;

/// Integer pixel rectangle, `min` inclusive and `max` exclusive.
///
/// Coordinates are signed: a part expanded by its crop margin may extend past the image edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl PixelRect {
    pub const fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Rectangle at the origin with the given size.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn width(self) -> i32 {
        self.xmax - self.xmin
    }

    pub fn height(self) -> i32 {
        self.ymax - self.ymin
    }

    pub fn is_empty(self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn area(self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.width() as u64) * (self.height() as u64)
        }
    }

    /// Integer center, rounded toward the min corner.
    pub fn center(self) -> (i64, i64) {
        (
            (i64::from(self.xmin) + i64::from(self.xmax)) / 2,
            (i64::from(self.ymin) + i64::from(self.ymax)) / 2,
        )
    }

    /// Grow every edge outward by `n` pixels.
    pub fn expand(self, n: i32) -> Self {
        Self::new(self.xmin - n, self.ymin - n, self.xmax + n, self.ymax + n)
    }

    /// Pull every edge inward by `n` pixels. The result may be empty.
    pub fn shrink(self, n: i32) -> Self {
        self.expand(-n)
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.xmin + dx, self.ymin + dy, self.xmax + dx, self.ymax + dy)
    }

    pub fn intersect(self, other: Self) -> Option<Self> {
        let r = Self::new(
            self.xmin.max(other.xmin),
            self.ymin.max(other.ymin),
            self.xmax.min(other.xmax),
            self.ymax.min(other.ymax),
        );
        (!r.is_empty()).then_some(r)
    }

    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.xmin && x < self.xmax && y >= self.ymin && y < self.ymax
    }

    pub fn contains_rect(self, other: Self) -> bool {
        other.xmin >= self.xmin
            && other.ymin >= self.ymin
            && other.xmax <= self.xmax
            && other.ymax <= self.ymax
    }

    /// Map a normalized border (0..1 on both axes) onto a `width` x `height` image.
    pub fn from_normalized(border: Rect, width: u32, height: u32) -> TileRenderResult<Self> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !(in_unit(border.x0) && in_unit(border.x1) && in_unit(border.y0) && in_unit(border.y1))
        {
            return Err(TileRenderError::config(
                "border coordinates must lie within 0..=1",
            ));
        }
        let w = f64::from(width);
        let h = f64::from(height);
        // Truncation matches the integer display rectangle convention.
        let r = Self::new(
            (border.x0 * w) as i32,
            (border.y0 * h) as i32,
            (border.x1 * w) as i32,
            (border.y1 * h) as i32,
        );
        if r.is_empty() {
            return Err(TileRenderError::config("border has zero area"));
        }
        Ok(r)
    }
}

/// Output image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> TileRenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(TileRenderError::config("image too small"));
        }
        Ok(Self { width, height })
    }

    pub fn rect(self) -> PixelRect {
        PixelRect::from_size(self.width, self.height)
    }

    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
