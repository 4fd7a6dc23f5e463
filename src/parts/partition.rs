use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{TileRenderError, TileRenderResult};

/// Default smallest span a grid part may have on either axis.
pub const MIN_PART_SPAN: i32 = 64;
/// Smallest column span of a panorama slice.
pub const MIN_PANORAMA_SLICE_SPAN: i32 = 8;
/// Upper bound on requested parts per axis.
pub const MAX_PARTS_PER_AXIS: u32 = 512;
/// Largest accepted minimum part span.
pub const MAX_MIN_PART_SPAN: u32 = 1 << 16;
/// Largest accepted filter margin around a part.
pub const MAX_TILE_CROP: u32 = 1 << 14;

/// How the display rectangle is split into parts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TilingMode {
    /// Ordinary row-major tile grid.
    #[default]
    Grid,
    /// Wide-field output: columns are scene slices rendered one after another,
    /// each with its own camera rotation; rows still tile within a slice.
    Panorama,
}

/// Inputs of one partitioning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartitionRequest {
    /// Full output image.
    pub image: Canvas,
    /// Display (border) rectangle in image coordinates.
    pub display: PixelRect,
    pub columns: u32,
    pub rows: u32,
    /// Filter margin rendered around every part.
    pub crop: u32,
    pub mode: TilingMode,
    /// Smallest part span for rows and grid columns.
    pub min_span: i32,
    /// Camera yaw per pixel of slice shift; only read in panorama mode.
    pub pixel_rotation: f32,
}

/// Panorama slice a part belongs to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanoramaSlice {
    pub index: u32,
    pub count: u32,
    /// Horizontal distance in pixels from the slice center to the image center.
    pub pixel_shift: i32,
    /// Camera yaw for this slice, `pixel_shift * pixel_rotation`.
    pub rotation: f32,
}

/// One rectangular part produced by [`partition`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartSpec {
    /// Row-major position in the grid.
    pub index: usize,
    /// Grid cell relative to the display rectangle, without crop.
    pub cell: PixelRect,
    /// Rendered rectangle: `cell` grown by `crop` on every edge.
    pub rect: PixelRect,
    pub crop: u32,
    /// False when the crop margin would swallow the cell; such parts are never rendered.
    pub valid: bool,
    pub slice: Option<PanoramaSlice>,
}

/// Effective part count along one axis: never more parts than `span / min_span` rounded up.
pub fn effective_count(requested: u32, span: i32, min_span: i32) -> u32 {
    let requested = requested.max(1);
    if span <= 0 {
        return 1;
    }
    let min_span = i64::from(min_span.max(1));
    let cap = (i64::from(span) + min_span - 1) / min_span;
    requested.min(u32::try_from(cap).unwrap_or(u32::MAX)).max(1)
}

/// Split the display rectangle into an ordered, row-major list of parts.
///
/// Deterministic for a given request. The cells of all valid parts tile the display
/// rectangle exactly; rendered rects of neighbours overlap only within the crop margin.
pub fn partition(req: &PartitionRequest) -> TileRenderResult<Vec<PartSpec>> {
    if req.display.is_empty() {
        return Err(TileRenderError::config("display rectangle has zero area"));
    }
    if !req.image.rect().contains_rect(req.display) {
        return Err(TileRenderError::config(
            "display rectangle exceeds the image",
        ));
    }
    if req.columns > MAX_PARTS_PER_AXIS || req.rows > MAX_PARTS_PER_AXIS {
        return Err(TileRenderError::config(format!(
            "part count exceeds {MAX_PARTS_PER_AXIS} per axis"
        )));
    }
    if !(1..=MAX_MIN_PART_SPAN as i32).contains(&req.min_span) {
        return Err(TileRenderError::config(format!(
            "min part span must lie in 1..={MAX_MIN_PART_SPAN}"
        )));
    }
    if req.crop > MAX_TILE_CROP {
        return Err(TileRenderError::config(format!(
            "tile crop exceeds {MAX_TILE_CROP} pixels"
        )));
    }
    if req.mode == TilingMode::Panorama && req.display.width() != req.image.width as i32 {
        return Err(TileRenderError::config(
            "panorama rendering needs a border spanning the full image width",
        ));
    }

    let span_x = req.display.width();
    let span_y = req.display.height();
    let min_span = req.min_span;
    let min_x = match req.mode {
        TilingMode::Grid => min_span,
        TilingMode::Panorama => MIN_PANORAMA_SLICE_SPAN.min(min_span),
    };
    let xparts = effective_count(req.columns, span_x, min_x);
    let yparts = effective_count(req.rows, span_y, min_span);
    let xpart = span_x / xparts as i32;
    let ypart = span_y / yparts as i32;
    let crop = i32::try_from(req.crop)
        .map_err(|_| TileRenderError::config("tile crop does not fit the pixel grid"))?;

    let mut parts = Vec::with_capacity((xparts * yparts) as usize);
    for nr in 0..(xparts * yparts) {
        let xd = (nr % xparts) as i32;
        let yd = (nr / xparts) as i32;

        let xmin = xd * xpart;
        let ymin = yd * ypart;
        // Last column/row absorbs the division remainder.
        let xmax = if xd < xparts as i32 - 1 {
            (xmin + xpart).min(span_x)
        } else {
            span_x
        };
        let ymax = if yd < yparts as i32 - 1 {
            (ymin + ypart).min(span_y)
        } else {
            span_y
        };
        let cell = PixelRect::new(xmin, ymin, xmax, ymax);
        let margin = 2 * i64::from(crop);
        let valid = !cell.is_empty()
            && i64::from(cell.width()) > margin
            && i64::from(cell.height()) > margin;

        let slice = (req.mode == TilingMode::Panorama).then(|| {
            let abs_min = req.display.xmin + xmin;
            let abs_max = req.display.xmin + xmax;
            let pixel_shift = (req.image.width as i32 - (abs_min + abs_max)) / 2;
            PanoramaSlice {
                index: xd as u32,
                count: xparts,
                pixel_shift,
                rotation: pixel_shift as f32 * req.pixel_rotation,
            }
        });

        parts.push(PartSpec {
            index: nr as usize,
            cell,
            rect: cell.expand(crop),
            crop: req.crop,
            valid,
            slice,
        });
    }

    tracing::debug!(
        xparts,
        yparts,
        crop = req.crop,
        invalid = parts.iter().filter(|p| !p.valid).count(),
        "partitioned display rectangle"
    );
    Ok(parts)
}

/// Camera yaw per pixel for panorama slices.
///
/// `viewplane_width` is the camera window width at distance `clip_start`. The angle
/// is narrowed when a slice would otherwise cover more than its share of the view.
pub fn panorama_pixel_rotation(
    viewplane_width: f32,
    clip_start: f32,
    image_width: u32,
    display_width: i32,
    slices: u32,
) -> f32 {
    let winx = image_width.max(1) as f32;
    let slices = slices.max(1);
    let borderfac = display_width as f32 / winx;
    let part_width = (display_width.max(1) as u32).div_ceil(slices) as f32;

    let psize = viewplane_width / winx;
    let mut phi = (psize / clip_start).atan();
    let xfac = borderfac * viewplane_width / slices as f32;
    let xfac = (0.5 * xfac / clip_start).atan();
    let half_span = 0.5 * phi * part_width;
    if half_span > 0.0 {
        phi *= xfac / half_span;
    }
    phi
}

#[cfg(test)]
#[path = "../../tests/unit/parts/partition.rs"]
mod tests;
