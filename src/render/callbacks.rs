use crate::foundation::core::PixelRect;
use crate::foundation::error::TileRenderError;
use crate::result::model::RenderResult;

/// One progressive-display event: a part has just been merged.
#[derive(Clone, Copy, Debug)]
pub struct DisplayUpdate<'a> {
    /// Region written, relative to `result`.
    pub rect: PixelRect,
    /// The full result being rendered.
    pub result: &'a RenderResult,
    pub part: usize,
    pub display_order: u64,
}

/// Hooks into a running render. Called from the coordinating thread only.
pub trait RenderCallbacks {
    /// A fresh full result was allocated and is about to be filled.
    fn display_init(&self, _result: &RenderResult) {}

    fn display_update(&self, _update: &DisplayUpdate<'_>) {}

    /// Fraction of valid parts merged in the current sub-frame, `0..=1`.
    fn progress(&self, _fraction: f32) {}

    fn report_error(&self, _err: &TileRenderError) {}
}

/// Callbacks that ignore every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCallbacks;

impl RenderCallbacks for NoCallbacks {}
