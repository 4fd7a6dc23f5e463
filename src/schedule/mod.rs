//! Tile dispatch, completion and merging.

pub mod cancel;
pub mod scheduler;

pub use cancel::CancelToken;
pub use scheduler::{Part, PartState, RenderStats, ScheduleReport, SchedulerOpts, run_parts};
