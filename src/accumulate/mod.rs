//! Sub-frame accumulation for motion blur and interlaced fields.

pub mod blur;
pub mod fields;

pub use blur::{BlurAccumulator, BlurOptions};
pub use fields::{field_height, interleave_fields};
