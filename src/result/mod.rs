pub mod merge;
pub mod model;
pub mod pool;
