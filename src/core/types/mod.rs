//! Shared data types for the mosaicking pipeline.

mod frame;
mod position;

pub use frame::{Frame, now_us};
pub use position::{PixelCorner, StagePosition};
