//! Incremental stitching engine.

mod anchor_index;
mod canvas;
mod stitcher;

pub use anchor_index::{AnchorIndex, FeatureRecord};
pub use canvas::Canvas;
pub use stitcher::{DropReason, MosaicEngine, MosaicStatus, StitchOutcome};
