//! Shared mosaic snapshot for external readers.
//!
//! The stitching thread is the single writer: after every successful
//! placement it builds a complete snapshot and swaps it in behind the
//! handle. Readers clone the snapshot out and never observe a canvas
//! mid-blend.

use std::sync::{Arc, RwLock};

use image::GrayImage;

use crate::core::types::PixelCorner;
use crate::engine::MosaicStatus;

/// An immutable, fully built view of the mosaic.
#[derive(Clone, Default)]
pub struct MosaicSnapshot {
    /// The composite canvas; `None` until the seed frame lands.
    pub canvas: Option<Arc<GrayImage>>,
    /// Canvas top-left corner in composite space.
    pub corner: PixelCorner,
    /// Engine counters at publish time.
    pub status: MosaicStatus,
    /// Publish time, microseconds since the Unix epoch.
    pub timestamp_us: u64,
}

/// Handle shared between the stitching thread (writer) and readers.
pub type SharedMosaicHandle = Arc<RwLock<MosaicSnapshot>>;

/// Create an empty shared snapshot handle.
pub fn new_shared_mosaic() -> SharedMosaicHandle {
    Arc::new(RwLock::new(MosaicSnapshot::default()))
}
