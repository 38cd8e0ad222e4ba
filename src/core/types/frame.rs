//! Captured camera frame.

use std::time::{SystemTime, UNIX_EPOCH};

use image::GrayImage;

use super::position::StagePosition;

/// A single camera frame tagged with the stage position at capture time.
///
/// Produced by the sampler thread, consumed exactly once by the stitching
/// engine, then discarded. The pixel buffer only outlives the stitch when it
/// becomes the mosaic seed or is blended into the canvas.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel buffer
    pub image: GrayImage,
    /// Stage position when the frame was captured
    pub position: StagePosition,
    /// Capture time, microseconds since the Unix epoch
    pub timestamp_us: u64,
}

impl Frame {
    /// Create a new frame.
    pub fn new(image: GrayImage, position: StagePosition, timestamp_us: u64) -> Self {
        Self {
            image,
            position,
            timestamp_us,
        }
    }

    /// Frame extent as (height, width) in pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.image.height(), self.image.width())
    }
}

/// Current wall-clock time in microseconds since the Unix epoch.
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
