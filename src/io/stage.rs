//! Stage and camera collaborator seams.
//!
//! The hosting layer owns the actual hardware (and its motion lock); the
//! pipeline only ever reads through these two traits. Failures are
//! transient: the sampler logs them and skips the tick.

use image::GrayImage;

use crate::core::types::StagePosition;
use crate::error::Result;

/// Stage/position collaborator.
pub trait StageLink: Send {
    /// Current stage position. Read-only with respect to stage state.
    fn position(&mut self) -> Result<StagePosition>;
}

/// Camera collaborator.
pub trait CameraLink: Send {
    /// Capture a frame. `low_resolution` requests the cheap video-port path
    /// so live mosaicking stays light on CPU and memory.
    fn capture(&mut self, low_resolution: bool) -> Result<GrayImage>;
}
