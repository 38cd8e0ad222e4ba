//! Sampler thread: fixed-cadence position polling and motion-gated capture.
//!
//! The loop reads the stage position every poll interval and captures a
//! frame only after sufficient physical displacement, which bounds the
//! capture rate to stage speed rather than wall-clock time. A failed
//! position or camera read skips the tick; the loop only exits on the
//! shared shutdown flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::SamplerConfig;
use crate::core::types::{Frame, StagePosition, now_us};
use crate::io::{CameraLink, StageLink};
use crate::queue::FrameSender;

/// Distance gate deciding when the stage has moved far enough for a capture.
///
/// Fires on the very first observed position, then only once the XY
/// displacement since the last capture exceeds the threshold.
#[derive(Debug, Clone)]
pub struct CaptureGate {
    last_captured: Option<StagePosition>,
    threshold: f32,
}

impl CaptureGate {
    pub fn new(threshold: f32) -> Self {
        Self {
            last_captured: None,
            threshold,
        }
    }

    /// Whether a capture should happen at `position`.
    pub fn should_capture(&self, position: &StagePosition) -> bool {
        match &self.last_captured {
            None => true,
            Some(last) => last.distance_xy(position) > self.threshold,
        }
    }

    /// Commit a successful capture. Kept separate from the decision so a
    /// failed camera read leaves the gate armed for the next tick.
    pub fn record(&mut self, position: StagePosition) {
        self.last_captured = Some(position);
    }

    pub fn last_captured(&self) -> Option<StagePosition> {
        self.last_captured
    }
}

/// Sampler thread handle.
pub struct SamplerThread {
    handle: JoinHandle<()>,
}

impl SamplerThread {
    /// Spawn the sampler thread.
    pub fn spawn(
        config: SamplerConfig,
        stage: Box<dyn StageLink>,
        camera: Box<dyn CameraLink>,
        queue: FrameSender,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("sampler".into())
            .spawn(move || run_loop(config, stage, camera, queue, running))
            .expect("Failed to spawn sampler thread");

        Self { handle }
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_loop(
    config: SamplerConfig,
    mut stage: Box<dyn StageLink>,
    mut camera: Box<dyn CameraLink>,
    queue: FrameSender,
    running: Arc<AtomicBool>,
) {
    log::info!(
        "sampler thread started (poll {} ms, trigger distance {})",
        config.poll_interval_ms,
        config.capture_distance
    );

    let interval = Duration::from_millis(config.poll_interval_ms);
    let mut gate = CaptureGate::new(config.capture_distance);

    while running.load(Ordering::Relaxed) {
        tick(&config, &mut gate, stage.as_mut(), camera.as_mut(), &queue);
        thread::sleep(interval);
    }

    log::info!("sampler thread stopped");
}

/// One poll: read position, maybe capture, maybe enqueue.
fn tick(
    config: &SamplerConfig,
    gate: &mut CaptureGate,
    stage: &mut dyn StageLink,
    camera: &mut dyn CameraLink,
    queue: &FrameSender,
) {
    let position = match stage.position() {
        Ok(p) => p,
        Err(e) => {
            log::warn!("position read failed, skipping tick: {}", e);
            return;
        }
    };

    if !gate.should_capture(&position) {
        return;
    }

    let image = match camera.capture(config.low_resolution) {
        Ok(image) => image,
        Err(e) => {
            log::warn!("capture failed, skipping tick: {}", e);
            return;
        }
    };

    gate.record(position);
    log::debug!(
        "captured frame at stage ({:.1}, {:.1}), queue depth {}",
        position.x,
        position.y,
        queue.len() + 1
    );
    queue.push(Frame::new(image, position, now_us()));
}
