//! Stitching thread: queue consumer, engine driver, snapshot publisher.
//!
//! Frames are processed strictly one at a time in FIFO order, which
//! serializes every mosaic mutation on this thread. After each seed or
//! placement the canvas is published twice over: a fresh snapshot behind the
//! shared handle, and an atomic PNG export at the well-known path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use crate::core::types::now_us;
use crate::engine::{MosaicEngine, StitchOutcome};
use crate::io::PngExporter;
use crate::queue::FrameReceiver;
use crate::state::{MosaicSnapshot, SharedMosaicHandle};

/// Stitching thread handle.
pub struct StitchingThread {
    handle: JoinHandle<()>,
}

impl StitchingThread {
    /// Spawn the stitching thread.
    pub fn spawn(
        engine: MosaicEngine,
        queue: FrameReceiver,
        shared: SharedMosaicHandle,
        exporter: PngExporter,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("stitcher".into())
            .spawn(move || run_loop(engine, queue, shared, exporter, running))
            .expect("Failed to spawn stitching thread");

        Self { handle }
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_loop(
    mut engine: MosaicEngine,
    queue: FrameReceiver,
    shared: SharedMosaicHandle,
    exporter: PngExporter,
    running: Arc<AtomicBool>,
) {
    log::info!("stitching thread started");

    while running.load(Ordering::Relaxed) {
        // Blocking pop with a timeout so the shutdown flag is honored.
        let frame = match queue.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("frame queue disconnected, stitching thread exiting");
                break;
            }
        };

        match engine.add_frame(&frame) {
            StitchOutcome::Seeded | StitchOutcome::Placed { .. } => {
                publish(&engine, &shared, &exporter);
            }
            // The engine already logged the reason; the mosaic is untouched.
            StitchOutcome::Dropped(_) => {}
        }
    }

    let status = engine.status();
    log::info!(
        "stitching thread stopped ({} placed, {} dropped of {} frames)",
        status.frames_placed,
        status.frames_dropped,
        status.frames_seen
    );
}

/// Swap a complete snapshot behind the shared handle and write through to
/// the PNG export path.
fn publish(engine: &MosaicEngine, shared: &SharedMosaicHandle, exporter: &PngExporter) {
    let Some(canvas) = engine.canvas() else {
        return;
    };

    let snapshot = MosaicSnapshot {
        canvas: Some(Arc::new(canvas.image().clone())),
        corner: canvas.corner(),
        status: engine.status(),
        timestamp_us: now_us(),
    };
    if let Ok(mut guard) = shared.write() {
        *guard = snapshot;
    }

    if let Err(e) = exporter.export(canvas.image()) {
        log::error!("mosaic export failed: {}", e);
    }
}
