//! Pipeline threads: the sampler producer and the stitching consumer.

mod sampler;
mod stitching;

pub use sampler::{CaptureGate, SamplerThread};
pub use stitching::StitchingThread;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::config::MosaicConfig;
use crate::engine::MosaicEngine;
use crate::io::{CameraLink, PngExporter, StageLink};
use crate::queue::frame_channel;
use crate::state::SharedMosaicHandle;

/// Both worker threads plus their shared queue, spawned together.
///
/// The sampler and stitcher run until `running` is cleared; [`join`]
/// completes the shutdown. This is the whole threading model: the queue is
/// the only structure the two threads share.
///
/// [`join`]: MosaicPipeline::join
pub struct MosaicPipeline {
    sampler: SamplerThread,
    stitcher: StitchingThread,
}

impl MosaicPipeline {
    /// Spawn the pipeline against the given collaborators.
    pub fn spawn(
        config: MosaicConfig,
        stage: Box<dyn StageLink>,
        camera: Box<dyn CameraLink>,
        shared: SharedMosaicHandle,
        running: Arc<AtomicBool>,
    ) -> Self {
        let (tx, rx) = frame_channel(&config.queue);

        let sampler = SamplerThread::spawn(config.sampler, stage, camera, tx, running.clone());

        let engine = MosaicEngine::new(config.engine);
        let exporter = PngExporter::new(&config.export.map_path);
        let stitcher = StitchingThread::spawn(engine, rx, shared, exporter, running);

        Self { sampler, stitcher }
    }

    /// Wait for both threads to finish. Call after clearing the running
    /// flag.
    pub fn join(self) {
        self.sampler.join().ok();
        self.stitcher.join().ok();
    }
}
