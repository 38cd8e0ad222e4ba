//! ChitraMosaic - live incremental mosaicking of a specimen surface
//!
//! Builds one large composite image from a continuous stream of small camera
//! frames captured while a motorized stage moves. Each frame carries an
//! approximate physical position; placement comes from visual feature
//! correspondence rather than trusting position alone, and happens online,
//! without ever re-processing history.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    threads/                         │  ← Sampler + stitcher loops
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │              io/  +  queue  +  state                │  ← Seams, FIFO, snapshots
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Anchor index, canvas, stitcher
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Vision capabilities
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Coordinate + frame types
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Data flow: position sampler → frame queue → stitching engine → mosaic
//! state → snapshot handle + PNG export.
//!
//! # Frame lifecycle
//!
//! `Captured → Queued → {Seeded | Placed | Dropped}`. Terminal states are
//! final; a dropped frame is lost, never re-queued, and the pipeline keeps
//! running. No single bad frame ever terminates the loops.

pub mod algorithms;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod io;
pub mod queue;
pub mod state;
pub mod threads;

// Convenience re-exports (flat namespace for common use)

pub use config::{BlendPolicy, MosaicConfig, OverflowPolicy};
pub use crate::core::types::{Frame, PixelCorner, StagePosition, now_us};
pub use engine::{DropReason, FeatureRecord, MosaicEngine, MosaicStatus, StitchOutcome};
pub use error::{MosaicError, Result};
pub use io::{CameraLink, PngExporter, SimBench, SimBenchConfig, StageLink};
pub use queue::{FrameReceiver, FrameSender, frame_channel};
pub use state::{MosaicSnapshot, SharedMosaicHandle, new_shared_mosaic};
pub use threads::{CaptureGate, MosaicPipeline};
