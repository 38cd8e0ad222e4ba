//! Per-frame stitching pipeline.
//!
//! Turns one captured frame into the mosaic seed, a placed frame merged into
//! the canvas, or a dropped frame. Every frame reaches exactly one of those
//! terminal states; a dropped frame is lost, never retried.

use thiserror::Error;

use crate::algorithms::estimation::{
    BundleAdjuster, CameraShift, GaussNewtonAdjuster, PoseEstimator, SolveError,
    TranslationEstimator,
};
use crate::algorithms::features::{BriefExtractor, FeatureExtractor, FrameFeatures};
use crate::algorithms::matching::{HammingMatcher, PairwiseMatcher};
use crate::config::EngineConfig;
use crate::core::types::{Frame, PixelCorner};

use super::anchor_index::{AnchorIndex, FeatureRecord};
use super::canvas::Canvas;

/// Why a frame was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("anchor lookup returned no candidates")]
    NoAnchors,

    #[error("pose could not be solved: {0}")]
    Solve(#[from] SolveError),
}

/// Outcome of processing one frame. Terminal; there are no retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StitchOutcome {
    /// First frame ever: the canvas was seeded at the composite origin.
    Seeded,
    /// Frame registered and blended at the given composite corner.
    Placed { corner: PixelCorner },
    /// Frame discarded; the mosaic is unchanged.
    Dropped(DropReason),
}

/// Counters for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MosaicStatus {
    /// Frames handed to the engine.
    pub frames_seen: u64,
    /// Frames seeded or placed.
    pub frames_placed: u64,
    /// Frames dropped.
    pub frames_dropped: u64,
    /// Registered anchor records; equals `frames_placed`.
    pub anchor_count: usize,
    /// Canvas extent as (height, width); zero before the seed.
    pub canvas_size: (u32, u32),
}

/// The incremental stitching engine.
///
/// Owns the canonical mosaic state: the canvas, its corner, and the anchor
/// records. Not internally synchronized; the consumer thread is the only
/// writer, which serializes every mutation.
pub struct MosaicEngine {
    config: EngineConfig,
    extractor: Box<dyn FeatureExtractor>,
    matcher: Box<dyn PairwiseMatcher>,
    estimator: Box<dyn PoseEstimator>,
    adjuster: Box<dyn BundleAdjuster>,
    canvas: Option<Canvas>,
    anchors: AnchorIndex,
    frames_seen: u64,
    frames_dropped: u64,
}

impl MosaicEngine {
    /// Engine with the default capability implementations.
    pub fn new(config: EngineConfig) -> Self {
        let extractor = Box::new(BriefExtractor::new(&config.features));
        let matcher = Box::new(HammingMatcher::new(&config.matching));
        let estimator = Box::new(TranslationEstimator::new(&config.estimation));
        let adjuster = Box::new(GaussNewtonAdjuster::new(&config.estimation));
        Self::with_capabilities(config, extractor, matcher, estimator, adjuster)
    }

    /// Engine with caller-supplied capabilities.
    pub fn with_capabilities(
        config: EngineConfig,
        extractor: Box<dyn FeatureExtractor>,
        matcher: Box<dyn PairwiseMatcher>,
        estimator: Box<dyn PoseEstimator>,
        adjuster: Box<dyn BundleAdjuster>,
    ) -> Self {
        Self {
            config,
            extractor,
            matcher,
            estimator,
            adjuster,
            canvas: None,
            anchors: AnchorIndex::new(),
            frames_seen: 0,
            frames_dropped: 0,
        }
    }

    /// Process one frame: seed, place, or drop.
    pub fn add_frame(&mut self, frame: &Frame) -> StitchOutcome {
        self.frames_seen += 1;

        let features = self.extractor.extract(&frame.image);

        if self.canvas.is_none() {
            return self.seed(frame, features);
        }

        match self.place(frame, features) {
            Ok(corner) => StitchOutcome::Placed { corner },
            Err(reason) => {
                self.frames_dropped += 1;
                log::warn!(
                    "dropping frame at ({:.1}, {:.1}): {}",
                    frame.position.x,
                    frame.position.y,
                    reason
                );
                StitchOutcome::Dropped(reason)
            }
        }
    }

    /// First frame ever: the canvas adopts it at the composite origin.
    fn seed(&mut self, frame: &Frame, features: FrameFeatures) -> StitchOutcome {
        self.canvas = Some(Canvas::seed(&frame.image));
        self.anchors.push(FeatureRecord {
            features,
            corner: PixelCorner::ORIGIN,
            frame_size: frame.size(),
            world: frame.position,
        });
        log::info!(
            "seeded mosaic with {}x{} frame at stage ({:.1}, {:.1})",
            frame.image.width(),
            frame.image.height(),
            frame.position.x,
            frame.position.y
        );
        StitchOutcome::Seeded
    }

    fn place(&mut self, frame: &Frame, features: FrameFeatures) -> Result<PixelCorner, DropReason> {
        let nearby = self
            .anchors
            .nearby(&frame.position, self.config.nearby_anchors);
        if nearby.is_empty() {
            log::error!("anchor index returned no candidates despite a seeded mosaic");
            return Err(DropReason::NoAnchors);
        }

        // Candidate set: the incoming frame first, then its anchors.
        let set: Vec<&FrameFeatures> = std::iter::once(&features)
            .chain(nearby.iter().map(|record| &record.features))
            .collect();

        let matches = self.matcher.match_set(&set);
        let estimate = self.estimator.estimate(&set, &matches)?;
        let outcome = self.adjuster.adjust(&estimate)?;
        log::debug!(
            "bundle adjustment: {} iterations, error {:.3} -> {:.3}",
            outcome.iterations,
            outcome.initial_error,
            outcome.final_error
        );

        let corner = derive_corner(&nearby, &outcome.shifts).ok_or(SolveError::Disconnected)?;

        let canvas = self
            .canvas
            .as_mut()
            .ok_or(DropReason::Solve(SolveError::Disconnected))?;
        canvas.blend(&frame.image, corner, self.config.blend);

        self.anchors.push(FeatureRecord {
            features,
            corner,
            frame_size: frame.size(),
            world: frame.position,
        });
        log::debug!(
            "placed frame at composite ({}, {}), canvas now {}x{}",
            corner.x,
            corner.y,
            canvas.image().width(),
            canvas.image().height()
        );
        Ok(corner)
    }

    /// The canvas, once seeded.
    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    /// Composite corner of the whole canvas; the origin before the seed.
    pub fn corner(&self) -> PixelCorner {
        self.canvas
            .as_ref()
            .map(|c| c.corner())
            .unwrap_or(PixelCorner::ORIGIN)
    }

    pub fn anchors(&self) -> &AnchorIndex {
        &self.anchors
    }

    pub fn status(&self) -> MosaicStatus {
        MosaicStatus {
            frames_seen: self.frames_seen,
            frames_placed: self.anchors.len() as u64,
            frames_dropped: self.frames_dropped,
            anchor_count: self.anchors.len(),
            canvas_size: self
                .canvas
                .as_ref()
                .map(|c| c.size())
                .unwrap_or((0, 0)),
        }
    }
}

/// Composite corner for the new frame: the nearest solved anchor's corner
/// plus the adjusted relative translation, rounded to integer pixels.
///
/// The new frame is the gauge at zero, so the relative translation from
/// anchor to frame is the negated anchor shift.
fn derive_corner(
    nearby: &[&FeatureRecord],
    shifts: &[Option<CameraShift>],
) -> Option<PixelCorner> {
    for (i, record) in nearby.iter().enumerate() {
        if let Some(shift) = shifts.get(i + 1).copied().flatten() {
            let dx = (-shift.dx).round() as i32;
            let dy = (-shift.dy).round() as i32;
            return Some(record.corner.offset(dx, dy));
        }
    }
    None
}
