//! Engine placement scenarios with scripted capabilities.
//!
//! The vision capabilities are injected as stubs so these tests pin down the
//! engine's bookkeeping contracts: seeding, corner arithmetic, corner
//! monotonicity, and drop safety.

use std::collections::VecDeque;
use std::sync::Mutex;

use image::{GrayImage, Luma};

use chitra_mosaic::algorithms::estimation::{
    AdjustOutcome, BundleAdjuster, CameraShift, PoseEstimate, PoseEstimator, SolveError,
};
use chitra_mosaic::algorithms::features::{FeatureExtractor, FrameFeatures};
use chitra_mosaic::algorithms::matching::{PairMatches, PairwiseMatcher};
use chitra_mosaic::config::EngineConfig;
use chitra_mosaic::{Frame, MosaicEngine, PixelCorner, StagePosition, StitchOutcome};

struct StubExtractor;

impl FeatureExtractor for StubExtractor {
    fn extract(&self, _image: &GrayImage) -> FrameFeatures {
        FrameFeatures::default()
    }
}

struct StubMatcher;

impl PairwiseMatcher for StubMatcher {
    fn match_set(&self, set: &[&FrameFeatures]) -> Vec<PairMatches> {
        (1..set.len())
            .map(|b| PairMatches {
                a: 0,
                b,
                pairs: Vec::new(),
            })
            .collect()
    }
}

/// Pops one scripted result per frame.
struct ScriptedEstimator {
    script: Mutex<VecDeque<Result<Vec<Option<CameraShift>>, SolveError>>>,
}

impl ScriptedEstimator {
    fn new(script: Vec<Result<Vec<Option<CameraShift>>, SolveError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

impl PoseEstimator for ScriptedEstimator {
    fn estimate(
        &self,
        _set: &[&FrameFeatures],
        _matches: &[PairMatches],
    ) -> Result<PoseEstimate, SolveError> {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("estimator script exhausted");
        next.map(|shifts| PoseEstimate {
            shifts,
            constraints: Vec::new(),
        })
    }
}

/// Returns the initial estimate unchanged.
struct PassthroughAdjuster;

impl BundleAdjuster for PassthroughAdjuster {
    fn adjust(&self, estimate: &PoseEstimate) -> Result<AdjustOutcome, SolveError> {
        Ok(AdjustOutcome {
            shifts: estimate.shifts.clone(),
            iterations: 0,
            initial_error: 0.0,
            final_error: 0.0,
            converged: true,
        })
    }
}

fn engine_with_script(
    script: Vec<Result<Vec<Option<CameraShift>>, SolveError>>,
) -> MosaicEngine {
    MosaicEngine::with_capabilities(
        EngineConfig::default(),
        Box::new(StubExtractor),
        Box::new(StubMatcher),
        Box::new(ScriptedEstimator::new(script)),
        Box::new(PassthroughAdjuster),
    )
}

fn frame(value: u8, x: f32, y: f32) -> Frame {
    Frame::new(
        GrayImage::from_pixel(100, 80, Luma([value])),
        StagePosition::new(x, y, 0.0),
        0,
    )
}

/// Scenario: a single frame seeds the mosaic verbatim.
#[test]
fn test_first_frame_seeds() {
    let mut engine = engine_with_script(vec![]);
    let f0 = frame(50, 0.0, 0.0);

    assert_eq!(engine.add_frame(&f0), StitchOutcome::Seeded);

    let canvas = engine.canvas().unwrap();
    assert_eq!(canvas.image(), &f0.image);
    assert_eq!(canvas.corner(), PixelCorner::ORIGIN);

    let status = engine.status();
    assert_eq!(status.frames_placed, 1);
    assert_eq!(status.anchor_count, 1);
    assert_eq!(status.canvas_size, (80, 100));
}

/// Scenario: a second frame lands at the corner implied by the adjusted
/// relative shift, and the canvas covers both extents.
#[test]
fn test_second_frame_placement_arithmetic() {
    // Anchor shift -40 in x means the new frame sits 40px to the right.
    let mut engine = engine_with_script(vec![Ok(vec![
        Some(CameraShift::default()),
        Some(CameraShift::new(-40.0, 0.0)),
    ])]);

    engine.add_frame(&frame(50, 0.0, 0.0));
    let outcome = engine.add_frame(&frame(90, 1000.0, 0.0));

    assert_eq!(
        outcome,
        StitchOutcome::Placed {
            corner: PixelCorner::new(40, 0)
        }
    );

    let status = engine.status();
    assert_eq!(status.frames_placed, 2);
    assert_eq!(status.anchor_count, 2);
    // 100 + 40 wide, unchanged height.
    assert_eq!(status.canvas_size, (80, 140));
    assert_eq!(engine.corner(), PixelCorner::ORIGIN);
}

/// The canvas corner tracks the component-wise minimum of placed corners.
#[test]
fn test_corner_monotonicity() {
    let mut engine = engine_with_script(vec![
        Ok(vec![
            Some(CameraShift::default()),
            Some(CameraShift::new(-40.0, 0.0)),
        ]),
        // Positive anchor shift pushes the third frame up-left of the seed.
        Ok(vec![
            Some(CameraShift::default()),
            Some(CameraShift::new(30.0, 20.0)),
        ]),
    ]);

    engine.add_frame(&frame(10, 0.0, 0.0));
    engine.add_frame(&frame(20, 1000.0, 0.0));
    let outcome = engine.add_frame(&frame(30, 2000.0, 0.0));

    assert_eq!(
        outcome,
        StitchOutcome::Placed {
            corner: PixelCorner::new(-30, -20)
        }
    );
    assert_eq!(engine.corner(), PixelCorner::new(-30, -20));

    // Corner is not forgotten by a later in-bounds placement.
    let status = engine.status();
    assert_eq!(status.frames_placed, 3);
    assert_eq!(status.canvas_size, (100, 170));
}

/// Scenario: estimation failure drops the frame and leaves every piece of
/// mosaic state untouched.
#[test]
fn test_drop_safety_on_solver_failure() {
    let mut engine = engine_with_script(vec![
        Ok(vec![
            Some(CameraShift::default()),
            Some(CameraShift::new(-40.0, 0.0)),
        ]),
        Err(SolveError::NoConstraints),
    ]);

    engine.add_frame(&frame(10, 0.0, 0.0));
    engine.add_frame(&frame(20, 1000.0, 0.0));

    let before_status = engine.status();
    let before_canvas = engine.canvas().unwrap().image().clone();
    let before_corner = engine.corner();

    let outcome = engine.add_frame(&frame(30, 2000.0, 0.0));
    assert!(matches!(outcome, StitchOutcome::Dropped(_)));

    assert_eq!(engine.canvas().unwrap().image(), &before_canvas);
    assert_eq!(engine.corner(), before_corner);

    let after = engine.status();
    assert_eq!(after.frames_placed, before_status.frames_placed);
    assert_eq!(after.anchor_count, before_status.anchor_count);
    assert_eq!(after.canvas_size, before_status.canvas_size);
    assert_eq!(after.frames_dropped, before_status.frames_dropped + 1);
    assert_eq!(after.frames_seen, before_status.frames_seen + 1);
}

/// A frame whose solution only reaches a farther anchor still places,
/// anchored to that record.
#[test]
fn test_placement_falls_back_to_solved_anchor() {
    let mut engine = engine_with_script(vec![
        Ok(vec![
            Some(CameraShift::default()),
            Some(CameraShift::new(-40.0, 0.0)),
        ]),
        // Two anchors in the candidate set; the first is unsolved.
        Ok(vec![
            Some(CameraShift::default()),
            None,
            Some(CameraShift::new(-25.0, -5.0)),
        ]),
    ]);

    engine.add_frame(&frame(10, 0.0, 0.0));
    engine.add_frame(&frame(20, 1000.0, 0.0));
    let outcome = engine.add_frame(&frame(30, 2000.0, 0.0));

    // Second candidate anchor is the frame at corner (40, 0).
    assert_eq!(
        outcome,
        StitchOutcome::Placed {
            corner: PixelCorner::new(65, 5)
        }
    );
}
