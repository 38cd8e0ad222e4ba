//! Feature extraction capability.

mod brief;
mod fast;

pub use brief::BriefPattern;

use image::GrayImage;

use crate::config::FeatureConfig;

/// A detected keypoint in frame-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    /// Detector response; higher survives the keypoint cap.
    pub score: u32,
}

/// Keypoint/descriptor set for one frame.
///
/// Opaque to the stitching engine: it only ever hands the set to the matching
/// capability, never inspects descriptors itself.
#[derive(Debug, Clone, Default)]
pub struct FrameFeatures {
    pub keypoints: Vec<KeyPoint>,
    /// One descriptor per keypoint, all the same length.
    pub descriptors: Vec<Vec<u8>>,
}

impl FrameFeatures {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Feature-extraction capability.
pub trait FeatureExtractor: Send {
    fn extract(&self, image: &GrayImage) -> FrameFeatures;
}

/// Default extractor: FAST-style corners + BRIEF-style descriptors.
pub struct BriefExtractor {
    config: FeatureConfig,
    pattern: BriefPattern,
}

impl BriefExtractor {
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            config: config.clone(),
            pattern: BriefPattern::new(config.descriptor_bytes, config.pattern_seed),
        }
    }
}

impl FeatureExtractor for BriefExtractor {
    fn extract(&self, image: &GrayImage) -> FrameFeatures {
        let keypoints = fast::detect(
            image,
            self.config.fast_threshold,
            self.config.max_keypoints,
        );
        let descriptors = keypoints
            .iter()
            .map(|kp| self.pattern.compute(image, kp))
            .collect();
        FrameFeatures {
            keypoints,
            descriptors,
        }
    }
}
