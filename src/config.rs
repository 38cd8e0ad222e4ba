//! Configuration loading for ChitraMosaic

use std::path::Path;

use serde::Deserialize;

use crate::error::{MosaicError, Result};

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MosaicConfig {
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Position sampler settings
#[derive(Clone, Debug, Deserialize)]
pub struct SamplerConfig {
    /// Poll interval for the stage position in milliseconds (default: 200)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// XY displacement in stage units that triggers a capture (default: 800.0)
    #[serde(default = "default_capture_distance")]
    pub capture_distance: f32,

    /// Request the camera's cheap low-resolution path (default: true)
    #[serde(default = "default_low_resolution")]
    pub low_resolution: bool,
}

/// Frame queue settings
///
/// With no capacity the queue is unbounded and a push never blocks; captures
/// arriving faster than stitching then accumulate without limit. Setting a
/// capacity makes the overflow policy take effect.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct QueueConfig {
    /// Maximum queued frames; absent means unbounded
    #[serde(default)]
    pub capacity: Option<usize>,

    /// What a full queue does to a push (default: block)
    #[serde(default)]
    pub policy: OverflowPolicy,
}

/// Behavior of a push against a full bounded queue
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Block the producer until the consumer catches up
    #[default]
    Block,
    /// Discard the oldest unprocessed frame and enqueue the new one
    DropOldest,
}

/// Stitching engine settings
#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    /// Anchor candidates fetched per incoming frame (default: 3)
    #[serde(default = "default_nearby_anchors")]
    pub nearby_anchors: usize,

    /// Canvas blend policy in overlap regions (default: overwrite)
    #[serde(default)]
    pub blend: BlendPolicy,

    #[serde(default)]
    pub features: FeatureConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub estimation: EstimationConfig,
}

/// How overlapping pixels are combined during placement
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendPolicy {
    /// New frame pixels replace existing canvas content
    #[default]
    Overwrite,
    /// Average against existing canvas content inside the overlap
    Feather,
}

/// Feature extraction settings
#[derive(Clone, Debug, Deserialize)]
pub struct FeatureConfig {
    /// Corner detector contrast threshold (default: 20)
    #[serde(default = "default_fast_threshold")]
    pub fast_threshold: u8,

    /// Strongest keypoints kept per frame (default: 500)
    #[serde(default = "default_max_keypoints")]
    pub max_keypoints: usize,

    /// Descriptor length in bytes (default: 32)
    #[serde(default = "default_descriptor_bytes")]
    pub descriptor_bytes: usize,

    /// Seed for the descriptor sampling pattern; must be identical for every
    /// frame that is ever compared (default: 42)
    #[serde(default = "default_pattern_seed")]
    pub pattern_seed: u64,
}

/// Pairwise matching settings
#[derive(Clone, Debug, Deserialize)]
pub struct MatchingConfig {
    /// Lowe ratio for best-vs-second-best filtering (default: 0.75)
    #[serde(default = "default_match_ratio")]
    pub ratio: f32,

    /// Require the match to hold in both directions (default: true)
    #[serde(default = "default_cross_check")]
    pub cross_check: bool,

    /// Minimum correspondences for a pair to count at all (default: 12)
    #[serde(default = "default_min_matches")]
    pub min_matches: usize,
}

/// Pose estimation and bundle adjustment settings
#[derive(Clone, Debug, Deserialize)]
pub struct EstimationConfig {
    /// Residual bound in pixels for a correspondence to count as an inlier
    /// (default: 3.0)
    #[serde(default = "default_inlier_threshold_px")]
    pub inlier_threshold_px: f32,

    /// Minimum inliers for a pairwise shift constraint (default: 8)
    #[serde(default = "default_min_inliers")]
    pub min_inliers: usize,

    /// Maximum bundle adjustment iterations (default: 25)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Convergence threshold on the update norm (default: 1e-6)
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,
}

/// Output configuration
#[derive(Clone, Debug, Deserialize)]
pub struct ExportConfig {
    /// Path the composite PNG is published to after every placement
    #[serde(default = "default_map_path")]
    pub map_path: String,
}

// Default value functions
fn default_poll_interval_ms() -> u64 {
    200
}
fn default_capture_distance() -> f32 {
    800.0
}
fn default_low_resolution() -> bool {
    true
}
fn default_nearby_anchors() -> usize {
    3
}
fn default_fast_threshold() -> u8 {
    20
}
fn default_max_keypoints() -> usize {
    500
}
fn default_descriptor_bytes() -> usize {
    32
}
fn default_pattern_seed() -> u64 {
    42
}
fn default_match_ratio() -> f32 {
    0.75
}
fn default_cross_check() -> bool {
    true
}
fn default_min_matches() -> usize {
    12
}
fn default_inlier_threshold_px() -> f32 {
    3.0
}
fn default_min_inliers() -> usize {
    8
}
fn default_max_iterations() -> u32 {
    25
}
fn default_convergence_threshold() -> f64 {
    1e-6
}
fn default_map_path() -> String {
    "output/mosaic.png".to_string()
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            capture_distance: default_capture_distance(),
            low_resolution: default_low_resolution(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nearby_anchors: default_nearby_anchors(),
            blend: BlendPolicy::default(),
            features: FeatureConfig::default(),
            matching: MatchingConfig::default(),
            estimation: EstimationConfig::default(),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fast_threshold: default_fast_threshold(),
            max_keypoints: default_max_keypoints(),
            descriptor_bytes: default_descriptor_bytes(),
            pattern_seed: default_pattern_seed(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            ratio: default_match_ratio(),
            cross_check: default_cross_check(),
            min_matches: default_min_matches(),
        }
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            inlier_threshold_px: default_inlier_threshold_px(),
            min_inliers: default_min_inliers(),
            max_iterations: default_max_iterations(),
            convergence_threshold: default_convergence_threshold(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            map_path: default_map_path(),
        }
    }
}

impl MosaicConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MosaicError::Config(format!("Failed to read config file: {}", e)))?;
        let config: MosaicConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
