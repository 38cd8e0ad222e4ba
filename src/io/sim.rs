//! Simulated bench: scripted stage + synthetic specimen camera.
//!
//! Hardware-free driver for development and integration tests. The
//! "specimen" is a procedurally textured plane; the camera crops the region
//! under the current stage position, so two captures taken near each other
//! genuinely overlap and the full matching path is exercised.

use std::sync::{Arc, Mutex};

use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::types::StagePosition;
use crate::error::{MosaicError, Result};

use super::stage::{CameraLink, StageLink};

/// Simulation parameters.
#[derive(Clone, Debug)]
pub struct SimBenchConfig {
    /// Specimen texture extent in pixels
    pub specimen_size: (u32, u32),
    /// Captured frame extent in pixels
    pub frame_size: (u32, u32),
    /// Stage units per specimen pixel
    pub units_per_pixel: f32,
    /// Texture RNG seed
    pub seed: u64,
}

impl Default for SimBenchConfig {
    fn default() -> Self {
        Self {
            specimen_size: (400, 400),
            frame_size: (160, 120),
            units_per_pixel: 4.0,
            seed: 7,
        }
    }
}

struct SimShared {
    specimen: GrayImage,
    position: Mutex<StagePosition>,
    config: SimBenchConfig,
}

/// The bench itself; hands out linked stage and camera endpoints.
pub struct SimBench {
    shared: Arc<SimShared>,
}

impl SimBench {
    pub fn new(config: SimBenchConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let (w, h) = config.specimen_size;
        let specimen = GrayImage::from_fn(w, h, |_, _| Luma([rng.gen_range(0u8..=255u8)]));

        Self {
            shared: Arc::new(SimShared {
                specimen,
                position: Mutex::new(StagePosition::default()),
                config,
            }),
        }
    }

    /// Stage and camera endpoints sharing this bench. The stage walks the
    /// given waypoints one `position()` call at a time and then parks on the
    /// last one.
    pub fn links(&self, path: Vec<StagePosition>) -> (SimStage, SimCamera) {
        (
            SimStage {
                shared: self.shared.clone(),
                path,
                step: 0,
            },
            SimCamera {
                shared: self.shared.clone(),
            },
        )
    }

    /// A serpentine scan path covering the specimen, `step_units` apart.
    /// Non-positive spacing yields an empty path.
    pub fn raster_path(&self, step_units: f32, rows: u32) -> Vec<StagePosition> {
        if step_units <= 0.0 {
            return Vec::new();
        }
        let config = &self.shared.config;
        let (spec_w, spec_h) = config.specimen_size;
        let (frame_w, frame_h) = config.frame_size;
        let max_x = (spec_w.saturating_sub(frame_w)) as f32 * config.units_per_pixel;
        let max_y = (spec_h.saturating_sub(frame_h)) as f32 * config.units_per_pixel;

        let mut path = Vec::new();
        let row_spacing = if rows > 1 { max_y / (rows - 1) as f32 } else { 0.0 };
        for row in 0..rows {
            let y = row as f32 * row_spacing;
            let mut xs: Vec<f32> = Vec::new();
            let mut x = 0.0;
            while x <= max_x {
                xs.push(x);
                x += step_units;
            }
            if row % 2 == 1 {
                xs.reverse();
            }
            for x in xs {
                path.push(StagePosition::new(x, y, 0.0));
            }
        }
        path
    }
}

/// Scripted stage endpoint.
pub struct SimStage {
    shared: Arc<SimShared>,
    path: Vec<StagePosition>,
    step: usize,
}

impl StageLink for SimStage {
    fn position(&mut self) -> Result<StagePosition> {
        if self.path.is_empty() {
            return Err(MosaicError::Stage("empty scan path".to_string()));
        }
        let index = self.step.min(self.path.len() - 1);
        let position = self.path[index];
        self.step += 1;

        if let Ok(mut current) = self.shared.position.lock() {
            *current = position;
        }
        Ok(position)
    }
}

/// Camera endpoint cropping the specimen under the stage.
pub struct SimCamera {
    shared: Arc<SimShared>,
}

impl CameraLink for SimCamera {
    fn capture(&mut self, _low_resolution: bool) -> Result<GrayImage> {
        let position = self
            .shared
            .position
            .lock()
            .map(|p| *p)
            .map_err(|_| MosaicError::Camera("bench position poisoned".to_string()))?;

        let config = &self.shared.config;
        let (spec_w, spec_h) = config.specimen_size;
        let (frame_w, frame_h) = config.frame_size;

        let origin_x = (position.x / config.units_per_pixel).round() as i64;
        let origin_y = (position.y / config.units_per_pixel).round() as i64;

        // Clamp so the view never leaves the specimen.
        let origin_x = origin_x.clamp(0, (spec_w.saturating_sub(frame_w)) as i64) as u32;
        let origin_y = origin_y.clamp(0, (spec_h.saturating_sub(frame_h)) as i64) as u32;

        let frame = GrayImage::from_fn(frame_w, frame_h, |x, y| {
            *self.shared.specimen.get_pixel(origin_x + x, origin_y + y)
        });
        Ok(frame)
    }
}
