//! BRIEF-style binary descriptors.
//!
//! The intensity-comparison pattern is drawn once from a seeded RNG; two
//! frames can only be compared when their descriptors come from the same
//! pattern, so the seed is part of [`FeatureConfig`](crate::config::FeatureConfig).

use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::KeyPoint;

const PATCH_SIZE: i32 = 48;

/// Fixed sampling pattern shared by every descriptor computation.
pub struct BriefPattern {
    bytes: usize,
    pairs: Vec<[(i32, i32); 2]>,
}

impl BriefPattern {
    /// Draw a `bytes * 8`-comparison pattern from the given seed.
    pub fn new(bytes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let half = PATCH_SIZE / 2;
        let pairs = (0..bytes * 8)
            .map(|_| {
                [
                    (rng.gen_range(-half..half), rng.gen_range(-half..half)),
                    (rng.gen_range(-half..half), rng.gen_range(-half..half)),
                ]
            })
            .collect();
        Self { bytes, pairs }
    }

    /// Compute the descriptor for one keypoint.
    pub fn compute(&self, image: &GrayImage, kp: &KeyPoint) -> Vec<u8> {
        let x = kp.x as i32;
        let y = kp.y as i32;

        let mut descriptor = vec![0u8; self.bytes];

        for (i, pair) in self.pairs.iter().enumerate() {
            let v1 = pixel_or_zero(image, x + pair[0].0, y + pair[0].1);
            let v2 = pixel_or_zero(image, x + pair[1].0, y + pair[1].1);

            if v1 > v2 {
                descriptor[i / 8] |= 1 << (i % 8);
            }
        }

        descriptor
    }
}

fn pixel_or_zero(image: &GrayImage, x: i32, y: i32) -> u8 {
    if x >= 0 && x < image.width() as i32 && y >= 0 && y < image.height() as i32 {
        image.get_pixel(x as u32, y as u32)[0]
    } else {
        0
    }
}
