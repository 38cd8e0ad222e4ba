//! FAST-style segment-test corner detection.

use image::GrayImage;

use super::KeyPoint;

// Bresenham circle of radius 3 around the candidate pixel.
const CIRCLE_OFFSETS: [(i32, i32); 12] = [
    (-3, 0),
    (-2, 1),
    (-1, 2),
    (0, 3),
    (1, 2),
    (2, 1),
    (3, 0),
    (2, -1),
    (1, -2),
    (0, -3),
    (-1, -2),
    (-2, -1),
];

// Circle pixels that must all be brighter or all darker than the center.
const SEGMENT_LEN: u32 = 9;

/// Detect corners, strongest first, at most `max_keypoints`.
pub fn detect(image: &GrayImage, threshold: u8, max_keypoints: usize) -> Vec<KeyPoint> {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let mut keypoints = Vec::new();

    if width < 7 || height < 7 {
        return keypoints;
    }

    for y in 3..height - 3 {
        for x in 3..width - 3 {
            let center = image.get_pixel(x as u32, y as u32)[0];

            let mut brighter = 0u32;
            let mut darker = 0u32;
            let mut score = 0u32;

            for &(dx, dy) in &CIRCLE_OFFSETS {
                let val = image.get_pixel((x + dx) as u32, (y + dy) as u32)[0];

                if val > center.saturating_add(threshold) {
                    brighter += 1;
                    score += (val - center) as u32;
                } else if val < center.saturating_sub(threshold) {
                    darker += 1;
                    score += (center - val) as u32;
                }
            }

            if brighter >= SEGMENT_LEN || darker >= SEGMENT_LEN {
                keypoints.push(KeyPoint {
                    x: x as f32,
                    y: y as f32,
                    score,
                });
            }
        }
    }

    keypoints.sort_by(|a, b| b.score.cmp(&a.score));
    keypoints.truncate(max_keypoints);
    keypoints
}
