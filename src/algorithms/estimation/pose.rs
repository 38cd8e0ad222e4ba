//! Initial translation estimation from pairwise matches.
//!
//! Each matched pair yields one shift constraint: the median correspondence
//! offset, re-averaged over its inliers. A breadth-first walk from the new
//! frame then chains constraints into absolute shifts; candidates the walk
//! cannot reach stay unsolved.

use std::collections::VecDeque;

use crate::config::EstimationConfig;

use super::super::features::FrameFeatures;
use super::super::matching::PairMatches;
use super::{CameraShift, PoseEstimate, PoseEstimator, ShiftConstraint, SolveError};

/// Default estimator: robust median offset per pair + connectivity walk.
pub struct TranslationEstimator {
    config: EstimationConfig,
}

impl TranslationEstimator {
    pub fn new(config: &EstimationConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Robust shift of `b` relative to `a`, or `None` below the inlier floor.
    fn pair_constraint(
        &self,
        set: &[&FrameFeatures],
        matches: &PairMatches,
    ) -> Option<ShiftConstraint> {
        let a_kps = &set[matches.a].keypoints;
        let b_kps = &set[matches.b].keypoints;

        // Offsets p_a - p_b: where b's origin sits relative to a's.
        let mut dxs: Vec<f64> = Vec::with_capacity(matches.pairs.len());
        let mut dys: Vec<f64> = Vec::with_capacity(matches.pairs.len());
        for &(ia, ib) in &matches.pairs {
            dxs.push((a_kps[ia].x - b_kps[ib].x) as f64);
            dys.push((a_kps[ia].y - b_kps[ib].y) as f64);
        }

        let med_x = median(&mut dxs.clone());
        let med_y = median(&mut dys.clone());

        // Keep correspondences near the median, then refine with their mean.
        let threshold = self.config.inlier_threshold_px as f64;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut inliers = 0usize;
        for (dx, dy) in dxs.iter().zip(dys.iter()) {
            let rx = dx - med_x;
            let ry = dy - med_y;
            if (rx * rx + ry * ry).sqrt() <= threshold {
                sum_x += dx;
                sum_y += dy;
                inliers += 1;
            }
        }

        if inliers < self.config.min_inliers {
            return None;
        }

        Some(ShiftConstraint {
            a: matches.a,
            b: matches.b,
            dx: sum_x / inliers as f64,
            dy: sum_y / inliers as f64,
            inliers,
        })
    }
}

impl PoseEstimator for TranslationEstimator {
    fn estimate(
        &self,
        set: &[&FrameFeatures],
        matches: &[PairMatches],
    ) -> Result<PoseEstimate, SolveError> {
        let constraints: Vec<ShiftConstraint> = matches
            .iter()
            .filter_map(|m| self.pair_constraint(set, m))
            .collect();

        if constraints.is_empty() {
            return Err(SolveError::NoConstraints);
        }

        // Chain constraints outward from the new frame (index 0, gauge).
        let mut shifts: Vec<Option<CameraShift>> = vec![None; set.len()];
        shifts[0] = Some(CameraShift::default());

        let mut frontier = VecDeque::from([0usize]);
        while let Some(node) = frontier.pop_front() {
            let base = shifts[node].unwrap_or_default();
            for c in &constraints {
                let (next, dx, dy) = if c.a == node {
                    (c.b, c.dx, c.dy)
                } else if c.b == node {
                    (c.a, -c.dx, -c.dy)
                } else {
                    continue;
                };
                if shifts[next].is_none() {
                    shifts[next] = Some(CameraShift::new(base.dx + dx, base.dy + dy));
                    frontier.push_back(next);
                }
            }
        }

        // At least one anchor must be reachable for placement to make sense.
        if !shifts.iter().skip(1).any(|s| s.is_some()) {
            return Err(SolveError::Disconnected);
        }

        Ok(PoseEstimate {
            shifts,
            constraints,
        })
    }
}

/// Median of a mutable slice; mean of the middle two for even lengths.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::features::KeyPoint;

    fn features_at(points: &[(f32, f32)]) -> FrameFeatures {
        FrameFeatures {
            keypoints: points
                .iter()
                .map(|&(x, y)| KeyPoint { x, y, score: 0 })
                .collect(),
            descriptors: points.iter().map(|_| vec![0u8]).collect(),
        }
    }

    fn config() -> EstimationConfig {
        EstimationConfig {
            min_inliers: 3,
            ..EstimationConfig::default()
        }
    }

    /// Ten true correspondences shifted by (40, -10) plus one gross outlier.
    #[test]
    fn test_recovers_shift_despite_outlier() {
        let a_pts: Vec<(f32, f32)> = (0..10).map(|i| (50.0 + i as f32 * 7.0, 30.0)).collect();
        let mut b_pts: Vec<(f32, f32)> = a_pts.iter().map(|&(x, y)| (x - 40.0, y + 10.0)).collect();
        b_pts.push((500.0, 500.0));
        let mut a_pts = a_pts;
        a_pts.push((0.0, 0.0)); // pairs with the outlier

        let a = features_at(&a_pts);
        let b = features_at(&b_pts);
        let matches = PairMatches {
            a: 0,
            b: 1,
            pairs: (0..11).map(|i| (i, i)).collect(),
        };

        let estimator = TranslationEstimator::new(&config());
        let estimate = estimator.estimate(&[&a, &b], &[matches]).unwrap();

        let shift = estimate.shifts[1].unwrap();
        assert!((shift.dx - 40.0).abs() < 1e-6);
        assert!((shift.dy + 10.0).abs() < 1e-6);
        assert_eq!(estimate.constraints[0].inliers, 10);
    }

    /// A constraint between two anchors only, with no path to the frame.
    #[test]
    fn test_disconnected_frame_fails() {
        let a = features_at(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let b = features_at(&[(1.0, 0.0), (11.0, 0.0), (21.0, 0.0)]);
        let matches = PairMatches {
            a: 1,
            b: 2,
            pairs: vec![(0, 0), (1, 1), (2, 2)],
        };

        let estimator = TranslationEstimator::new(&config());
        let empty = features_at(&[]);
        let result = estimator.estimate(&[&empty, &a, &b], &[matches]);
        assert_eq!(result.unwrap_err(), SolveError::Disconnected);
    }

    #[test]
    fn test_too_few_inliers_is_no_constraint() {
        let a = features_at(&[(0.0, 0.0), (10.0, 0.0)]);
        let b = features_at(&[(5.0, 0.0), (15.0, 0.0)]);
        let matches = PairMatches {
            a: 0,
            b: 1,
            pairs: vec![(0, 0), (1, 1)],
        };

        let estimator = TranslationEstimator::new(&config());
        let result = estimator.estimate(&[&a, &b], &[matches]);
        assert_eq!(result.unwrap_err(), SolveError::NoConstraints);
    }

    /// Shifts chain across an intermediate anchor.
    #[test]
    fn test_chains_through_intermediate() {
        let f = features_at(&[(10.0, 10.0), (20.0, 10.0), (30.0, 10.0)]);
        let a1 = features_at(&[(0.0, 10.0), (10.0, 10.0), (20.0, 10.0)]);
        let a2 = features_at(&[(0.0, 5.0), (10.0, 5.0), (20.0, 5.0)]);

        let m01 = PairMatches {
            a: 0,
            b: 1,
            pairs: vec![(0, 0), (1, 1), (2, 2)],
        };
        let m12 = PairMatches {
            a: 1,
            b: 2,
            pairs: vec![(0, 0), (1, 1), (2, 2)],
        };

        let estimator = TranslationEstimator::new(&config());
        let estimate = estimator.estimate(&[&f, &a1, &a2], &[m01, m12]).unwrap();

        let s1 = estimate.shifts[1].unwrap();
        let s2 = estimate.shifts[2].unwrap();
        // a1 sits 10px left of the frame, a2 another (0, 5) off a1.
        assert!((s1.dx - 10.0).abs() < 1e-6 && s1.dy.abs() < 1e-6);
        assert!((s2.dx - 10.0).abs() < 1e-6 && (s2.dy - 5.0).abs() < 1e-6);
    }
}
