//! Pairwise descriptor matching across a stitch candidate set.

use crate::config::MatchingConfig;

use super::features::FrameFeatures;

/// Correspondences between two images of the candidate set.
#[derive(Debug, Clone)]
pub struct PairMatches {
    /// Index of the first image in the candidate set
    pub a: usize,
    /// Index of the second image in the candidate set
    pub b: usize,
    /// (keypoint index in `a`, keypoint index in `b`) pairs
    pub pairs: Vec<(usize, usize)>,
}

/// Pairwise-matching capability.
///
/// Index 0 of the candidate set is the incoming frame, the rest are anchor
/// records. Pairs with fewer correspondences than the configured floor are
/// omitted from the result.
pub trait PairwiseMatcher: Send {
    fn match_set(&self, set: &[&FrameFeatures]) -> Vec<PairMatches>;
}

/// Default matcher: brute-force Hamming with ratio test and cross-check.
pub struct HammingMatcher {
    config: MatchingConfig,
}

impl HammingMatcher {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn match_pair(&self, query: &FrameFeatures, train: &FrameFeatures) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();

        for (qi, q_desc) in query.descriptors.iter().enumerate() {
            let mut best: Option<(usize, u32)> = None;
            let mut second_best: Option<u32> = None;

            for (ti, t_desc) in train.descriptors.iter().enumerate() {
                let distance = hamming(q_desc, t_desc);

                match best {
                    None => best = Some((ti, distance)),
                    Some((_, best_dist)) => {
                        if distance < best_dist {
                            second_best = Some(best_dist);
                            best = Some((ti, distance));
                        } else if second_best.is_none_or(|s| distance < s) {
                            second_best = Some(distance);
                        }
                    }
                }
            }

            let Some((ti, distance)) = best else {
                continue;
            };

            if let Some(second) = second_best {
                if distance as f32 >= self.config.ratio * second as f32 {
                    continue;
                }
            }

            if self.config.cross_check && best_in(query, &train.descriptors[ti]) != Some(qi) {
                continue;
            }

            pairs.push((qi, ti));
        }

        pairs
    }
}

impl PairwiseMatcher for HammingMatcher {
    fn match_set(&self, set: &[&FrameFeatures]) -> Vec<PairMatches> {
        let mut result = Vec::new();

        for a in 0..set.len() {
            for b in a + 1..set.len() {
                let pairs = self.match_pair(set[a], set[b]);
                if pairs.len() >= self.config.min_matches {
                    result.push(PairMatches { a, b, pairs });
                }
            }
        }

        result
    }
}

/// Index of the descriptor in `features` closest to `desc`.
fn best_in(features: &FrameFeatures, desc: &[u8]) -> Option<usize> {
    features
        .descriptors
        .iter()
        .enumerate()
        .min_by_key(|(_, d)| hamming(d, desc))
        .map(|(i, _)| i)
}

#[inline]
fn hamming(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::features::KeyPoint;

    fn features_from(descriptors: Vec<Vec<u8>>) -> FrameFeatures {
        let keypoints = descriptors
            .iter()
            .enumerate()
            .map(|(i, _)| KeyPoint {
                x: i as f32,
                y: 0.0,
                score: 0,
            })
            .collect();
        FrameFeatures {
            keypoints,
            descriptors,
        }
    }

    fn config(min_matches: usize) -> MatchingConfig {
        MatchingConfig {
            min_matches,
            ..MatchingConfig::default()
        }
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming(&[0x00], &[0xFF]), 8);
        assert_eq!(hamming(&[0b1010], &[0b1010]), 0);
        assert_eq!(hamming(&[0b1010, 0x01], &[0b0101, 0x01]), 4);
    }

    #[test]
    fn test_distinct_descriptors_match_one_to_one() {
        let a = features_from(vec![vec![0x00, 0x00], vec![0xFF, 0xFF], vec![0x0F, 0x0F]]);
        let b = features_from(vec![vec![0xFF, 0xFF], vec![0x0F, 0x0F], vec![0x00, 0x00]]);

        let matcher = HammingMatcher::new(&config(1));
        let result = matcher.match_set(&[&a, &b]);

        assert_eq!(result.len(), 1);
        let mut pairs = result[0].pairs.clone();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 2), (1, 0), (2, 1)]);
    }

    #[test]
    fn test_ratio_test_rejects_ambiguous() {
        // Both train descriptors are equidistant from the query.
        let a = features_from(vec![vec![0b0000_0011]]);
        let b = features_from(vec![vec![0b0000_0001], vec![0b0000_0010]]);

        let matcher = HammingMatcher::new(&config(1));
        assert!(matcher.match_set(&[&a, &b]).is_empty());
    }

    #[test]
    fn test_min_matches_floor() {
        let a = features_from(vec![vec![0x00], vec![0xFF]]);
        let b = features_from(vec![vec![0x00], vec![0xFF]]);

        let matcher = HammingMatcher::new(&config(3));
        assert!(matcher.match_set(&[&a, &b]).is_empty());
    }
}
