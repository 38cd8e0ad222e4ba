//! Spatial anchor lookup over placed frames.

use kiddo::{KdTree, SquaredEuclidean};

use crate::algorithms::features::FrameFeatures;
use crate::core::types::{PixelCorner, StagePosition};

/// A placed frame's registration record.
///
/// Created by the stitching engine when a frame is seeded or placed; never
/// mutated afterwards. Records accumulate for the process lifetime, there is
/// no eviction.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    /// Keypoints and descriptors of the placed frame
    pub features: FrameFeatures,
    /// Top-left corner in composite space
    pub corner: PixelCorner,
    /// Frame extent as (height, width)
    pub frame_size: (u32, u32),
    /// Stage position the frame was captured at, used for spatial queries
    pub world: StagePosition,
}

/// Nearest-neighbour index over anchors' world coordinates.
///
/// The k-d tree is maintained incrementally: every record is added on push,
/// and queries skip the tree entirely while the collection is smaller than
/// the requested count.
pub struct AnchorIndex {
    records: Vec<FeatureRecord>,
    tree: KdTree<f32, 2>,
}

impl AnchorIndex {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            tree: KdTree::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a placed frame.
    pub fn push(&mut self, record: FeatureRecord) {
        let index = self.records.len() as u64;
        self.tree.add(&record.world.xy(), index);
        self.records.push(record);
    }

    /// Up to `k` anchors nearest to `world` on the XY plane.
    ///
    /// Fewer than `k` records exist: all of them, in insertion order.
    /// Otherwise exactly the `k` closest by Euclidean distance, ties broken
    /// by lowest insertion index. Callers must tolerate an empty result.
    pub fn nearby(&self, world: &StagePosition, k: usize) -> Vec<&FeatureRecord> {
        if self.records.len() < k {
            return self.records.iter().collect();
        }

        let mut hits = self.tree.nearest_n::<SquaredEuclidean>(&world.xy(), k);
        hits.sort_by(|p, q| {
            p.distance
                .partial_cmp(&q.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(p.item.cmp(&q.item))
        });
        hits.iter()
            .map(|hit| &self.records[hit.item as usize])
            .collect()
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }
}

impl Default for AnchorIndex {
    fn default() -> Self {
        Self::new()
    }
}
