// Variant Forest
// Copyright (C) 2023 Krzysztof Piwoński <piwonski.kris@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Single-worker, level-synchronous tree trainer.
//!
//! Grounded on `original_source/cpp/forest_trainer.h`'s `train_tree_recursive`,
//! restructured breadth-first: the whole frontier at a depth is processed as
//! one batch before any child is visited, never recursing across depths.
//! This is what lets [`crate::coordinator`]
//! intercept the batch at each of its three stages without touching this
//! module's control flow.

use crate::error::{Result, TrainError};
use crate::node_map::TreeNodeMap;
use crate::rng::Rng;
use crate::split::{SplitPoint, SplitStatistics};
use crate::statistics::Statistics;
use crate::tree::Tree;
use crate::weak_learner::WeakLearner;

/// A frontier node's sample shard, expressed as a half-open range into the
/// trainer's sample buffer: no copying, just a contiguous sub-range produced
/// by in-place partitioning.
pub type SampleRange = (usize, usize);

/// Grows one tree one depth level at a time.
///
/// Holds no per-tree state itself; the tree, sample buffer, and node ranges
/// are threaded through explicitly by the caller (the forest driver or the
/// distributed coordinator), so a single `LevelTrainer` can train many trees.
pub struct LevelTrainer<'a, WL: WeakLearner> {
    weak_learner: &'a WL,
    minimum_num_of_samples: u64,
    minimum_information_gain: f64,
}

impl<'a, WL: WeakLearner> LevelTrainer<'a, WL> {
    pub fn new(weak_learner: &'a WL, minimum_num_of_samples: u64, minimum_information_gain: f64) -> Self {
        LevelTrainer { weak_learner, minimum_num_of_samples, minimum_information_gain }
    }

    /// The root's sample range: the whole shard.
    pub fn initial_ranges(&self, num_samples: usize) -> TreeNodeMap<SampleRange> {
        let mut ranges = TreeNodeMap::empty();
        ranges.insert(0, (0, num_samples));
        ranges
    }

    /// Nodes at `depth` that are still `Unvisited` and have a sample range
    /// waiting. A node with no range was either never reached
    /// (its parent hasn't resolved yet) or already resolved to a leaf.
    pub fn frontier(&self, tree: &Tree<WL::Payload>, ranges: &TreeNodeMap<SampleRange>, depth: usize) -> Vec<usize> {
        tree.indices_at_depth(depth).into_iter().filter(|&index| ranges.contains(index)).collect()
    }

    /// (A) Per-node statistics over this worker's shard (interception
    /// point A; in the single-shard case the "merge" is a no-op over one
    /// shard).
    pub fn compute_statistics_batch(
        &self,
        samples: &[WL::Sample],
        ranges: &TreeNodeMap<SampleRange>,
        frontier: &[usize],
    ) -> TreeNodeMap<Statistics> {
        frontier
            .iter()
            .map(|&node| {
                let (lo, hi) = *ranges.get(node).expect("frontier node missing its sample range");
                (node, self.weak_learner.compute_statistics(&samples[lo..hi]))
            })
            .collect()
    }

    /// Splits the frontier by the merged (global, in the distributed case)
    /// sample count. Using the *statistics'* count rather than
    /// the local range length is what makes this check correct when a
    /// worker's local shard is small but the merged global count is not;
    /// point A happens before this split.
    pub fn partition_by_sample_count(&self, frontier: &[usize], statistics: &TreeNodeMap<Statistics>) -> (Vec<usize>, Vec<usize>) {
        let mut active = Vec::new();
        let mut starved = Vec::new();
        for &node in frontier {
            let stats = statistics.get(node).expect("missing statistics for frontier node");
            if stats.num_of_samples() < self.minimum_num_of_samples {
                starved.push(node);
            } else {
                active.push(node);
            }
        }
        (active, starved)
    }

    /// (B) Candidate split points, drawn from this worker's shard. In the
    /// distributed coordinator only rank 0 ever calls this (interception
    /// point B); here, in the single-worker baseline, the one worker always
    /// does.
    pub fn sample_split_points_batch(
        &self,
        samples: &[WL::Sample],
        ranges: &TreeNodeMap<SampleRange>,
        active: &[usize],
        rng: &mut Rng,
    ) -> TreeNodeMap<Vec<SplitPoint<WL::Payload>>> {
        active
            .iter()
            .map(|&node| {
                let (lo, hi) = *ranges.get(node).expect("active node missing its sample range");
                (node, self.weak_learner.sample_split_points(&samples[lo..hi], rng))
            })
            .collect()
    }

    /// (C) Per-candidate split statistics over this worker's shard. Returns
    /// `TrainError::Shape` if the weak learner's `SplitStatistics` length
    /// disagrees with the candidate list it was given for any node.
    pub fn compute_split_statistics_batch(
        &self,
        samples: &[WL::Sample],
        ranges: &TreeNodeMap<SampleRange>,
        candidates: &TreeNodeMap<Vec<SplitPoint<WL::Payload>>>,
    ) -> Result<TreeNodeMap<SplitStatistics>> {
        candidates
            .iter()
            .map(|(node, splits)| {
                let (lo, hi) = *ranges.get(node).expect("candidate node missing its sample range");
                let stats = self.weak_learner.compute_split_statistics(&samples[lo..hi], splits);
                if stats.len() != splits.len() {
                    return Err(TrainError::Shape { expected: splits.len(), got: stats.len() });
                }
                Ok((node, stats))
            })
            .collect()
    }

    /// Marks every starved node a leaf.
    pub fn resolve_starved(&self, tree: &mut Tree<WL::Payload>, ranges: &mut TreeNodeMap<SampleRange>, starved: &[usize], statistics: &TreeNodeMap<Statistics>) {
        for &node in starved {
            let stats = statistics.get(node).expect("missing statistics for starved node").clone();
            log::debug!("node {node} leaf: {} samples below minimum {}", stats.num_of_samples(), self.minimum_num_of_samples);
            tree.set_statistics(node, stats);
            tree.set_leaf(node);
            ranges.erase(node);
        }
    }

    /// Decides every active node's fate from its (possibly merged) statistics
    /// and split statistics, and partitions its local shard in place when it
    /// becomes internal. Every worker reaches the same
    /// decision here because, after the distributed coordinator's gather/
    /// broadcast, the inputs are identical everywhere.
    pub fn resolve_active(
        &self,
        tree: &mut Tree<WL::Payload>,
        samples: &mut [WL::Sample],
        ranges: &mut TreeNodeMap<SampleRange>,
        active: &[usize],
        statistics: &TreeNodeMap<Statistics>,
        candidates: &TreeNodeMap<Vec<SplitPoint<WL::Payload>>>,
        split_statistics: &TreeNodeMap<SplitStatistics>,
    ) {
        for &node in active {
            let stats = statistics.get(node).expect("missing statistics for active node").clone();
            tree.set_statistics(node, stats.clone());

            let splits = candidates.get(node).expect("missing candidates for active node");
            let split_stats = split_statistics.get(node).expect("missing split statistics for active node");

            if splits.is_empty() {
                log::debug!("node {node} leaf: weak learner offered no candidates");
                tree.set_leaf(node);
                ranges.erase(node);
                continue;
            }

            let (best_index, gain) = self.weak_learner.find_best_split(&stats, split_stats);
            let left_count = split_stats.left(best_index).num_of_samples();
            let right_count = split_stats.right(best_index).num_of_samples();

            if gain < self.minimum_information_gain || left_count == 0 || right_count == 0 {
                log::debug!("node {node} leaf: best gain {gain:.6} (threshold {:.6})", self.minimum_information_gain);
                tree.set_leaf(node);
                ranges.erase(node);
                continue;
            }

            let (lo, hi) = *ranges.get(node).expect("active node missing its sample range");
            let split = splits[best_index].clone();
            let pivot = lo + self.weak_learner.partition(&mut samples[lo..hi], &split);

            let left_child = tree.left_child(node);
            let right_child = tree.right_child(node);
            tree.set_split(node, split);
            ranges.erase(node);
            ranges.insert(left_child, (lo, pivot));
            ranges.insert(right_child, (pivot, hi));
            log::debug!("node {node} internal: split {best_index}, gain {gain:.6}, left [{lo},{pivot}), right [{pivot},{hi})");
        }
    }

    /// Runs one full depth level against a local (single-worker) shard: the
    /// composition of every step above, with no gather/broadcast in between.
    /// Returns the frontier it processed, so the caller can early-exit once
    /// it comes back empty.
    pub fn train_level(
        &self,
        tree: &mut Tree<WL::Payload>,
        samples: &mut [WL::Sample],
        ranges: &mut TreeNodeMap<SampleRange>,
        depth: usize,
        rng: &mut Rng,
    ) -> Result<Vec<usize>> {
        let frontier = self.frontier(tree, ranges, depth);
        if frontier.is_empty() {
            return Ok(frontier);
        }
        log::debug!("depth {depth}: frontier of {} nodes", frontier.len());

        let statistics = self.compute_statistics_batch(samples, ranges, &frontier);
        let (active, starved) = self.partition_by_sample_count(&frontier, &statistics);
        self.resolve_starved(tree, ranges, &starved, &statistics);

        let candidates = self.sample_split_points_batch(samples, ranges, &active, rng);
        let split_statistics = self.compute_split_statistics_batch(samples, ranges, &candidates)?;
        self.resolve_active(tree, samples, ranges, &active, &statistics, &candidates, &split_statistics);

        Ok(frontier)
    }
}
