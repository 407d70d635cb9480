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

//! Distributed coordinator: wraps [`LevelTrainer`] with the
//! gather-merge-broadcast protocol at interception points (A) node
//! statistics, (B) candidate split points, (C) split statistics, plus (D) a
//! full tree broadcast at the end of the level.
//!
//! Grounded directly on `original_source/cpp/distributed_forest_trainer.h`'s
//! `exchange_statistics_batch` / `sample_split_points_batch` /
//! `exchange_split_statistics_batch` / `broadcast_tree` sequence.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::collective::Collective;
use crate::error::Result;
use crate::level_trainer::{LevelTrainer, SampleRange};
use crate::node_map::TreeNodeMap;
use crate::rng::Rng;
use crate::sample::Sample;
use crate::split::{SplitPoint, SplitStatistics};
use crate::statistics::Statistics;
use crate::tree::Tree;
use crate::weak_learner::WeakLearner;

fn merge_statistics(gathered: &[TreeNodeMap<Statistics>]) -> TreeNodeMap<Statistics> {
    TreeNodeMap::merge_all(gathered, |a, b| {
        let mut merged = a.clone();
        merged.accumulate(b);
        merged
    })
}

fn merge_split_statistics(gathered: &[TreeNodeMap<SplitStatistics>]) -> TreeNodeMap<SplitStatistics> {
    TreeNodeMap::merge_all(gathered, |a, b| {
        let mut merged = a.clone();
        merged.accumulate(b);
        merged
    })
}

/// Coordinates one [`LevelTrainer`] per worker across a [`Collective`] group,
/// guaranteeing that every worker's `Tree` is bytewise equal after each level.
pub struct DistributedCoordinator<'a, WL: WeakLearner, C: Collective> {
    level_trainer: LevelTrainer<'a, WL>,
    collective: C,
    root: usize,
}

impl<'a, WL, C> DistributedCoordinator<'a, WL, C>
where
    WL: WeakLearner,
    WL::Sample: Sample,
    WL::Payload: Serialize + DeserializeOwned,
    C: Collective,
{
    pub fn new(weak_learner: &'a WL, minimum_num_of_samples: u64, minimum_information_gain: f64, collective: C) -> Self {
        DistributedCoordinator { level_trainer: LevelTrainer::new(weak_learner, minimum_num_of_samples, minimum_information_gain), collective, root: 0 }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.collective.rank()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.collective.size()
    }

    /// The root's sample range over this worker's local shard; each
    /// worker owns a disjoint shard of the global dataset.
    pub fn initial_ranges(&self, local_shard_len: usize) -> TreeNodeMap<SampleRange> {
        self.level_trainer.initial_ranges(local_shard_len)
    }

    /// Runs one depth level across the whole worker group. `rng` only
    /// matters on rank 0; every rank must call this in lockstep.
    /// Returns the frontier processed, empty on every rank simultaneously
    /// once the tree is fully resolved.
    pub fn train_level(
        &self,
        tree: &mut Tree<WL::Payload>,
        local_samples: &mut [WL::Sample],
        local_ranges: &mut TreeNodeMap<SampleRange>,
        depth: usize,
        rng: &mut Rng,
    ) -> Result<Vec<usize>> {
        let frontier = self.level_trainer.frontier(tree, local_ranges, depth);
        if frontier.is_empty() {
            return Ok(frontier);
        }
        log::debug!("rank {}: depth {depth} frontier of {} nodes", self.rank(), frontier.len());

        // (A) node statistics: local -> gather -> merge on root -> broadcast.
        let local_stats = self.level_trainer.compute_statistics_batch(local_samples, local_ranges, &frontier);
        let gathered_stats = self.collective.gather(local_stats, self.root)?;
        let merged_stats = if self.rank() == self.root {
            log::debug!("rank 0: merged node statistics from {} workers", gathered_stats.len());
            merge_statistics(&gathered_stats)
        } else {
            TreeNodeMap::empty()
        };
        let statistics = self.collective.broadcast(merged_stats, self.root)?;

        let (active, starved) = self.level_trainer.partition_by_sample_count(&frontier, &statistics);
        self.level_trainer.resolve_starved(tree, local_ranges, &starved, &statistics);

        // (B) candidate split points: rank 0 only draws, then broadcasts.
        let local_candidates = if self.rank() == self.root {
            self.level_trainer.sample_split_points_batch(local_samples, local_ranges, &active, rng)
        } else {
            TreeNodeMap::empty()
        };
        let candidates = self.collective.broadcast(local_candidates, self.root)?;

        // (C) split statistics: local -> gather -> merge on root -> broadcast.
        let local_split_stats = self.level_trainer.compute_split_statistics_batch(local_samples, local_ranges, &candidates)?;
        let gathered_split_stats = self.collective.gather(local_split_stats, self.root)?;
        let merged_split_stats = if self.rank() == self.root {
            log::debug!("rank 0: merged split statistics from {} workers", gathered_split_stats.len());
            merge_split_statistics(&gathered_split_stats)
        } else {
            TreeNodeMap::empty()
        };
        let split_statistics = self.collective.broadcast(merged_split_stats, self.root)?;

        // Every worker now holds identical (statistics, candidates,
        // split_statistics) and decides + partitions its own local shard.
        self.level_trainer.resolve_active(tree, local_samples, local_ranges, &active, &statistics, &candidates, &split_statistics);

        // (D) tree broadcast: safety net resynchronizing any state not
        // recomputable from the above.
        *tree = self.collective.broadcast(tree.clone(), self.root)?;

        Ok(frontier)
    }
}
