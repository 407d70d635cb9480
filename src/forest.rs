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

//! The forest driver and the crate's training-parameters surface.
//!
//! Grounded on `original_source/cpp/forest_trainer.h`'s `train_forest` (the
//! sequential per-tree loop with a per-tree-seeded RNG) and on the teacher's
//! top-level `RandomForest` API shape: a thin driver constructed once and
//! asked to produce a forest, rather than a free function.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::collective::Collective;
use crate::coordinator::DistributedCoordinator;
use crate::error::{Result, TrainError};
use crate::level_trainer::LevelTrainer;
use crate::rng::RngFactory;
use crate::sample::Sample;
use crate::tree::Tree;
use crate::weak_learner::WeakLearner;

/// Training parameters, validated once at construction rather than
/// re-checked on every call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingParameters {
    pub num_of_trees: usize,
    pub tree_depth: usize,
    pub minimum_num_of_samples: u64,
    pub minimum_information_gain: f64,
}

impl TrainingParameters {
    pub fn new(num_of_trees: usize, tree_depth: usize, minimum_num_of_samples: u64, minimum_information_gain: f64) -> Self {
        TrainingParameters { num_of_trees, tree_depth, minimum_num_of_samples, minimum_information_gain }
    }

    /// Returns `TrainError::Configuration` for any parameter outside its
    /// documented constraint. Called by every `ForestTrainer`
    /// constructor so an invalid configuration fails fast, before any tree is
    /// grown.
    pub fn validate(&self) -> Result<()> {
        if self.num_of_trees == 0 {
            return Err(TrainError::Configuration("num_of_trees must be >= 1".to_string()));
        }
        if self.tree_depth == 0 {
            return Err(TrainError::Configuration("tree_depth must be >= 1".to_string()));
        }
        if self.minimum_num_of_samples == 0 {
            return Err(TrainError::Configuration("minimum_num_of_samples must be >= 1".to_string()));
        }
        if self.minimum_information_gain < 0.0 {
            return Err(TrainError::Configuration("minimum_information_gain must be >= 0".to_string()));
        }
        Ok(())
    }
}

/// The only externally visible training artifact: an
/// ordered sequence of trees. `P` is the weak learner's `SplitPoint` payload
/// type.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Forest<P> {
    trees: Vec<Tree<P>>,
}

impl<P> Forest<P> {
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn trees(&self) -> &[Tree<P>] {
        &self.trees
    }

    /// An empty forest condition: every tree present collapsed to a
    /// single root leaf. Not an error; callers check this to decide whether
    /// the model is useless for their purposes.
    pub fn is_degenerate(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(|tree| tree.state_at(0) != crate::tree::NodeState::Internal)
    }
}

impl<P: Clone + Serialize + DeserializeOwned> Forest<P> {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Into::into)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(Into::into)
    }
}

/// Trains `num_of_trees` trees sequentially against a fixed weak learner and
/// parameter set.
pub struct ForestTrainer<'a, WL: WeakLearner> {
    weak_learner: &'a WL,
    params: TrainingParameters,
    rng_factory: RngFactory,
}

impl<'a, WL: WeakLearner> ForestTrainer<'a, WL> {
    pub fn new(weak_learner: &'a WL, params: TrainingParameters, base_seed: u64) -> Result<Self> {
        params.validate()?;
        Ok(ForestTrainer { weak_learner, params, rng_factory: RngFactory::new(base_seed) })
    }

    /// Trains one tree against `samples`, level by level, early-exiting once
    /// the frontier empties.
    fn train_one_tree(&self, samples: &mut [WL::Sample], tree_index: usize) -> Result<Tree<WL::Payload>> {
        let level_trainer = LevelTrainer::new(self.weak_learner, self.params.minimum_num_of_samples, self.params.minimum_information_gain);
        let mut tree = Tree::construct(self.params.tree_depth);
        let mut ranges = level_trainer.initial_ranges(samples.len());
        let mut rng = self.rng_factory.new_rng_for_tree(tree_index);

        for depth in 1..=self.params.tree_depth {
            let frontier = level_trainer
                .train_level(&mut tree, samples, &mut ranges, depth, &mut rng)
                .map_err(|e| TrainError::TreeFailed { tree_index, source: Box::new(e) })?;
            if frontier.is_empty() {
                break;
            }
        }
        Ok(tree)
    }

    /// Trains a full forest on a single worker's complete (unsharded) sample
    /// set. Each tree gets its own copy of `samples` since level training
    /// reorders its shard in place and successive
    /// trees must start from the same logical dataset.
    pub fn train(&self, samples: &[WL::Sample]) -> Result<Forest<WL::Payload>>
    where
        WL::Sample: Clone,
    {
        let mut trees = Vec::with_capacity(self.params.num_of_trees);
        for tree_index in 0..self.params.num_of_trees {
            let mut working_copy = samples.to_vec();
            log::info!("training tree {tree_index}/{}", self.params.num_of_trees);
            trees.push(self.train_one_tree(&mut working_copy, tree_index)?);
        }
        Ok(Forest { trees })
    }
}

impl<'a, WL> ForestTrainer<'a, WL>
where
    WL: WeakLearner,
    WL::Sample: Sample + Clone,
    WL::Payload: Serialize + DeserializeOwned,
{
    /// Trains a full forest distributed across a worker group.
    /// Every rank calls this with its own disjoint shard of the global
    /// dataset and the same `collective`; every rank returns a bytewise
    /// identical `Forest`.
    pub fn train_distributed<C: Collective>(&self, local_shard: &[WL::Sample], collective: C) -> Result<Forest<WL::Payload>> {
        let coordinator = DistributedCoordinator::new(self.weak_learner, self.params.minimum_num_of_samples, self.params.minimum_information_gain, collective);

        let mut trees = Vec::with_capacity(self.params.num_of_trees);
        for tree_index in 0..self.params.num_of_trees {
            let mut working_copy = local_shard.to_vec();
            let mut tree = Tree::construct(self.params.tree_depth);
            let mut ranges = coordinator.initial_ranges(working_copy.len());
            let mut rng = self.rng_factory.new_rng_for_tree(tree_index);

            log::info!("rank {}: training tree {tree_index}/{}", coordinator.rank(), self.params.num_of_trees);
            for depth in 1..=self.params.tree_depth {
                let frontier = coordinator
                    .train_level(&mut tree, &mut working_copy, &mut ranges, depth, &mut rng)
                    .map_err(|e| TrainError::TreeFailed { tree_index, source: Box::new(e) })?;
                if frontier.is_empty() {
                    break;
                }
            }
            trees.push(tree);
        }
        Ok(Forest { trees })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::LabeledSample;
    use crate::tree::NodeState;
    use crate::weak_learner::AxisAlignedWeakLearner;

    fn two_class_samples(n: usize) -> Vec<LabeledSample> {
        (0..n)
            .map(|i| {
                let label = i % 2;
                let x = if label == 0 { i as f64 * 0.01 } else { 10.0 + i as f64 * 0.01 };
                LabeledSample::new(label, vec![x])
            })
            .collect()
    }

    #[test]
    fn validate_rejects_zero_trees_or_depth() {
        assert!(TrainingParameters::new(0, 2, 1, 0.0).validate().is_err());
        assert!(TrainingParameters::new(1, 0, 1, 0.0).validate().is_err());
        assert!(TrainingParameters::new(1, 2, 0, 0.0).validate().is_err());
        assert!(TrainingParameters::new(1, 2, 1, -0.1).validate().is_err());
        assert!(TrainingParameters::new(1, 2, 1, 0.0).validate().is_ok());
    }

    #[test]
    fn forest_has_requested_size_and_bounded_depth() {
        let learner = AxisAlignedWeakLearner::new(vec![(0.0, 11.0)], 4, 2);
        let params = TrainingParameters::new(5, 3, 1, 0.0);
        let trainer = ForestTrainer::new(&learner, params, 1).unwrap();
        let forest = trainer.train(&two_class_samples(40)).unwrap();

        assert_eq!(forest.len(), 5);
        for tree in forest.trees() {
            assert!(tree.depth() <= 3);
            if tree.state_at(0) == NodeState::Internal {
                let left = tree.left_child(0);
                let right = tree.right_child(0);
                assert!(left < tree.capacity());
                assert!(right < tree.capacity());
            }
        }
    }

    #[test]
    fn determinism_under_fixed_seed() {
        let learner = AxisAlignedWeakLearner::new(vec![(0.0, 11.0)], 4, 2);
        let params = TrainingParameters::new(3, 3, 1, 0.0);
        let samples = two_class_samples(30);

        let a = ForestTrainer::new(&learner, params, 42).unwrap().train(&samples).unwrap();
        let b = ForestTrainer::new(&learner, params, 42).unwrap().train(&samples).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_forest_condition_when_every_tree_is_a_single_leaf() {
        let learner = AxisAlignedWeakLearner::new(vec![(0.0, 11.0)], 4, 2);
        // min_samples impossibly high: every tree collapses to a root leaf.
        let params = TrainingParameters::new(2, 3, 1_000_000, 0.0);
        let trainer = ForestTrainer::new(&learner, params, 1).unwrap();
        let forest = trainer.train(&two_class_samples(10)).unwrap();

        assert_eq!(forest.len(), 2);
        assert!(forest.is_degenerate());
    }

    #[test]
    fn forest_serialization_round_trips() {
        let learner = AxisAlignedWeakLearner::new(vec![(0.0, 11.0)], 4, 2);
        let params = TrainingParameters::new(2, 2, 1, 0.0);
        let trainer = ForestTrainer::new(&learner, params, 7).unwrap();
        let forest = trainer.train(&two_class_samples(20)).unwrap();

        let bytes = forest.to_bytes().unwrap();
        let decoded = Forest::from_bytes(&bytes).unwrap();
        assert_eq!(forest, decoded);
    }
}
