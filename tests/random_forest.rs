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

use float_cmp::assert_approx_eq;

use forest_trainer::forest::{ForestTrainer, TrainingParameters};
use forest_trainer::sample::LabeledSample;
use forest_trainer::tree::NodeState;
use forest_trainer::weak_learner::AxisAlignedWeakLearner;
use forest_trainer::TrainError;

const SEED: u64 = 139547392210478;

fn two_blob_samples(n: usize) -> Vec<LabeledSample> {
    (0..n)
        .map(|i| {
            let label = i % 2;
            let offset = if label == 0 { 0.0 } else { 5.0 };
            LabeledSample::new(label, vec![offset + (i as f64 % 3.0) * 0.1])
        })
        .collect()
}

#[test]
fn forest_separates_two_well_spaced_classes() {
    let learner = AxisAlignedWeakLearner::new(vec![(0.0, 5.5)], 8, 2);
    let params = TrainingParameters::new(10, 2, 1, 0.0);
    let trainer = ForestTrainer::new(&learner, params, SEED).unwrap();

    let forest = trainer.train(&two_blob_samples(60)).unwrap();
    assert_eq!(forest.len(), 10);

    let internal_roots = forest.trees().iter().filter(|t| t.state_at(0) == NodeState::Internal).count();
    assert!(internal_roots > 0, "expected at least one tree to find the class-separating split");
}

#[test]
fn forest_size_matches_num_of_trees_and_depth_is_bounded() {
    let learner = AxisAlignedWeakLearner::new(vec![(0.0, 5.5)], 4, 2);
    let params = TrainingParameters::new(5, 3, 1, 0.0);
    let trainer = ForestTrainer::new(&learner, params, SEED).unwrap();

    let forest = trainer.train(&two_blob_samples(40)).unwrap();
    assert_eq!(forest.len(), 5);
    for tree in forest.trees() {
        assert!(tree.depth() <= 3);
    }
}

#[test]
fn determinism_under_fixed_seed_across_independent_runs() {
    let learner = AxisAlignedWeakLearner::new(vec![(0.0, 5.5)], 6, 2);
    let params = TrainingParameters::new(4, 3, 1, 0.0);
    let samples = two_blob_samples(50);

    let first = ForestTrainer::new(&learner, params, SEED).unwrap().train(&samples).unwrap();
    let second = ForestTrainer::new(&learner, params, SEED).unwrap().train(&samples).unwrap();
    assert_eq!(first, second);
}

#[test]
fn different_seeds_can_diverge() {
    let learner = AxisAlignedWeakLearner::new(vec![(0.0, 5.5)], 2, 2);
    let params = TrainingParameters::new(1, 2, 1, 0.0);
    let samples = two_blob_samples(30);

    let a = ForestTrainer::new(&learner, params, 1).unwrap().train(&samples).unwrap();
    let b = ForestTrainer::new(&learner, params, 2).unwrap().train(&samples).unwrap();
    // not asserted unequal (candidate draws could coincide); just exercise
    // that both seeds train successfully end to end.
    assert_eq!(a.len(), b.len());
}

#[test]
fn invalid_parameters_are_rejected_at_construction() {
    let learner = AxisAlignedWeakLearner::new(vec![(0.0, 5.5)], 4, 2);
    let err = ForestTrainer::new(&learner, TrainingParameters::new(0, 2, 1, 0.0), SEED).unwrap_err();
    assert!(matches!(err, TrainError::Configuration(_)));

    let err = ForestTrainer::new(&learner, TrainingParameters::new(1, 0, 1, 0.0), SEED).unwrap_err();
    assert!(matches!(err, TrainError::Configuration(_)));
}

#[test]
fn below_minimum_gain_collapses_every_tree_to_a_leaf() {
    // Interleaved labels with no feature separation: any split nets ~zero gain.
    let samples: Vec<LabeledSample> = (0..20).map(|i| LabeledSample::new(i % 2, vec![0.0])).collect();
    let learner = AxisAlignedWeakLearner::new(vec![(0.0, 5.5)], 4, 2);
    let params = TrainingParameters::new(3, 2, 1, 0.1);
    let trainer = ForestTrainer::new(&learner, params, SEED).unwrap();

    let forest = trainer.train(&samples).unwrap();
    assert!(forest.is_degenerate());
    for tree in forest.trees() {
        assert_eq!(tree.state_at(0), NodeState::Leaf);
        assert_approx_eq!(f64, tree.statistics_at(0).unwrap().entropy(), 1.0, epsilon = 1e-9);
    }
}
