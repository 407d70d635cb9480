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

//! The weak-learner strategy contract and a reference axis-aligned
//! threshold implementation.
//!
//! The core (`level_trainer`, `coordinator`, `forest`) depends only on the
//! [`WeakLearner`] trait; it never inspects a `SplitPoint`'s payload. Grounded
//! on the teacher's `Splittable`/`Response` traits in `data_interface.rs` and
//! on `data_interface/three_val.rs`'s `gen_optimal_pivot` / `split_with_pivot`
//! pair for the shape of "sample candidates, score them, then partition".

use crate::rng::Rng;
use crate::sample::{LabeledSample, Sample};
use crate::split::{SplitPoint, SplitStatistics};
use crate::statistics::{information_gain, Statistics, StatisticsFactory};

/// Pluggable split-selection strategy.
///
/// Concrete weak learners (axis-aligned thresholds, image-patch features,
/// etc.) live outside the core; this crate ships [`AxisAlignedWeakLearner`]
/// as the one reference implementation needed to exercise and test it.
pub trait WeakLearner {
    type Sample: Sample;
    /// The opaque payload carried inside [`SplitPoint`].
    type Payload: Clone;

    fn create_statistics(&self) -> Statistics;

    fn compute_statistics(&self, samples: &[Self::Sample]) -> Statistics;

    /// Draws candidate split points. Count is governed by the learner's own
    /// parameters, not the core. May return an empty list; the caller then
    /// marks the node a leaf.
    fn sample_split_points(&self, samples: &[Self::Sample], rng: &mut Rng) -> Vec<SplitPoint<Self::Payload>>;

    /// For each candidate, partitions `samples` virtually and tallies each
    /// side. The returned `SplitStatistics` must have the same length as
    /// `splits`.
    fn compute_split_statistics(
        &self,
        samples: &[Self::Sample],
        splits: &[SplitPoint<Self::Payload>],
    ) -> SplitStatistics;

    /// Partitions `samples` in place according to `split`: samples before the
    /// returned index go left, samples at and after it go right.
    fn partition(&self, samples: &mut [Self::Sample], split: &SplitPoint<Self::Payload>) -> usize;

    /// Finds the best (candidate index, information gain) pair, ties broken
    /// by lowest index. The default implementation applies the fixed
    /// information-gain formula and needs no learner-specific
    /// knowledge; override only if a learner wants a different scoring rule.
    fn find_best_split(&self, parent_stats: &Statistics, split_stats: &SplitStatistics) -> (usize, f64) {
        let mut best_index = 0;
        let mut best_gain = f64::NEG_INFINITY;
        for i in 0..split_stats.len() {
            let gain = information_gain(parent_stats, split_stats.left(i), split_stats.right(i));
            if gain > best_gain {
                best_gain = gain;
                best_index = i;
            }
        }
        (best_index, best_gain)
    }
}

/// Reference weak learner over `f64`-valued feature vectors: draws
/// `(feature_index, threshold)` candidates by picking a feature uniformly and
/// a threshold uniformly within that feature's configured `(min, max)` range,
/// and partitions by `feature[idx] < threshold`.
///
/// The range is fixed at construction rather than read off whatever sample
/// slice a particular call happens to receive: under the distributed
/// coordinator only rank 0 draws candidates, and rank 0's local shard shrinks
/// as the worker count grows, so deriving the range from the shard would make
/// the drawn thresholds (and therefore the trained tree) depend on worker
/// count. A caller-supplied global range keeps the draw a pure function of
/// the RNG stream.
///
/// This is the crate's stand-in for the "axis-aligned thresholds" collaborator,
/// shipped so the core is runnable end to end.
pub struct AxisAlignedWeakLearner {
    feature_ranges: Vec<(f64, f64)>,
    num_candidates: usize,
    statistics_factory: StatisticsFactory,
}

impl AxisAlignedWeakLearner {
    /// `feature_ranges[i]` is the `(min, max)` bound candidate thresholds for
    /// feature `i` are drawn within; its length fixes the feature count.
    pub fn new(feature_ranges: Vec<(f64, f64)>, num_candidates: usize, num_classes: usize) -> Self {
        AxisAlignedWeakLearner {
            feature_ranges,
            num_candidates,
            statistics_factory: StatisticsFactory::new(num_classes),
        }
    }

    #[inline]
    fn goes_left(&self, sample: &LabeledSample, payload: &(usize, f64)) -> bool {
        let (feature, threshold) = *payload;
        sample.features[feature] < threshold
    }
}

impl WeakLearner for AxisAlignedWeakLearner {
    type Sample = LabeledSample;
    type Payload = (usize, f64);

    fn create_statistics(&self) -> Statistics {
        self.statistics_factory.create()
    }

    fn compute_statistics(&self, samples: &[LabeledSample]) -> Statistics {
        self.statistics_factory.from_labels(samples.iter().map(|s| s.class_label()))
    }

    fn sample_split_points(&self, samples: &[LabeledSample], rng: &mut Rng) -> Vec<SplitPoint<(usize, f64)>> {
        if samples.is_empty() || self.feature_ranges.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::with_capacity(self.num_candidates);
        for _ in 0..self.num_candidates {
            let feature = rng.rand_index(self.feature_ranges.len());
            let (lo, hi) = self.feature_ranges[feature];
            let threshold = if hi > lo { lo + rng.rand_uni() * (hi - lo) } else { lo };
            candidates.push(SplitPoint::new((feature, threshold)));
        }
        candidates
    }

    fn compute_split_statistics(
        &self,
        samples: &[LabeledSample],
        splits: &[SplitPoint<(usize, f64)>],
    ) -> SplitStatistics {
        let pairs = splits
            .iter()
            .map(|split| {
                let mut left = self.statistics_factory.create();
                let mut right = self.statistics_factory.create();
                for sample in samples {
                    if self.goes_left(sample, split.payload()) {
                        left.accumulate_label(sample.class_label());
                    } else {
                        right.accumulate_label(sample.class_label());
                    }
                }
                (left, right)
            })
            .collect();
        SplitStatistics::new(pairs)
    }

    fn partition(&self, samples: &mut [LabeledSample], split: &SplitPoint<(usize, f64)>) -> usize {
        let payload = *split.payload();
        let mut i = 0;
        for j in 0..samples.len() {
            if self.goes_left(&samples[j], &payload) {
                samples.swap(i, j);
                i += 1;
            }
        }
        i
    }
}
