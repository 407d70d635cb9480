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

//! Class-histogram statistics and Shannon-entropy information gain.
//!
//! Grounded on `histogram_statistics.h` from the original distributed forest
//! trainer: a statistics summary is a count vector indexed by class label
//! plus the running total, supporting incremental accumulation and
//! associative/commutative merge.

use serde::{Deserialize, Serialize};

/// A class-histogram summary of a bag of samples.
///
/// Two `Statistics` values are mergeable iff they were created by the same
/// [`StatisticsFactory`] (same class count); merge is associative and
/// commutative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    histogram: Vec<u64>,
    num_of_samples: u64,
}

impl Statistics {
    fn empty(num_of_classes: usize) -> Self {
        Statistics { histogram: vec![0; num_of_classes], num_of_samples: 0 }
    }

    #[inline]
    pub fn num_of_classes(&self) -> usize {
        self.histogram.len()
    }

    #[inline]
    pub fn num_of_samples(&self) -> u64 {
        self.num_of_samples
    }

    #[inline]
    pub fn histogram(&self) -> &[u64] {
        &self.histogram
    }

    #[inline]
    pub fn count_of(&self, class_label: usize) -> u64 {
        self.histogram[class_label]
    }

    /// Accumulates one sample's class label into the histogram.
    pub fn accumulate_label(&mut self, class_label: usize) {
        self.histogram[class_label] += 1;
        self.num_of_samples += 1;
    }

    /// Accumulates another `Statistics` of identical shape (merge).
    ///
    /// Merging the empty accumulator into any `Statistics` is the identity,
    /// so an empty worker shard contributes nothing.
    pub fn accumulate(&mut self, other: &Statistics) {
        debug_assert_eq!(self.histogram.len(), other.histogram.len());
        for (a, b) in self.histogram.iter_mut().zip(other.histogram.iter()) {
            *a += b;
        }
        self.num_of_samples += other.num_of_samples;
    }

    /// Merges a list of `Statistics` of identical shape; the result does not
    /// depend on fold order.
    pub fn merge_all<'a>(num_of_classes: usize, parts: impl IntoIterator<Item = &'a Statistics>) -> Statistics {
        let mut acc = Statistics::empty(num_of_classes);
        for part in parts {
            acc.accumulate(part);
        }
        acc
    }

    /// Shannon entropy in bits, with the convention 0·log 0 = 0.
    ///
    /// Bounded in `[0, log2(num_of_classes)]`; zero iff the histogram is
    /// concentrated on a single class.
    pub fn entropy(&self) -> f64 {
        if self.num_of_samples == 0 {
            return 0.0;
        }
        let n = self.num_of_samples as f64;
        let mut entropy = 0.0;
        for &count in &self.histogram {
            if count > 0 {
                let p = count as f64 / n;
                entropy -= p * p.log2();
            }
        }
        entropy
    }
}

/// Creates empty [`Statistics`] of a fixed class-count shape.
#[derive(Clone, Copy, Debug)]
pub struct StatisticsFactory {
    num_of_classes: usize,
}

impl StatisticsFactory {
    pub fn new(num_of_classes: usize) -> Self {
        StatisticsFactory { num_of_classes }
    }

    #[inline]
    pub fn num_of_classes(&self) -> usize {
        self.num_of_classes
    }

    pub fn create(&self) -> Statistics {
        Statistics::empty(self.num_of_classes)
    }

    pub fn from_labels(&self, labels: impl IntoIterator<Item = usize>) -> Statistics {
        let mut stats = self.create();
        for label in labels {
            stats.accumulate_label(label);
        }
        stats
    }
}

/// Information gain = parent entropy − weighted child entropies, with 0/0
/// treated as 0.
pub fn information_gain(parent: &Statistics, left: &Statistics, right: &Statistics) -> f64 {
    let n = parent.num_of_samples() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let n_left = left.num_of_samples() as f64;
    let n_right = right.num_of_samples() as f64;

    let weighted_left = if n_left == 0.0 { 0.0 } else { (n_left / n) * left.entropy() };
    let weighted_right = if n_right == 0.0 { 0.0 } else { (n_right / n) * right.entropy() };

    parent.entropy() - weighted_left - weighted_right
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_and_merge_agree() {
        let factory = StatisticsFactory::new(2);
        let a = factory.from_labels([0, 0, 1]);
        let b = factory.from_labels([1, 1]);

        let mut merged = a.clone();
        merged.accumulate(&b);

        let merged_via_helper = Statistics::merge_all(2, [&a, &b]);
        assert_eq!(merged, merged_via_helper);
        assert_eq!(merged.num_of_samples(), 5);
        assert_eq!(merged.count_of(0), 2);
        assert_eq!(merged.count_of(1), 3);
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        let factory = StatisticsFactory::new(3);
        let a = factory.from_labels([0, 1]);
        let b = factory.from_labels([1, 2, 2]);
        let c = factory.from_labels([0, 0]);

        let forward = Statistics::merge_all(3, [&a, &b, &c]);
        let backward = Statistics::merge_all(3, [&c, &b, &a]);
        let regrouped = {
            let mut bc = b.clone();
            bc.accumulate(&c);
            let mut abc = a.clone();
            abc.accumulate(&bc);
            abc
        };

        assert_eq!(forward, backward);
        assert_eq!(forward, regrouped);
    }

    #[test]
    fn empty_accumulator_is_identity() {
        let factory = StatisticsFactory::new(2);
        let a = factory.from_labels([0, 1, 1]);
        let empty = factory.create();

        let mut merged = a.clone();
        merged.accumulate(&empty);
        assert_eq!(merged, a);
    }

    #[test]
    fn entropy_bounds_and_purity() {
        let factory = StatisticsFactory::new(4);
        let pure = factory.from_labels([2, 2, 2, 2]);
        assert_eq!(pure.entropy(), 0.0);

        let uniform = factory.from_labels([0, 1, 2, 3]);
        assert!((uniform.entropy() - 2.0).abs() < 1e-12); // log2(4) == 2

        for labels in [vec![0, 0, 1], vec![0, 1, 1, 1, 2]] {
            let stats = factory.from_labels(labels);
            assert!(stats.entropy() >= 0.0);
            assert!(stats.entropy() <= (factory.num_of_classes() as f64).log2());
        }
    }

    #[test]
    fn information_gain_is_nonnegative_for_pure_split() {
        let factory = StatisticsFactory::new(2);
        let parent = factory.from_labels([0, 0, 1, 1]);
        let left = factory.from_labels([0, 0]);
        let right = factory.from_labels([1, 1]);

        let gain = information_gain(&parent, &left, &right);
        assert!((gain - 1.0).abs() < 1e-12);
    }

    #[test]
    fn information_gain_zero_when_split_uninformative() {
        let factory = StatisticsFactory::new(2);
        let parent = factory.from_labels([0, 1, 0, 1]);
        let left = factory.from_labels([0, 1]);
        let right = factory.from_labels([0, 1]);

        let gain = information_gain(&parent, &left, &right);
        assert!(gain.abs() < 1e-12);
    }

    #[test]
    fn serialization_round_trips() {
        let factory = StatisticsFactory::new(3);
        let stats = factory.from_labels([0, 1, 2, 2]);
        let bytes = bincode::serialize(&stats).unwrap();
        let decoded: Statistics = bincode::deserialize(&bytes).unwrap();
        assert_eq!(stats, decoded);
    }
}
