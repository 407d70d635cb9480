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

//! Opaque split points and their per-candidate statistics.

use serde::{Deserialize, Serialize};

use crate::statistics::Statistics;

/// An opaque, serializable value produced by a weak learner that, when
/// applied to a sample, yields left or right. The core never inspects its
/// fields; it only stores, serializes, and hands it back to the weak
/// learner that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitPoint<P> {
    payload: P,
}

impl<P> SplitPoint<P> {
    pub fn new(payload: P) -> Self {
        SplitPoint { payload }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}

/// An ordered sequence of (left, right) statistics pairs, one per candidate
/// split point produced by [`crate::weak_learner::WeakLearner::sample_split_points`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitStatistics {
    pairs: Vec<(Statistics, Statistics)>,
}

impl SplitStatistics {
    pub fn new(pairs: Vec<(Statistics, Statistics)>) -> Self {
        SplitStatistics { pairs }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn left(&self, candidate_index: usize) -> &Statistics {
        &self.pairs[candidate_index].0
    }

    pub fn right(&self, candidate_index: usize) -> &Statistics {
        &self.pairs[candidate_index].1
    }

    pub fn pairs(&self) -> &[(Statistics, Statistics)] {
        &self.pairs
    }

    /// Elementwise merge with another `SplitStatistics` of identical length.
    ///
    /// Panics if the lengths differ; callers (the distributed coordinator)
    /// are expected to validate shape against the candidate list and surface
    /// a `TrainError::Shape` before ever reaching this call.
    pub fn accumulate(&mut self, other: &SplitStatistics) {
        assert_eq!(self.pairs.len(), other.pairs.len(), "split statistics length mismatch");
        for ((left, right), (other_left, other_right)) in self.pairs.iter_mut().zip(other.pairs.iter()) {
            left.accumulate(other_left);
            right.accumulate(other_right);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::StatisticsFactory;

    #[test]
    fn elementwise_merge() {
        let factory = StatisticsFactory::new(2);
        let mut a = SplitStatistics::new(vec![
            (factory.from_labels([0, 0]), factory.from_labels([1])),
            (factory.from_labels([0]), factory.from_labels([1, 1])),
        ]);
        let b = SplitStatistics::new(vec![
            (factory.from_labels([0]), factory.from_labels([])),
            (factory.from_labels([]), factory.from_labels([1])),
        ]);

        a.accumulate(&b);

        assert_eq!(a.left(0).num_of_samples(), 3);
        assert_eq!(a.right(0).num_of_samples(), 1);
        assert_eq!(a.left(1).num_of_samples(), 1);
        assert_eq!(a.right(1).num_of_samples(), 3);
    }

    #[test]
    fn split_point_payload_is_opaque_round_trip() {
        let sp = SplitPoint::new((3usize, 0.5f64));
        let bytes = bincode::serialize(&sp).unwrap();
        let decoded: SplitPoint<(usize, f64)> = bincode::deserialize(&bytes).unwrap();
        assert_eq!(sp, decoded);
    }
}
