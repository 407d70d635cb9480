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

//! The `Sample` contract, deliberately narrow, mirroring the teacher's
//! small focused traits (`Response<T>`, `ColumnIdentifiable`) in
//! `data_interface.rs`: the core only ever needs a class label out of a
//! sample, everything else is the weak learner's concern.

/// A training sample exposes a class label, bounded by a known class count.
/// Feature data is entirely the weak learner's concern; the core never
/// looks past the label.
pub trait Sample {
    fn class_label(&self) -> usize;
}

/// A minimal owned sample: a class label plus an `f64` feature vector,
/// consumed by [`crate::weak_learner::AxisAlignedWeakLearner`].
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledSample {
    pub label: usize,
    pub features: Vec<f64>,
}

impl LabeledSample {
    pub fn new(label: usize, features: Vec<f64>) -> Self {
        LabeledSample { label, features }
    }
}

impl Sample for LabeledSample {
    fn class_label(&self) -> usize {
        self.label
    }
}
