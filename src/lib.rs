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

//! A level-synchronous, distributed random-forest trainer.
//!
//! Grows every tree in a forest one depth level at a time, across a group of
//! cooperating workers, using a gather/merge/broadcast reduction at each
//! level so that every worker's copy of the tree being grown stays bytewise
//! identical. The split-selection strategy itself, the [`weak_learner`]
//! contract, is pluggable; this crate ships one reference implementation
//! ([`weak_learner::AxisAlignedWeakLearner`]) so the rest of the pipeline is
//! runnable and testable end to end.

pub mod collective;
pub mod coordinator;
pub mod error;
pub mod forest;
pub mod level_trainer;
pub mod node_map;
pub mod rng;
pub mod sample;
pub mod split;
pub mod statistics;
pub mod tree;
pub mod weak_learner;

pub use error::{Result, TrainError};
pub use forest::{Forest, ForestTrainer, TrainingParameters};
