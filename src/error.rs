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

//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by the forest trainer.
///
/// Every fallible public operation returns `Result<T, TrainError>`. There are
/// no retries at this layer: a `Collective` or `Shape` error aborts the
/// tree currently being trained, and the caller decides whether to restart.
#[derive(Debug, Error)]
pub enum TrainError {
    /// Invalid training parameters, detected at construction time.
    #[error("invalid training parameters: {0}")]
    Configuration(String),

    /// The weak learner returned a `SplitStatistics` sequence whose length
    /// does not match the number of candidate split points it was given.
    #[error("weak learner returned {got} split statistics for {expected} candidates")]
    Shape { expected: usize, got: usize },

    /// A `gather` or `broadcast` call failed.
    #[error("collective communication failed on rank {rank}: {reason}")]
    Collective { rank: usize, reason: String },

    /// Training the i-th tree of the forest failed.
    #[error("training tree {tree_index} failed: {source}")]
    TreeFailed {
        tree_index: usize,
        #[source]
        source: Box<TrainError>,
    },

    /// Encoding or decoding a wire payload failed.
    #[error("(de)serialization failed: {0}")]
    Serialization(#[from] Box<bincode::ErrorKind>),
}

pub type Result<T> = std::result::Result<T, TrainError>;
