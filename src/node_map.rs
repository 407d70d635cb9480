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

//! `TreeNodeMap<V>`: a mapping from active node indices within one
//! tree to a per-node payload, with deterministic ascending iteration order
//! and a caller-supplied combiner for elementwise merge.
//!
//! Grounded on `distributed_forest_trainer.h`'s `TreeNodeMap`/
//! `broadcast_tree_node_map`, where the map is gathered from every rank,
//! merged node-by-node, and broadcast back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maps active node indices (within one [`crate::tree::Tree`]) to a value.
///
/// Backed by a `BTreeMap` so iteration is always in ascending node-index
/// order, which is what makes the gather/merge at the distributed
/// coordinator order-independent across ranks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeNodeMap<V> {
    entries: BTreeMap<usize, V>,
}

impl<V> Default for TreeNodeMap<V> {
    fn default() -> Self {
        TreeNodeMap { entries: BTreeMap::new() }
    }
}

impl<V> TreeNodeMap<V> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_index: usize, value: V) -> Option<V> {
        self.entries.insert(node_index, value)
    }

    pub fn get(&self, node_index: usize) -> Option<&V> {
        self.entries.get(&node_index)
    }

    pub fn erase(&mut self, node_index: usize) -> Option<V> {
        self.entries.remove(&node_index)
    }

    pub fn contains(&self, node_index: usize) -> bool {
        self.entries.contains_key(&node_index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in ascending node-index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &V)> {
        self.entries.iter().map(|(&k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }
}

impl<V: Clone> TreeNodeMap<V> {
    /// Elementwise-merges `other` into `self` via `combine`. A node present
    /// in only one of the two maps is carried over unchanged; this is how
    /// an empty worker shard's (missing) contribution is absorbed as the
    /// identity.
    pub fn merge_with(&mut self, other: &TreeNodeMap<V>, mut combine: impl FnMut(&V, &V) -> V) {
        for (node_index, other_value) in other.iter() {
            match self.entries.get(&node_index) {
                Some(existing) => {
                    let merged = combine(existing, other_value);
                    self.entries.insert(node_index, merged);
                }
                None => {
                    self.entries.insert(node_index, other_value.clone());
                }
            }
        }
    }

    /// Merges a batch of maps gathered from every rank into a single map,
    /// folding with `combine` in ascending-rank order (result is the same
    /// regardless of order since `combine` must itself be associative and
    /// commutative).
    pub fn merge_all(maps: &[TreeNodeMap<V>], mut combine: impl FnMut(&V, &V) -> V) -> TreeNodeMap<V> {
        let mut merged = TreeNodeMap::empty();
        for map in maps {
            merged.merge_with(map, &mut combine);
        }
        merged
    }
}

impl<V> FromIterator<(usize, V)> for TreeNodeMap<V> {
    fn from_iter<I: IntoIterator<Item = (usize, V)>>(iter: I) -> Self {
        TreeNodeMap { entries: iter.into_iter().collect() }
    }
}
