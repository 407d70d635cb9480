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

//! Fixed-capacity, level-order binary [`Tree`].
//!
//! A dense array indexed by level-order position avoids pointer graphs and
//! makes whole-tree serialization a contiguous byte blob. Parent/child are
//! arithmetic on indices: for node `i`, the left child is `2i+1`, the right
//! child `2i+2`.

use serde::{Deserialize, Serialize};

use crate::split::SplitPoint;
use crate::statistics::Statistics;

/// A node's lifecycle stage. Monotonic: `Unvisited -> Leaf` or
/// `Unvisited -> Internal`; never `Leaf -> Internal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Unvisited,
    Internal,
    Leaf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Node<P> {
    state: NodeState,
    split: Option<SplitPoint<P>>,
    statistics: Option<Statistics>,
}

impl<P> Node<P> {
    fn unvisited() -> Self {
        Node { state: NodeState::Unvisited, split: None, statistics: None }
    }
}

/// A fixed-capacity complete binary tree of bounded depth.
///
/// Capacity is `2^depth - 1` slots; unused slots remain `Unvisited` forever
/// (a shallower real tree than the configured maximum is represented by
/// marking its frontier nodes `Leaf` and never visiting their would-be
/// children).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree<P> {
    depth: usize,
    nodes: Vec<Node<P>>,
}

impl<P> Tree<P> {
    /// Builds a tree of the given max depth (≥ 1), root `Unvisited`.
    pub fn construct(depth: usize) -> Self {
        assert!(depth >= 1, "tree depth must be at least 1");
        let capacity = (1usize << depth) - 1;
        Tree { depth, nodes: (0..capacity).map(|_| Node::unvisited()).collect() }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn root(&self) -> usize {
        0
    }

    #[inline]
    pub fn left_child(&self, index: usize) -> usize {
        2 * index + 1
    }

    #[inline]
    pub fn right_child(&self, index: usize) -> usize {
        2 * index + 2
    }

    #[inline]
    pub fn parent(&self, index: usize) -> Option<usize> {
        if index == 0 {
            None
        } else {
            Some((index - 1) / 2)
        }
    }

    /// 1-based depth of `index` (root is depth 1); levels range from 1 to
    /// this tree's max depth.
    #[inline]
    pub fn depth_of(&self, index: usize) -> usize {
        (usize::BITS - (index + 1).leading_zeros()) as usize
    }

    /// All node indices at the given 1-based depth, in ascending order,
    /// bounded by this tree's capacity.
    pub fn indices_at_depth(&self, depth: usize) -> Vec<usize> {
        if depth == 0 || depth > self.depth {
            return Vec::new();
        }
        let first = (1usize << (depth - 1)) - 1;
        let last = (1usize << depth) - 2;
        (first..=last).filter(|&i| i < self.nodes.len()).collect()
    }

    #[inline]
    pub fn state_at(&self, index: usize) -> NodeState {
        self.nodes[index].state
    }

    #[inline]
    pub fn split_at(&self, index: usize) -> Option<&SplitPoint<P>> {
        self.nodes[index].split.as_ref()
    }

    #[inline]
    pub fn statistics_at(&self, index: usize) -> Option<&Statistics> {
        self.nodes[index].statistics.as_ref()
    }

    /// Marks `index` a leaf. A node already marked `Leaf` stays a leaf
    /// (idempotent); it is a bug to call this on a node already `Internal`.
    pub fn set_leaf(&mut self, index: usize) {
        debug_assert_ne!(self.nodes[index].state, NodeState::Internal, "leaf monotonicity violated");
        self.nodes[index].state = NodeState::Leaf;
    }

    /// Marks `index` internal with the given split point. Its two children
    /// must exist in the buffer, i.e. `index` must not be in
    /// the tree's last level.
    pub fn set_split(&mut self, index: usize, split: SplitPoint<P>) {
        debug_assert_ne!(self.nodes[index].state, NodeState::Leaf, "leaf monotonicity violated");
        assert!(
            self.right_child(index) < self.nodes.len(),
            "internal node's children must exist in the tree buffer"
        );
        self.nodes[index].state = NodeState::Internal;
        self.nodes[index].split = Some(split);
    }

    pub fn set_statistics(&mut self, index: usize, statistics: Statistics) {
        self.nodes[index].statistics = Some(statistics);
    }
}

impl<P: Clone + Serialize + for<'de> Deserialize<'de>> Tree<P> {
    pub fn to_bytes(&self) -> crate::error::Result<Vec<u8>> {
        bincode::serialize(self).map_err(Into::into)
    }

    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        bincode::deserialize(bytes).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp(v: usize) -> SplitPoint<usize> {
        SplitPoint::new(v)
    }

    fn two_class_stats() -> Statistics {
        crate::statistics::StatisticsFactory::new(2).from_labels([0, 1, 1])
    }

    #[test]
    fn capacity_matches_depth() {
        assert_eq!(Tree::<usize>::construct(1).capacity(), 1);
        assert_eq!(Tree::<usize>::construct(2).capacity(), 3);
        assert_eq!(Tree::<usize>::construct(3).capacity(), 7);
    }

    #[test]
    fn indices_at_depth_are_level_order() {
        let tree = Tree::<usize>::construct(3);
        assert_eq!(tree.indices_at_depth(1), vec![0]);
        assert_eq!(tree.indices_at_depth(2), vec![1, 2]);
        assert_eq!(tree.indices_at_depth(3), vec![3, 4, 5, 6]);
        assert_eq!(tree.indices_at_depth(4), Vec::<usize>::new());
    }

    #[test]
    fn depth_of_matches_indices_at_depth() {
        let tree = Tree::<usize>::construct(3);
        for d in 1..=3 {
            for &i in &tree.indices_at_depth(d) {
                assert_eq!(tree.depth_of(i), d);
            }
        }
    }

    #[test]
    fn child_indices_exist_for_internal_nodes() {
        let mut tree = Tree::<usize>::construct(2);
        tree.set_split(0, sp(7));
        assert_eq!(tree.left_child(0), 1);
        assert_eq!(tree.right_child(0), 2);
        assert_eq!(tree.state_at(0), NodeState::Internal);
        assert_eq!(tree.split_at(0).unwrap().payload(), &7);
    }

    #[test]
    #[should_panic]
    fn splitting_last_level_node_panics() {
        let mut tree = Tree::<usize>::construct(2);
        tree.set_split(1, sp(1));
    }

    #[test]
    fn unused_slots_remain_unvisited() {
        let mut tree = Tree::<usize>::construct(2);
        tree.set_leaf(0);
        assert_eq!(tree.state_at(1), NodeState::Unvisited);
        assert_eq!(tree.state_at(2), NodeState::Unvisited);
    }

    #[test]
    fn serialization_round_trips() {
        let mut tree = Tree::<usize>::construct(2);
        tree.set_split(0, sp(3));
        tree.set_leaf(1);
        tree.set_statistics(1, two_class_stats());
        let bytes = tree.to_bytes().unwrap();
        let decoded = Tree::<usize>::from_bytes(&bytes).unwrap();
        assert_eq!(tree, decoded);
    }
}
