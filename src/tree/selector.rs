//! Parent-selection rules.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::graph::{BubbleSortGraph, VertexId};

/// Decides the parent of a vertex in the spanning tree of a generator.
///
/// Implementations are called concurrently from the worker pool, for `v` a
/// vertex of `graph` and `t` in `1..n` (see [`super::parent_of`]).
pub trait ParentSelector: Send + Sync {
    fn select_parent(&self, graph: &BubbleSortGraph, v: VertexId, t: usize) -> Option<VertexId>;
}

/// The generator-`t` neighbour of every vertex, root included.
///
/// Since each generator is an involution, the two endpoints of every
/// generator-`t` edge point at each other, so the result is not a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstNeighbor;

impl ParentSelector for FirstNeighbor {
    fn select_parent(&self, graph: &BubbleSortGraph, v: VertexId, t: usize) -> Option<VertexId> {
        graph.get_adjacent(v, t)
    }
}

/// Moves one step closer to sorted: the root has no parent; any other vertex
/// swaps at `t` if positions `t - 1, t` are a descent, and otherwise at the
/// descent nearest to `t`, the lower one on a tie.
///
/// Each step removes exactly one inversion, so every tree is a spanning tree
/// rooted at the identity. The trees are not independent in general.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortingDescent;

impl ParentSelector for SortingDescent {
    fn select_parent(&self, graph: &BubbleSortGraph, v: VertexId, t: usize) -> Option<VertexId> {
        if v == graph.root() {
            return None;
        }
        let p = graph.permutation(v)?;
        if p.is_descent(t) {
            return graph.get_adjacent(v, t);
        }
        let d = p.descents().min_by_key(|&d| (d.abs_diff(t), d))?;
        graph.get_adjacent(v, d)
    }
}

/// The selectable strategies, by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    FirstNeighbor,
    SortingDescent,
}

impl ParentSelector for Strategy {
    fn select_parent(&self, graph: &BubbleSortGraph, v: VertexId, t: usize) -> Option<VertexId> {
        match self {
            Strategy::FirstNeighbor => FirstNeighbor.select_parent(graph, v, t),
            Strategy::SortingDescent => SortingDescent.select_parent(graph, v, t),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::FirstNeighbor => write!(f, "first-neighbor"),
            Strategy::SortingDescent => write!(f, "sorting-descent"),
        }
    }
}
