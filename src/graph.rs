//! The bubble-sort network `B_n`.
//!
//! Vertices are all permutations of `1..=n`, indexed densely in lexicographic
//! order. Two vertices are adjacent through generator `t` (for `t` in `1..n`)
//! when they differ by exchanging positions `t - 1` and `t`. Every vertex
//! therefore has exactly `n - 1` neighbours, one per generator.

use std::fmt;

use ahash::AHashMap;
use derive_more::{From, Into};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::permutation::{factorial, Permutation};

/// Largest supported dimension. `12!` vertices is already far beyond what
/// fits in memory with an adjacency row per vertex.
pub const MAX_DIMENSION: usize = 12;

/// Dense handle of a vertex, in `0..n!`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, From, Into,
)]
pub struct VertexId(pub usize);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Invalid dimension {n}: expected 1..={max}", max = MAX_DIMENSION)]
    InvalidDimension { n: usize },
    #[error("Permutation {0} has no vertex in the network")]
    DetachedPermutation(String),
}

/// The adjacency model of `B_n`. Immutable once built.
#[derive(Debug, Clone)]
pub struct BubbleSortGraph {
    n: usize,
    vertices: Vec<Permutation>,
    index: AHashMap<Permutation, VertexId>,
    /// Row-major `vertex_count x (n - 1)`: entry `(v, t - 1)` is the generator-`t` neighbour of `v`.
    adjacency: Vec<VertexId>,
}

impl BubbleSortGraph {
    /// Enumerates the `n!` vertices and records, for every vertex and generator,
    /// the index of the swapped permutation.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bubble_ist::graph::{BubbleSortGraph, VertexId};
    /// let graph = BubbleSortGraph::build(3).unwrap();
    /// assert_eq!(graph.vertex_count(), 6);
    /// let root = graph.root();
    /// let v = graph.get_adjacent(root, 1).unwrap();
    /// assert_eq!(graph.permutation(v).unwrap().to_string(), "213");
    /// ```
    pub fn build(n: usize) -> Result<Self, GraphError> {
        if n < 1 || n > MAX_DIMENSION {
            return Err(GraphError::InvalidDimension { n });
        }
        let expected = factorial(n).ok_or(GraphError::InvalidDimension { n })?;

        let vertices: Vec<Permutation> = Permutation::lexicographic(n).collect();
        debug_assert_eq!(vertices.len(), expected);

        let index: AHashMap<Permutation, VertexId> = vertices
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), VertexId(i)))
            .collect();

        let rows: Vec<Vec<VertexId>> = vertices
            .par_iter()
            .map(|p| {
                (1..n)
                    .map(|t| {
                        let swapped = p
                            .swap(t)
                            .ok_or_else(|| GraphError::DetachedPermutation(p.to_string()))?;
                        index
                            .get(&swapped)
                            .copied()
                            .ok_or_else(|| GraphError::DetachedPermutation(swapped.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<_, _>>()?;

        Ok(BubbleSortGraph {
            n,
            vertices,
            index,
            adjacency: rows.into_iter().flatten().collect(),
        })
    }

    /// The dimension `n`.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Number of generators, which is also the number of spanning trees.
    pub fn generator_count(&self) -> usize {
        self.n - 1
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// The identity permutation. Lexicographic order always puts it first.
    pub fn root(&self) -> VertexId {
        VertexId(0)
    }

    pub fn contains(&self, v: VertexId) -> bool {
        v.0 < self.vertices.len()
    }

    pub fn is_generator(&self, t: usize) -> bool {
        t >= 1 && t < self.n
    }

    pub fn permutation(&self, v: VertexId) -> Option<&Permutation> {
        self.vertices.get(v.0)
    }

    pub fn index_of(&self, p: &Permutation) -> Option<VertexId> {
        self.index.get(p).copied()
    }

    /// The neighbour of `v` through generator `t`, or `None` if either is out of range.
    pub fn get_adjacent(&self, v: VertexId, t: usize) -> Option<VertexId> {
        if !self.contains(v) || !self.is_generator(t) {
            return None;
        }
        self.adjacency
            .get(v.0 * self.generator_count() + t - 1)
            .copied()
    }

    /// All neighbours of `v`, in generator order.
    pub fn neighbors(&self, v: VertexId) -> Option<&[VertexId]> {
        if !self.contains(v) {
            return None;
        }
        let width = self.generator_count();
        Some(&self.adjacency[v.0 * width..(v.0 + 1) * width])
    }

    /// Every permutation, indexed by [`VertexId`].
    pub fn iter_vertices(&self) -> impl ExactSizeIterator<Item = (VertexId, &Permutation)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, p)| (VertexId(i), p))
    }
}

#[cfg(test)]
mod test {
    use ahash::AHashSet;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn b3_scenario() {
        let graph = BubbleSortGraph::build(3).unwrap();
        assert_eq!(graph.vertex_count(), 6);
        assert_eq!(graph.generator_count(), 2);

        let root = graph.root();
        assert_eq!(graph.permutation(root).unwrap().to_string(), "123");

        let s1 = graph.get_adjacent(root, 1).unwrap();
        let s2 = graph.get_adjacent(root, 2).unwrap();
        assert_eq!(graph.permutation(s1).unwrap().to_string(), "213");
        assert_eq!(graph.permutation(s2).unwrap().to_string(), "132");
        assert_eq!(graph.neighbors(root).unwrap(), &[s1, s2]);
    }

    #[test]
    fn out_of_range_lookups_are_empty() {
        let graph = BubbleSortGraph::build(3).unwrap();
        assert_eq!(graph.get_adjacent(VertexId(6), 1), None);
        assert_eq!(graph.get_adjacent(VertexId(0), 0), None);
        assert_eq!(graph.get_adjacent(VertexId(0), 3), None);
        assert_eq!(graph.neighbors(VertexId(6)), None);
        assert_eq!(graph.permutation(VertexId(6)), None);
    }

    #[test]
    fn invalid_dimension() {
        assert_eq!(
            BubbleSortGraph::build(0).unwrap_err(),
            GraphError::InvalidDimension { n: 0 }
        );
        assert!(matches!(
            BubbleSortGraph::build(MAX_DIMENSION + 1),
            Err(GraphError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn single_vertex_network() {
        let graph = BubbleSortGraph::build(1).unwrap();
        assert_eq!(graph.vertex_count(), 1);
        assert_eq!(graph.generator_count(), 0);
        assert_eq!(graph.neighbors(graph.root()).unwrap(), &[] as &[VertexId]);
    }

    #[test]
    fn vertex_count_is_factorial_and_distinct() {
        for n in 1..=6 {
            let graph = BubbleSortGraph::build(n).unwrap();
            assert_eq!(Some(graph.vertex_count()), factorial(n));
            let distinct: AHashSet<_> = graph.iter_vertices().map(|(_, p)| p).collect();
            assert_eq!(distinct.len(), graph.vertex_count());
            for (v, p) in graph.iter_vertices() {
                assert_eq!(graph.index_of(p), Some(v));
            }
        }
    }

    proptest! {
        #[test]
        fn adjacency_is_symmetric(n in 2usize..=6, seed in any::<usize>()) {
            let graph = BubbleSortGraph::build(n).unwrap();
            let v = VertexId(seed % graph.vertex_count());
            for t in 1..n {
                let u = graph.get_adjacent(v, t).unwrap();
                prop_assert_ne!(u, v);
                prop_assert_eq!(graph.get_adjacent(u, t), Some(v));
                let swapped = graph.permutation(v).unwrap().swap(t);
                prop_assert_eq!(swapped.as_ref(), graph.permutation(u));
            }
        }
    }
}
