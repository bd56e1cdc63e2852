//! Parent pointers for the `n - 1` spanning trees of `B_n`.
//!
//! *   [`ParentTable`]: the merged vertex × tree table of parent pointers.
//! *   [`ParentSelector`]: the rule deciding a vertex's parent in a tree, with the
//!     [`FirstNeighbor`] and [`SortingDescent`] strategies.
//! *   [`LocalTreeBuilder`]: computes the rows of a unit's vertices in parallel.
//! *   [`verify`]: checks for the tree and independence properties.
//!
//! Trees are indexed by generator, `t` in `1..n`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{BubbleSortGraph, VertexId};

pub mod builder;
pub mod selector;
pub mod verify;

pub use builder::{LocalRows, LocalTreeBuilder};
pub use selector::{FirstNeighbor, ParentSelector, SortingDescent, Strategy};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Vertex {vertex} is not in a network of {vertex_count} vertices")]
    InvalidVertex {
        vertex: VertexId,
        vertex_count: usize,
    },
    #[error("Tree index {t} is outside 1..{n}")]
    InvalidTreeIndex { t: usize, n: usize },
}

/// Checks `v` and `t` against `graph` and asks `selector` for the parent.
pub fn parent_of<S: ParentSelector + ?Sized>(
    graph: &BubbleSortGraph,
    selector: &S,
    v: VertexId,
    t: usize,
) -> Result<Option<VertexId>, TreeError> {
    if !graph.contains(v) {
        return Err(TreeError::InvalidVertex {
            vertex: v,
            vertex_count: graph.vertex_count(),
        });
    }
    if !graph.is_generator(t) {
        return Err(TreeError::InvalidTreeIndex {
            t,
            n: graph.dimension(),
        });
    }
    Ok(selector.select_parent(graph, v, t))
}

/// Row-major `vertex_count x (n - 1)` table; `None` marks a vertex without parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentTable {
    n: usize,
    vertex_count: usize,
    parents: Vec<Option<VertexId>>,
}

impl ParentTable {
    /// A table with no parent set anywhere.
    pub fn new(n: usize, vertex_count: usize) -> Self {
        ParentTable {
            n,
            vertex_count,
            parents: vec![None; vertex_count * n.saturating_sub(1)],
        }
    }

    /// Builds the table of a run where one unit owns every vertex, rows in index order.
    pub fn from_rows(n: usize, rows: LocalRows) -> Result<Self, TreeError> {
        let mut table = ParentTable::new(n, rows.len());
        for (v, row) in rows.into_iter().enumerate() {
            table.set_row(VertexId(v), row)?;
        }
        Ok(table)
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    pub fn tree_count(&self) -> usize {
        self.n.saturating_sub(1)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    fn slot(&self, v: VertexId, t: usize) -> Result<usize, TreeError> {
        if v.0 >= self.vertex_count {
            return Err(TreeError::InvalidVertex {
                vertex: v,
                vertex_count: self.vertex_count,
            });
        }
        if t == 0 || t >= self.n {
            return Err(TreeError::InvalidTreeIndex { t, n: self.n });
        }
        Ok(v.0 * self.tree_count() + t - 1)
    }

    /// Parent of `v` in tree `t`.
    pub fn get(&self, v: VertexId, t: usize) -> Result<Option<VertexId>, TreeError> {
        Ok(self.parents[self.slot(v, t)?])
    }

    pub fn set(&mut self, v: VertexId, t: usize, parent: Option<VertexId>) -> Result<(), TreeError> {
        let slot = self.slot(v, t)?;
        self.parents[slot] = parent;
        Ok(())
    }

    /// The parents of `v` in trees `1..n`.
    pub fn row(&self, v: VertexId) -> Option<&[Option<VertexId>]> {
        if v.0 >= self.vertex_count {
            return None;
        }
        let width = self.tree_count();
        Some(&self.parents[v.0 * width..(v.0 + 1) * width])
    }

    /// Overwrites the row of `v`. Missing trailing entries are left unset, extra ones
    /// are an [`TreeError::InvalidTreeIndex`].
    pub fn set_row<I>(&mut self, v: VertexId, row: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = Option<VertexId>>,
    {
        for (i, parent) in row.into_iter().enumerate() {
            self.set(v, i + 1, parent)?;
        }
        Ok(())
    }

    /// `(vertex, parent)` for every vertex in tree `t`, in index order.
    pub fn iter_tree(
        &self,
        t: usize,
    ) -> impl Iterator<Item = (VertexId, Option<VertexId>)> + '_ {
        let width = self.tree_count();
        let valid = t >= 1 && t < self.n;
        (0..self.vertex_count)
            .filter(move |_| valid)
            .map(move |v| (VertexId(v), self.parents[v * width + t - 1]))
    }

    /// Follows parent pointers in tree `t` from `v`, stopping at a vertex without
    /// parent or after `vertex_count` steps, whichever comes first. The start vertex
    /// is included.
    pub fn path_to_root(&self, v: VertexId, t: usize) -> Result<Vec<VertexId>, TreeError> {
        let mut path = vec![v];
        let mut current = v;
        while let Some(parent) = self.get(current, t)? {
            if path.len() > self.vertex_count {
                break;
            }
            path.push(parent);
            current = parent;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod test;
