//! Checks of a [`ParentTable`] against the spanning-tree and independence
//! properties. Each check reports the first violation, scanning trees in
//! order and vertices by ascending index.

use ahash::AHashSet;
use thiserror::Error;

use super::{ParentTable, TreeError};
use crate::graph::{BubbleSortGraph, VertexId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("root has parent {parent} in tree {t}")]
    RootHasParent { t: usize, parent: VertexId },
    #[error("vertex {vertex} has no parent in tree {t}")]
    MissingParent { t: usize, vertex: VertexId },
    #[error("parent {parent} of vertex {vertex} in tree {t} is not a neighbour")]
    NotAdjacent {
        t: usize,
        vertex: VertexId,
        parent: VertexId,
    },
    #[error("following tree {t} from vertex {vertex} revisits {repeated}")]
    Cycle {
        t: usize,
        vertex: VertexId,
        repeated: VertexId,
    },
    #[error("root paths of vertex {vertex} in trees {} and {} share {shared}", .trees.0, .trees.1)]
    NotIndependent {
        vertex: VertexId,
        trees: (usize, usize),
        shared: VertexId,
    },
    #[error(transparent)]
    Table(#[from] TreeError),
}

/// Checks that tree `t` is a spanning tree of `graph` rooted at its root.
pub fn check_tree(graph: &BubbleSortGraph, table: &ParentTable, t: usize) -> Result<(), Violation> {
    let root = graph.root();
    if let Some(parent) = table.get(root, t)? {
        return Err(Violation::RootHasParent { t, parent });
    }

    // reaches[u]: u is known to lead to the root.
    let mut reaches = vec![false; graph.vertex_count()];
    reaches[root.0] = true;
    // stamp[u] == v + 1: u lies on the walk started at v.
    let mut stamp = vec![0usize; graph.vertex_count()];

    for (v, _) in graph.iter_vertices() {
        let mut walk = Vec::new();
        let mut current = v;
        while !reaches[current.0] {
            if stamp[current.0] == v.0 + 1 {
                return Err(Violation::Cycle {
                    t,
                    vertex: v,
                    repeated: current,
                });
            }
            stamp[current.0] = v.0 + 1;
            walk.push(current);

            let parent = table.get(current, t)?.ok_or(Violation::MissingParent {
                t,
                vertex: current,
            })?;
            let adjacent = graph
                .neighbors(current)
                .is_some_and(|neighbors| neighbors.contains(&parent));
            if !adjacent {
                return Err(Violation::NotAdjacent {
                    t,
                    vertex: current,
                    parent,
                });
            }
            current = parent;
        }
        for u in walk {
            reaches[u.0] = true;
        }
    }
    Ok(())
}

/// Checks every tree with [`check_tree`], then that for every vertex the root
/// paths of different trees share no vertex other than their endpoints.
pub fn check_independence(graph: &BubbleSortGraph, table: &ParentTable) -> Result<(), Violation> {
    let trees = 1..graph.dimension();
    for t in trees.clone() {
        check_tree(graph, table, t)?;
    }

    let root = graph.root();
    for (v, _) in graph.iter_vertices() {
        if v == root {
            continue;
        }
        let interiors = trees
            .clone()
            .map(|t| {
                let path = table.path_to_root(v, t)?;
                Ok(path[1..path.len() - 1].to_vec())
            })
            .collect::<Result<Vec<_>, TreeError>>()?;

        for (i, first) in interiors.iter().enumerate() {
            for (j, second) in interiors.iter().enumerate().skip(i + 1) {
                let second: AHashSet<_> = second.iter().collect();
                if let Some(&shared) = first.iter().find(|u| second.contains(u)) {
                    return Err(Violation::NotIndependent {
                        vertex: v,
                        trees: (i + 1, j + 1),
                        shared,
                    });
                }
            }
        }
    }
    Ok(())
}
