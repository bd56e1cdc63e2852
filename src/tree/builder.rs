use rayon::prelude::*;

use super::{parent_of, ParentSelector, TreeError};
use crate::{
    graph::{BubbleSortGraph, VertexId},
    observe::{Event, UnitObserver},
};

/// One row of `n - 1` parent selections per local vertex, in the order the
/// vertices were given.
pub type LocalRows = Vec<Vec<Option<VertexId>>>;

/// Computes parent pointers for a unit's share of the vertices.
///
/// Rows are computed on the current rayon pool; run [`LocalTreeBuilder::build`]
/// inside [`rayon::ThreadPool::install`] to pin it to a unit's own workers.
pub struct LocalTreeBuilder<'a, S: ?Sized> {
    graph: &'a BubbleSortGraph,
    selector: &'a S,
    observer: UnitObserver<'a>,
}

impl<'a, S: ParentSelector + ?Sized> LocalTreeBuilder<'a, S> {
    pub fn new(graph: &'a BubbleSortGraph, selector: &'a S, observer: UnitObserver<'a>) -> Self {
        LocalTreeBuilder {
            graph,
            selector,
            observer,
        }
    }

    /// The first invalid vertex aborts the build.
    pub fn build(&self, local_vertices: &[VertexId]) -> Result<LocalRows, TreeError> {
        let graph = self.graph;
        let selector = self.selector;

        let rows: LocalRows = local_vertices
            .par_iter()
            .map(|&v| {
                if !graph.contains(v) {
                    return Err(TreeError::InvalidVertex {
                        vertex: v,
                        vertex_count: graph.vertex_count(),
                    });
                }
                (1..graph.dimension())
                    .map(|t| parent_of(graph, selector, v, t))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<_, _>>()?;

        self.observer.emit(Event::LocalBuilt {
            vertices: rows.len(),
            trees: graph.generator_count(),
        });
        Ok(rows)
    }
}
