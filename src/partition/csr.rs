//! Compressed sparse row encoding of the adjacency model, the input format of
//! k-way graph partitioners.

use serde::{Deserialize, Serialize};

use super::{EncodingViolation, PartitionError};
use crate::graph::BubbleSortGraph;

/// `offsets[i]..offsets[i + 1]` indexes the neighbours of vertex `i` in `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrEncoding {
    offsets: Vec<usize>,
    columns: Vec<usize>,
}

impl CsrEncoding {
    /// Flattens every vertex's neighbour block, generators in order, behind one leading
    /// `0` offset. The result is validated before it is returned.
    pub fn encode(graph: &BubbleSortGraph) -> Result<Self, PartitionError> {
        let mut offsets = Vec::with_capacity(graph.vertex_count() + 1);
        let mut columns = Vec::with_capacity(graph.vertex_count() * graph.generator_count());
        offsets.push(0);
        for (v, _) in graph.iter_vertices() {
            if let Some(neighbors) = graph.neighbors(v) {
                columns.extend(neighbors.iter().map(|u| u.0));
            }
            offsets.push(columns.len());
        }
        Self::from_parts(offsets, columns, graph.vertex_count())
    }

    /// Wraps raw arrays, checking them against `vertex_count`.
    pub fn from_parts(
        offsets: Vec<usize>,
        columns: Vec<usize>,
        vertex_count: usize,
    ) -> Result<Self, PartitionError> {
        let encoding = CsrEncoding { offsets, columns };
        encoding.validate(vertex_count)?;
        Ok(encoding)
    }

    pub fn validate(&self, vertex_count: usize) -> Result<(), PartitionError> {
        let violation = if self.offsets.len() != vertex_count + 1 {
            Some(EncodingViolation::OffsetsLength {
                got: self.offsets.len(),
                expected: vertex_count + 1,
            })
        } else if self.offsets[0] != 0 {
            Some(EncodingViolation::LeadingOffset(self.offsets[0]))
        } else if let Some(index) = self.offsets.windows(2).position(|w| w[0] > w[1]) {
            Some(EncodingViolation::DecreasingOffset {
                index,
                offset: self.offsets[index],
                next: self.offsets[index + 1],
            })
        } else if self.offsets[vertex_count] != self.columns.len() {
            Some(EncodingViolation::TrailingOffset {
                offset: self.offsets[vertex_count],
                columns: self.columns.len(),
            })
        } else {
            self.columns
                .iter()
                .position(|&c| c >= vertex_count)
                .map(|index| EncodingViolation::ColumnOutOfRange {
                    index,
                    column: self.columns[index],
                    vertex_count,
                })
        };

        match violation {
            Some(violation) => Err(PartitionError::InvalidGraphEncoding(violation)),
            None => Ok(()),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.columns[self.offsets[v]..self.offsets[v + 1]]
    }
}
