//! Assignment of vertices to compute units.
//!
//! Every unit computes the [`PartitionMap`] on its own from the same graph and
//! unit count; it is never sent over the wire. This is only sound because
//! partitioning is a pure function of its inputs, and because
//! [`PartitionMap::local_vertices`] is the single ordering both the owning unit
//! and the aggregator use for a unit's vertices.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    graph::{BubbleSortGraph, VertexId},
    observe::{Event, UnitObserver},
};

pub mod csr;
pub mod kway;
#[cfg(feature = "metis")]
pub mod metis;

pub use csr::CsrEncoding;
pub use kway::{KwayConfig, KwayPartitioner};
#[cfg(feature = "metis")]
pub use self::metis::MetisPartitioner;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Invalid graph encoding: {0}")]
    InvalidGraphEncoding(EncodingViolation),
    #[error("Partitioning failed: {0}")]
    Partitioning(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingViolation {
    #[error("offsets has length {got}, expected {expected}")]
    OffsetsLength { got: usize, expected: usize },
    #[error("leading offset is {0}, expected 0")]
    LeadingOffset(usize),
    #[error("offsets[{index}] = {offset} > offsets[{following}] = {next}", following = .index + 1)]
    DecreasingOffset {
        index: usize,
        offset: usize,
        next: usize,
    },
    #[error("final offset {offset} does not match {columns} columns")]
    TrailingOffset { offset: usize, columns: usize },
    #[error("columns[{index}] = {column} is not below {vertex_count}")]
    ColumnOutOfRange {
        index: usize,
        column: usize,
        vertex_count: usize,
    },
}

/// Raw result of a partitioner: one part id per vertex and the edge cut achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partitioning {
    pub parts: Vec<usize>,
    pub objval: usize,
}

/// A k-way graph partitioner.
pub trait GraphPartitioner {
    /// Assigns each vertex of the encoded graph to one of `nparts` parts.
    /// Vertex `i` goes to part `parts[i]`.
    fn partition(&self, csr: &CsrEncoding, nparts: usize) -> Result<Partitioning, PartitionError>;
}

/// Total map from vertex to unit id in `0..nparts`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionMap {
    units: Vec<usize>,
    nparts: usize,
    edge_cut: Option<usize>,
}

impl PartitionMap {
    /// Everything on unit 0.
    pub fn single(vertex_count: usize, nparts: usize) -> Self {
        PartitionMap {
            units: vec![0; vertex_count],
            nparts,
            edge_cut: None,
        }
    }

    /// Checks that every entry lies in `0..nparts`.
    pub fn from_units(units: Vec<usize>, nparts: usize) -> Result<Self, PartitionError> {
        if let Some((v, &u)) = units.iter().enumerate().find(|(_, &u)| u >= nparts) {
            return Err(PartitionError::Partitioning(format!(
                "vertex {v} assigned to part {u}, expected a part below {nparts}"
            )));
        }
        Ok(PartitionMap {
            units,
            nparts,
            edge_cut: None,
        })
    }

    pub fn nparts(&self) -> usize {
        self.nparts
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit_of(&self, v: VertexId) -> Option<usize> {
        self.units.get(v.0).copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.units
    }

    /// Edge cut reported by the partitioner, when one ran.
    pub fn edge_cut(&self) -> Option<usize> {
        self.edge_cut
    }

    /// The vertices assigned to `unit`, in ascending index order.
    ///
    /// This is the ordering contract of the gather protocol: a unit builds its
    /// local rows in exactly this order, and the aggregator recomputes it to
    /// place each unit's rows.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bubble_ist::{graph::VertexId, partition::PartitionMap};
    /// let map = PartitionMap::from_units(vec![1, 0, 1, 0, 1], 2).unwrap();
    /// assert_eq!(map.local_vertices(1), vec![VertexId(0), VertexId(2), VertexId(4)]);
    /// ```
    pub fn local_vertices(&self, unit: usize) -> Vec<VertexId> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, &u)| u == unit)
            .map(|(v, _)| VertexId(v))
            .collect()
    }

    /// Number of vertices per unit.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.nparts];
        for &u in &self.units {
            sizes[u] += 1;
        }
        sizes
    }
}

/// Partitions `graph` across `nparts` units.
///
/// With a single unit, or a graph of at most two vertices, every vertex goes to
/// unit 0 and `partitioner` is never consulted.
pub fn partition_graph<P: GraphPartitioner + ?Sized>(
    graph: &BubbleSortGraph,
    nparts: usize,
    partitioner: &P,
    observer: UnitObserver<'_>,
) -> Result<PartitionMap, PartitionError> {
    if nparts == 0 {
        return Err(PartitionError::Partitioning(
            "number of parts must be positive".into(),
        ));
    }

    let vertex_count = graph.vertex_count();
    if nparts == 1 || vertex_count <= 2 {
        let map = PartitionMap::single(vertex_count, nparts);
        observer.emit(Event::Partitioned {
            parts: nparts,
            edge_cut: None,
            sizes: map.sizes(),
        });
        return Ok(map);
    }

    let csr = CsrEncoding::encode(graph)?;
    observer.emit(Event::Encoded {
        offsets: csr.offsets().len(),
        columns: csr.columns().len(),
    });

    let Partitioning { parts, objval } = partitioner.partition(&csr, nparts)?;
    if parts.len() != vertex_count {
        return Err(PartitionError::Partitioning(format!(
            "partitioner returned {} assignments for {vertex_count} vertices",
            parts.len()
        )));
    }
    let mut map = PartitionMap::from_units(parts, nparts)?;
    map.edge_cut = Some(objval);

    observer.emit(Event::Partitioned {
        parts: nparts,
        edge_cut: map.edge_cut,
        sizes: map.sizes(),
    });
    Ok(map)
}

#[cfg(test)]
mod test;
