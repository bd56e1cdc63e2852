//! Merging every unit's local rows into one [`ParentTable`] on the root.
//!
//! Units never send vertex identities. Each sends its rows flattened in the
//! order of [`PartitionMap::local_vertices`], and the root recomputes that
//! order for every rank to put each parent back in its `(vertex, tree)` slot.

use thiserror::Error;

use crate::{
    comm::{CommError, Communicator, GatherLayout},
    graph::VertexId,
    observe::{Event, UnitObserver},
    partition::PartitionMap,
    tree::{LocalRows, ParentTable, TreeError},
};

/// Wire value of a missing parent.
pub const NO_PARENT: u64 = u64::MAX;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Unit {rank} holds vertices that differ from its share of the partition")]
    OrderingMismatch { rank: usize },
    #[error("Unit {rank} contributed {got} parent slots, expected {expected}")]
    LengthMismatch {
        rank: usize,
        got: usize,
        expected: usize,
    },
    #[error("{units} units took part in a gather over a {nparts}-way partition")]
    UnitCountMismatch { units: usize, nparts: usize },
    #[error("Parent slot {index} holds {value}, which is not a vertex")]
    CorruptPayload { index: usize, value: u64 },
    #[error(transparent)]
    Comm(#[from] CommError),
    #[error(transparent)]
    Table(#[from] TreeError),
}

fn encode(parent: Option<VertexId>) -> u64 {
    parent.map_or(NO_PARENT, |v| v.0 as u64)
}

fn decode(value: u64, index: usize, vertex_count: usize) -> Result<Option<VertexId>, AggregateError> {
    if value == NO_PARENT {
        return Ok(None);
    }
    match usize::try_from(value) {
        Ok(v) if v < vertex_count => Ok(Some(VertexId(v))),
        _ => Err(AggregateError::CorruptPayload { index, value }),
    }
}

/// Collective: every unit calls it with its own rows. Returns the merged table
/// on the root and `None` on every other unit.
///
/// `local_rows[i]` must hold the `n - 1` parents of `local_vertices[i]`, and
/// `local_vertices` must be exactly `partition.local_vertices(comm.rank())`.
pub fn gather<C: Communicator + ?Sized>(
    comm: &mut C,
    local_rows: &LocalRows,
    local_vertices: &[VertexId],
    partition: &PartitionMap,
    vertex_count: usize,
    n: usize,
    observer: UnitObserver<'_>,
) -> Result<Option<ParentTable>, AggregateError> {
    let rank = comm.rank();
    let width = n.saturating_sub(1);

    if partition.local_vertices(rank) != local_vertices {
        return Err(AggregateError::OrderingMismatch { rank });
    }

    let expected = local_vertices.len() * width;
    let payload: Vec<u64> = local_rows.iter().flatten().copied().map(encode).collect();
    if local_rows.len() != local_vertices.len() || payload.len() != expected {
        return Err(AggregateError::LengthMismatch {
            rank,
            got: payload.len(),
            expected,
        });
    }

    let layout = match comm.gather_counts(payload.len())? {
        Some(counts) => {
            if counts.len() != partition.nparts() {
                return Err(AggregateError::UnitCountMismatch {
                    units: counts.len(),
                    nparts: partition.nparts(),
                });
            }
            for (r, &count) in counts.iter().enumerate() {
                let expected = partition.local_vertices(r).len() * width;
                if count != expected {
                    return Err(AggregateError::LengthMismatch {
                        rank: r,
                        got: count,
                        expected,
                    });
                }
            }
            let layout = GatherLayout::from_counts(counts);
            observer.emit(Event::Displacements {
                displacements: layout.displacements().to_vec(),
            });
            Some(layout)
        }
        None => None,
    };

    let Some(buffer) = comm.gather_payload(&payload, layout.as_ref())? else {
        return Ok(None);
    };
    let Some(layout) = layout else {
        return Err(CommError::ProtocolMismatch {
            rank,
            detail: "received a gathered payload without having gathered counts".into(),
        }
        .into());
    };

    let mut table = ParentTable::new(n, vertex_count);
    if width > 0 {
        for (r, &start) in layout.displacements().iter().enumerate() {
            let slice = &buffer[start..start + layout.counts()[r]];
            for (i, (v, row)) in partition
                .local_vertices(r)
                .into_iter()
                .zip(slice.chunks(width))
                .enumerate()
            {
                let offset = start + i * width;
                let parents = row
                    .iter()
                    .enumerate()
                    .map(|(t, &value)| decode(value, offset + t, vertex_count))
                    .collect::<Result<Vec<_>, _>>()?;
                table.set_row(v, parents)?;
            }
        }
    }

    observer.emit(Event::Gathered {
        units: layout.counts().len(),
        elements: buffer.len(),
    });
    Ok(Some(table))
}
