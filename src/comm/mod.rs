//! Message passing between compute units.
//!
//! Units share nothing; they only meet in collectives, which every unit must
//! enter in the same order. Rank 0 is the root of every collective.
//!
//! *   [`SingleUnit`]: a world of one.
//! *   [`ThreadWorld`]: one thread per unit, connected by channels.

use thiserror::Error;

pub mod threaded;

pub use threaded::{ThreadUnit, ThreadWorld};

/// The rank that receives every gather.
pub const ROOT: usize = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    #[error("Run aborted: unit {rank} failed: {reason}")]
    Aborted { rank: usize, reason: String },
    #[error("Protocol mismatch on unit {rank}: {detail}")]
    ProtocolMismatch { rank: usize, detail: String },
    #[error("Unit {rank} left before completing the collective")]
    Disconnected { rank: usize },
}

/// Where each unit's slice lands in a gathered buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherLayout {
    counts: Vec<usize>,
    displacements: Vec<usize>,
}

impl GatherLayout {
    /// Places slices back to back in rank order.
    ///
    /// ```
    /// # use bubble_ist::comm::GatherLayout;
    /// let layout = GatherLayout::from_counts(vec![4, 0, 2]);
    /// assert_eq!(layout.displacements(), &[0, 4, 4]);
    /// assert_eq!(layout.total(), 6);
    /// ```
    pub fn from_counts(counts: Vec<usize>) -> Self {
        let displacements = counts
            .iter()
            .scan(0, |offset, &count| {
                let start = *offset;
                *offset += count;
                Some(start)
            })
            .collect();
        GatherLayout {
            counts,
            displacements,
        }
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn displacements(&self) -> &[usize] {
        &self.displacements
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Copies every rank's slice into one buffer. `slices[r]` must hold exactly
    /// `counts[r]` elements.
    pub(crate) fn assemble(&self, rank: usize, slices: Vec<Vec<u64>>) -> Result<Vec<u64>, CommError> {
        if slices.len() != self.counts.len() {
            return Err(CommError::ProtocolMismatch {
                rank,
                detail: format!(
                    "layout describes {} units, received {}",
                    self.counts.len(),
                    slices.len()
                ),
            });
        }
        let mut buffer = vec![0; self.total()];
        for (from, slice) in slices.into_iter().enumerate() {
            if slice.len() != self.counts[from] {
                return Err(CommError::ProtocolMismatch {
                    rank,
                    detail: format!(
                        "unit {from} sent {} elements, announced {}",
                        slice.len(),
                        self.counts[from]
                    ),
                });
            }
            let start = self.displacements[from];
            buffer[start..start + slice.len()].copy_from_slice(&slice);
        }
        Ok(buffer)
    }
}

/// A group of units taking part in collectives.
///
/// Every collective returns `Some` on the root and `None` elsewhere, except
/// [`Communicator::checkpoint`], whose verdict every unit receives.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }

    /// Shares every unit's local status. Fails with [`CommError::Aborted`], naming
    /// the lowest failed rank, on all units as soon as any unit reports an error.
    fn checkpoint(&mut self, status: Result<(), String>) -> Result<(), CommError>;

    /// Gathers one length per unit on the root, in rank order.
    fn gather_counts(&mut self, len: usize) -> Result<Option<Vec<usize>>, CommError>;

    /// Gathers variable-length payloads on the root, each at its displacement in
    /// `layout`. Only the root passes a layout.
    fn gather_payload(
        &mut self,
        data: &[u64],
        layout: Option<&GatherLayout>,
    ) -> Result<Option<Vec<u64>>, CommError>;
}

/// The world of a single unit, which is its own root.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleUnit;

impl Communicator for SingleUnit {
    fn rank(&self) -> usize {
        ROOT
    }

    fn size(&self) -> usize {
        1
    }

    fn checkpoint(&mut self, status: Result<(), String>) -> Result<(), CommError> {
        status.map_err(|reason| CommError::Aborted { rank: ROOT, reason })
    }

    fn gather_counts(&mut self, len: usize) -> Result<Option<Vec<usize>>, CommError> {
        Ok(Some(vec![len]))
    }

    fn gather_payload(
        &mut self,
        data: &[u64],
        layout: Option<&GatherLayout>,
    ) -> Result<Option<Vec<u64>>, CommError> {
        let layout = layout.ok_or_else(|| CommError::ProtocolMismatch {
            rank: ROOT,
            detail: "the root must provide a gather layout".into(),
        })?;
        layout.assemble(ROOT, vec![data.to_vec()]).map(Some)
    }
}
