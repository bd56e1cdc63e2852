//! A deterministic multi-pass k-way partitioner minimising edge cut.
//!
//! The partition is grown greedily, breadth first, into parts of exactly
//! balanced size. A bounded number of refinement passes then moves boundary
//! vertices to the neighbouring part they are most connected to, as long as the
//! move strictly lowers the cut and keeps both parts within the balance
//! tolerance. Pass order is shuffled with a fixed-seed [`XorShiftRng`], whose
//! stream does not depend on the platform, so the same input yields the same
//! partition on every unit.

use std::collections::VecDeque;

use bitvec::vec::BitVec;
use rand::{seq::SliceRandom, SeedableRng};
use rand_xorshift::XorShiftRng;

use super::{CsrEncoding, GraphPartitioner, PartitionError, Partitioning};

#[derive(Debug, Clone, PartialEq)]
pub struct KwayConfig {
    /// Allowed load imbalance: a part may hold up to `ubfactor` times the average.
    pub ubfactor: f64,
    /// Upper bound on refinement passes.
    pub niter: usize,
    /// Number of candidate partitions computed; the one with the lowest cut wins.
    pub ncuts: usize,
    pub seed: u64,
}

impl Default for KwayConfig {
    fn default() -> Self {
        KwayConfig {
            ubfactor: 1.05,
            niter: 10,
            ncuts: 1,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KwayPartitioner {
    config: KwayConfig,
}

impl KwayPartitioner {
    pub fn new(config: KwayConfig) -> Self {
        KwayPartitioner { config }
    }

    /// Largest part size the refinement may produce.
    pub fn capacity(&self, vertex_count: usize, nparts: usize) -> usize {
        let average = vertex_count as f64 / nparts as f64;
        ((average * self.config.ubfactor).floor() as usize).max(vertex_count.div_ceil(nparts))
    }

    fn floor(&self, vertex_count: usize, nparts: usize) -> usize {
        let average = vertex_count as f64 / nparts as f64;
        ((average / self.config.ubfactor).floor() as usize).min(vertex_count / nparts)
    }

    fn candidate(&self, csr: &CsrEncoding, nparts: usize, seed: u64) -> Partitioning {
        let vertex_count = csr.vertex_count();
        let mut parts = grow(csr, nparts);
        let mut sizes = vec![0usize; nparts];
        for &p in &parts {
            sizes[p] += 1;
        }

        let capacity = self.capacity(vertex_count, nparts);
        let floor = self.floor(vertex_count, nparts);
        let mut rng = XorShiftRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..vertex_count).collect();
        let mut connectivity: Vec<(usize, usize)> = Vec::new();

        for _ in 0..self.config.niter {
            order.shuffle(&mut rng);
            let mut moved = 0usize;

            for &v in &order {
                let home = parts[v];
                connectivity.clear();
                for &u in csr.neighbors(v) {
                    let p = parts[u];
                    match connectivity.iter_mut().find(|(q, _)| *q == p) {
                        Some((_, count)) => *count += 1,
                        None => connectivity.push((p, 1)),
                    }
                }
                let internal = connectivity
                    .iter()
                    .find(|(q, _)| *q == home)
                    .map_or(0, |(_, c)| *c);

                if sizes[home] <= floor {
                    continue;
                }
                let best = connectivity
                    .iter()
                    .filter(|(q, _)| *q != home && sizes[*q] < capacity)
                    .max_by(|(qa, ca), (qb, cb)| ca.cmp(cb).then(qb.cmp(qa)));

                if let Some(&(target, external)) = best {
                    if external > internal {
                        parts[v] = target;
                        sizes[home] -= 1;
                        sizes[target] += 1;
                        moved += 1;
                    }
                }
            }

            if moved == 0 {
                break;
            }
        }

        let objval = edge_cut(csr, &parts);
        Partitioning { parts, objval }
    }
}

impl GraphPartitioner for KwayPartitioner {
    fn partition(&self, csr: &CsrEncoding, nparts: usize) -> Result<Partitioning, PartitionError> {
        if nparts == 0 {
            return Err(PartitionError::Partitioning(
                "number of parts must be positive".into(),
            ));
        }
        if self.config.ubfactor.is_nan() || self.config.ubfactor < 1.0 {
            return Err(PartitionError::Partitioning(format!(
                "balance tolerance {} is below 1",
                self.config.ubfactor
            )));
        }
        if self.config.ncuts == 0 {
            return Err(PartitionError::Partitioning(
                "at least one candidate partition is required".into(),
            ));
        }

        let mut best: Option<Partitioning> = None;
        for attempt in 0..self.config.ncuts {
            let candidate = self.candidate(csr, nparts, self.config.seed.wrapping_add(attempt as u64));
            match &best {
                Some(b) if b.objval <= candidate.objval => {}
                _ => best = Some(candidate),
            }
        }
        best.ok_or_else(|| PartitionError::Partitioning("no candidate partition produced".into()))
    }
}

/// Breadth-first region growing from the lowest unassigned vertex, part by part,
/// until each part reaches its exact share of the vertices.
fn grow(csr: &CsrEncoding, nparts: usize) -> Vec<usize> {
    let vertex_count = csr.vertex_count();
    let mut parts = vec![0usize; vertex_count];
    let mut assigned: BitVec = BitVec::repeat(false, vertex_count);
    let mut cursor = 0usize;
    let mut queue = VecDeque::new();

    for p in 0..nparts {
        let target = vertex_count * (p + 1) / nparts - vertex_count * p / nparts;
        let mut filled = 0usize;
        queue.clear();

        while filled < target {
            let Some(v) = queue.pop_front() else {
                while cursor < vertex_count && assigned[cursor] {
                    cursor += 1;
                }
                if cursor == vertex_count {
                    break;
                }
                queue.push_back(cursor);
                continue;
            };
            if assigned[v] {
                continue;
            }
            assigned.set(v, true);
            parts[v] = p;
            filled += 1;
            queue.extend(csr.neighbors(v).iter().copied().filter(|&u| !assigned[u]));
        }
    }
    parts
}

/// Number of edges whose endpoints lie in different parts.
pub fn edge_cut(csr: &CsrEncoding, parts: &[usize]) -> usize {
    (0..csr.vertex_count())
        .map(|v| {
            csr.neighbors(v)
                .iter()
                .filter(|&&u| u > v && parts[u] != parts[v])
                .count()
        })
        .sum()
}
