//! [`GraphPartitioner`] backed by the METIS library, enabled with the `metis`
//! feature. It takes its balance, pass, candidate and seed settings from
//! [`KwayConfig`] like the native partitioner, but its partitions are not
//! guaranteed to match it.

use ::metis::{
    option::{NCuts, NIter, Seed, UFactor},
    Graph, Idx,
};

use super::{CsrEncoding, GraphPartitioner, KwayConfig, PartitionError, Partitioning};

#[derive(Debug, Clone, Default)]
pub struct MetisPartitioner {
    config: KwayConfig,
}

impl MetisPartitioner {
    pub fn new(config: KwayConfig) -> Self {
        MetisPartitioner { config }
    }
}

fn idx(value: usize) -> Result<Idx, PartitionError> {
    Idx::try_from(value).map_err(|_| {
        PartitionError::Partitioning(format!("{value} does not fit the METIS index type"))
    })
}

fn to_idx(values: &[usize]) -> Result<Vec<Idx>, PartitionError> {
    values.iter().map(|&v| idx(v)).collect()
}

/// METIS expresses the tolerance in thousandths above perfect balance.
fn ufactor(ubfactor: f64) -> Idx {
    ((ubfactor - 1.0) * 1000.0).round().max(1.0) as Idx
}

impl GraphPartitioner for MetisPartitioner {
    fn partition(&self, csr: &CsrEncoding, nparts: usize) -> Result<Partitioning, PartitionError> {
        if nparts == 0 {
            return Err(PartitionError::Partitioning(
                "number of parts must be positive".into(),
            ));
        }
        let xadj = to_idx(csr.offsets())?;
        let adjncy = to_idx(csr.columns())?;
        let seed = Idx::try_from(self.config.seed).map_err(|_| {
            PartitionError::Partitioning(format!(
                "seed {} does not fit the METIS index type",
                self.config.seed
            ))
        })?;

        let mut part: Vec<Idx> = vec![0; csr.vertex_count()];
        let objval = Graph::new(1, idx(nparts)?, &xadj, &adjncy)
            .map_err(|err| PartitionError::Partitioning(err.to_string()))?
            .set_option(UFactor(ufactor(self.config.ubfactor)))
            .set_option(NIter(idx(self.config.niter)?))
            .set_option(NCuts(idx(self.config.ncuts)?))
            .set_option(Seed(seed))
            .part_kway(&mut part)
            .map_err(|err| PartitionError::Partitioning(err.to_string()))?;

        let parts = part
            .into_iter()
            .map(|p| {
                usize::try_from(p)
                    .map_err(|_| PartitionError::Partitioning(format!("METIS returned part {p}")))
            })
            .collect::<Result<_, _>>()?;
        let objval = usize::try_from(objval).map_err(|_| {
            PartitionError::Partitioning(format!("METIS returned edge cut {objval}"))
        })?;
        Ok(Partitioning { parts, objval })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        graph::BubbleSortGraph,
        observe::{NullSink, UnitObserver},
        partition::{kway::edge_cut, partition_graph},
    };

    #[test]
    fn ufactor_in_thousandths() {
        assert_eq!(ufactor(1.05), 50);
        assert_eq!(ufactor(1.0), 1);
    }

    #[test]
    fn partitions_b5() {
        let graph = BubbleSortGraph::build(5).unwrap();
        let csr = CsrEncoding::encode(&graph).unwrap();
        let result = MetisPartitioner::default().partition(&csr, 4).unwrap();

        assert_eq!(result.parts.len(), 120);
        assert!(result.parts.iter().all(|&p| p < 4));
        assert_eq!(result.objval, edge_cut(&csr, &result.parts));

        let map = partition_graph(
            &graph,
            4,
            &MetisPartitioner::default(),
            UnitObserver::new(&NullSink, 0),
        )
        .unwrap();
        assert_eq!(map.sizes().iter().sum::<usize>(), 120);
    }
}
