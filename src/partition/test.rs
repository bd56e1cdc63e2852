use proptest::prelude::*;

use super::{kway::edge_cut, *};
use crate::observe::{MemorySink, NullSink};

fn observer(sink: &dyn crate::observe::EventSink) -> UnitObserver<'_> {
    UnitObserver::new(sink, 0)
}

struct Unreachable;

impl GraphPartitioner for Unreachable {
    fn partition(&self, _: &CsrEncoding, _: usize) -> Result<Partitioning, PartitionError> {
        panic!("the single-bucket fallback must not call the partitioner")
    }
}

struct Failing;

impl GraphPartitioner for Failing {
    fn partition(&self, _: &CsrEncoding, _: usize) -> Result<Partitioning, PartitionError> {
        Err(PartitionError::Partitioning("library reported an error".into()))
    }
}

struct OutOfRange;

impl GraphPartitioner for OutOfRange {
    fn partition(&self, csr: &CsrEncoding, nparts: usize) -> Result<Partitioning, PartitionError> {
        Ok(Partitioning {
            parts: vec![nparts; csr.vertex_count()],
            objval: 0,
        })
    }
}

#[test]
fn encode_b3() {
    let graph = BubbleSortGraph::build(3).unwrap();
    let csr = CsrEncoding::encode(&graph).unwrap();

    assert_eq!(csr.offsets(), &[0, 2, 4, 6, 8, 10, 12]);
    // 123 -> 213, 132 ; 132 -> 312, 123 ; 213 -> 123, 231 ; ...
    assert_eq!(csr.columns(), &[2, 1, 4, 0, 0, 3, 5, 2, 1, 5, 3, 4]);
    assert_eq!(csr.vertex_count(), 6);
    assert_eq!(csr.neighbors(3), &[5, 2]);
}

#[test]
fn encoding_violations() {
    assert_eq!(
        CsrEncoding::from_parts(vec![0, 2, 1, 3], vec![1, 2, 0], 3),
        Err(PartitionError::InvalidGraphEncoding(
            EncodingViolation::DecreasingOffset {
                index: 1,
                offset: 2,
                next: 1
            }
        ))
    );
    assert!(matches!(
        CsrEncoding::from_parts(vec![0, 1, 2], vec![1, 2], 2),
        Err(PartitionError::InvalidGraphEncoding(
            EncodingViolation::ColumnOutOfRange { index: 1, column: 2, .. }
        ))
    ));
    assert!(matches!(
        CsrEncoding::from_parts(vec![0, 1], vec![0], 2),
        Err(PartitionError::InvalidGraphEncoding(
            EncodingViolation::OffsetsLength { got: 2, expected: 3 }
        ))
    ));
    assert!(matches!(
        CsrEncoding::from_parts(vec![1, 1, 2], vec![0, 1], 2),
        Err(PartitionError::InvalidGraphEncoding(
            EncodingViolation::LeadingOffset(1)
        ))
    ));
    assert!(matches!(
        CsrEncoding::from_parts(vec![0, 1, 1], vec![0, 1], 2),
        Err(PartitionError::InvalidGraphEncoding(
            EncodingViolation::TrailingOffset { offset: 1, columns: 2 }
        ))
    ));
}

#[test]
fn single_unit_bypasses_partitioner() {
    let graph = BubbleSortGraph::build(4).unwrap();
    let map = partition_graph(&graph, 1, &Unreachable, observer(&NullSink)).unwrap();
    assert_eq!(map.as_slice(), &[0; 24]);
    assert_eq!(map.edge_cut(), None);
}

#[test]
fn tiny_graphs_bypass_partitioner() {
    for n in 1..=2 {
        let graph = BubbleSortGraph::build(n).unwrap();
        for nparts in [2, 3, 8] {
            let map = partition_graph(&graph, nparts, &Unreachable, observer(&NullSink)).unwrap();
            assert!(map.as_slice().iter().all(|&u| u == 0));
            assert_eq!(map.nparts(), nparts);
            assert!(map.local_vertices(1).is_empty());
        }
    }
}

#[test]
fn zero_parts_is_an_error() {
    let graph = BubbleSortGraph::build(3).unwrap();
    assert!(matches!(
        partition_graph(&graph, 0, &KwayPartitioner::default(), observer(&NullSink)),
        Err(PartitionError::Partitioning(_))
    ));
}

#[test]
fn partitioner_failures_propagate() {
    let graph = BubbleSortGraph::build(3).unwrap();
    assert_eq!(
        partition_graph(&graph, 2, &Failing, observer(&NullSink)),
        Err(PartitionError::Partitioning("library reported an error".into()))
    );
    assert!(matches!(
        partition_graph(&graph, 2, &OutOfRange, observer(&NullSink)),
        Err(PartitionError::Partitioning(_))
    ));
}

#[test]
fn kway_balances_b5() {
    let graph = BubbleSortGraph::build(5).unwrap();
    let partitioner = KwayPartitioner::default();
    let map = partition_graph(&graph, 4, &partitioner, observer(&NullSink)).unwrap();

    let capacity = partitioner.capacity(120, 4);
    assert_eq!(capacity, 31);
    let sizes = map.sizes();
    assert_eq!(sizes.iter().sum::<usize>(), 120);
    assert!(sizes.iter().all(|&s| s <= capacity), "{sizes:?}");
    assert!(sizes.iter().all(|&s| s > 0), "{sizes:?}");
}

#[test]
fn refinement_never_increases_cut() {
    let graph = BubbleSortGraph::build(5).unwrap();
    let csr = CsrEncoding::encode(&graph).unwrap();
    for nparts in [2, 3, 5, 7] {
        let grown = KwayPartitioner::new(KwayConfig {
            niter: 0,
            ..KwayConfig::default()
        })
        .partition(&csr, nparts)
        .unwrap();
        let refined = KwayPartitioner::default().partition(&csr, nparts).unwrap();

        assert_eq!(grown.objval, edge_cut(&csr, &grown.parts));
        assert_eq!(refined.objval, edge_cut(&csr, &refined.parts));
        assert!(refined.objval <= grown.objval);
    }
}

#[test]
fn every_vertex_its_own_part() {
    let graph = BubbleSortGraph::build(4).unwrap();
    let map = partition_graph(&graph, 24, &KwayPartitioner::default(), observer(&NullSink)).unwrap();
    let mut units = map.as_slice().to_vec();
    units.sort_unstable();
    assert_eq!(units, (0..24).collect::<Vec<_>>());
}

#[test]
fn local_vertices_cover_the_graph_in_order() {
    let graph = BubbleSortGraph::build(5).unwrap();
    let map = partition_graph(&graph, 3, &KwayPartitioner::default(), observer(&NullSink)).unwrap();

    let mut seen = Vec::new();
    for unit in 0..3 {
        let local = map.local_vertices(unit);
        assert!(local.windows(2).all(|w| w[0] < w[1]));
        assert!(local.iter().all(|&v| map.unit_of(v) == Some(unit)));
        seen.extend(local);
    }
    seen.sort_unstable();
    assert_eq!(seen, graph.iter_vertices().map(|(v, _)| v).collect::<Vec<_>>());
}

#[test]
fn partition_reports_events() {
    let graph = BubbleSortGraph::build(4).unwrap();
    let sink = MemorySink::new();
    let map = partition_graph(&graph, 2, &KwayPartitioner::default(), observer(&sink)).unwrap();

    let events = sink.events_of(0);
    assert_eq!(
        events[0],
        Event::Encoded {
            offsets: 25,
            columns: 72
        }
    );
    assert_eq!(
        events[1],
        Event::Partitioned {
            parts: 2,
            edge_cut: map.edge_cut(),
            sizes: map.sizes()
        }
    );
}

#[test]
fn seeded_refinement_repeats() {
    let graph = BubbleSortGraph::build(5).unwrap();
    let csr = CsrEncoding::encode(&graph).unwrap();
    for seed in [0, 7, u64::MAX] {
        let config = KwayConfig {
            ncuts: 3,
            seed,
            ..KwayConfig::default()
        };
        let first = KwayPartitioner::new(config.clone()).partition(&csr, 3).unwrap();
        let second = KwayPartitioner::new(config).partition(&csr, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.objval, edge_cut(&csr, &first.parts));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn partition_map_is_a_pure_function(n in 1usize..=5, choice in 0usize..3) {
        let graph = BubbleSortGraph::build(n).unwrap();
        let nparts = [1, 2, graph.vertex_count()][choice];

        // Two independently constructed graphs and partitioners, as two units would have.
        let other = BubbleSortGraph::build(n).unwrap();
        let a = partition_graph(&graph, nparts, &KwayPartitioner::default(), observer(&NullSink)).unwrap();
        let b = partition_graph(&other, nparts, &KwayPartitioner::default(), observer(&NullSink)).unwrap();
        prop_assert_eq!(a, b);
    }
}
