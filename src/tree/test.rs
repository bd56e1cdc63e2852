use proptest::prelude::*;

use super::{selector::Strategy, verify::*, *};
use crate::observe::{Event, MemorySink, NullSink, UnitObserver};

fn all_vertices(graph: &BubbleSortGraph) -> Vec<VertexId> {
    graph.iter_vertices().map(|(v, _)| v).collect()
}

fn table<S: ParentSelector>(graph: &BubbleSortGraph, selector: &S) -> ParentTable {
    let rows = LocalTreeBuilder::new(graph, selector, UnitObserver::new(&NullSink, 0))
        .build(&all_vertices(graph))
        .unwrap();
    ParentTable::from_rows(graph.dimension(), rows).unwrap()
}

fn rendered(graph: &BubbleSortGraph, table: &ParentTable, t: usize) -> Vec<String> {
    table
        .iter_tree(t)
        .filter_map(|(v, p)| {
            let p = p?;
            Some(format!(
                "{}->{}",
                graph.permutation(v)?,
                graph.permutation(p)?
            ))
        })
        .collect()
}

#[test]
fn parent_of_validates_arguments() {
    let graph = BubbleSortGraph::build(3).unwrap();
    assert_eq!(
        parent_of(&graph, &FirstNeighbor, VertexId(6), 1),
        Err(TreeError::InvalidVertex {
            vertex: VertexId(6),
            vertex_count: 6
        })
    );
    assert_eq!(
        parent_of(&graph, &FirstNeighbor, VertexId(0), 0),
        Err(TreeError::InvalidTreeIndex { t: 0, n: 3 })
    );
    assert_eq!(
        parent_of(&graph, &FirstNeighbor, VertexId(0), 3),
        Err(TreeError::InvalidTreeIndex { t: 3, n: 3 })
    );
    assert_eq!(
        parent_of(&graph, &FirstNeighbor, VertexId(0), 2),
        Ok(Some(VertexId(1)))
    );
}

#[test]
fn first_neighbor_b3() {
    let graph = BubbleSortGraph::build(3).unwrap();
    let table = table(&graph, &FirstNeighbor);

    assert_eq!(table.get(graph.root(), 1), Ok(Some(VertexId(2))));
    assert_eq!(
        rendered(&graph, &table, 2),
        ["123->132", "132->123", "213->231", "231->213", "312->321", "321->312"]
    );
}

#[test]
fn sorting_descent_b3() {
    let graph = BubbleSortGraph::build(3).unwrap();
    let table = table(&graph, &SortingDescent);

    assert_eq!(table.row(graph.root()), Some(&[None, None][..]));
    assert_eq!(
        rendered(&graph, &table, 1),
        ["132->123", "213->123", "231->213", "312->132", "321->231"]
    );
    assert_eq!(
        rendered(&graph, &table, 2),
        ["132->123", "213->123", "231->213", "312->132", "321->312"]
    );
}

#[test]
fn strategy_dispatches() {
    let graph = BubbleSortGraph::build(4).unwrap();
    assert_eq!(table(&graph, &Strategy::FirstNeighbor), table(&graph, &FirstNeighbor));
    assert_eq!(table(&graph, &Strategy::SortingDescent), table(&graph, &SortingDescent));
    assert_eq!(Strategy::default(), Strategy::FirstNeighbor);
    assert_eq!(Strategy::SortingDescent.to_string(), "sorting-descent");
}

#[test]
fn builder_keeps_the_given_order() {
    let graph = BubbleSortGraph::build(4).unwrap();
    let sink = MemorySink::new();
    let local = [VertexId(17), VertexId(3), VertexId(9)];
    let rows = LocalTreeBuilder::new(&graph, &FirstNeighbor, UnitObserver::new(&sink, 2))
        .build(&local)
        .unwrap();

    for (v, row) in local.iter().zip(&rows) {
        let expected: Vec<_> = graph.neighbors(*v).unwrap().iter().copied().map(Some).collect();
        assert_eq!(row, &expected);
    }
    assert_eq!(
        sink.events_of(2),
        vec![Event::LocalBuilt {
            vertices: 3,
            trees: 3
        }]
    );
}

#[test]
fn builder_rejects_foreign_vertices() {
    for n in [1, 3] {
        let graph = BubbleSortGraph::build(n).unwrap();
        let sink = MemorySink::new();
        let result = LocalTreeBuilder::new(&graph, &SortingDescent, UnitObserver::new(&sink, 0))
            .build(&[VertexId(0), VertexId(99)]);
        assert!(matches!(
            result,
            Err(TreeError::InvalidVertex {
                vertex: VertexId(99),
                ..
            })
        ));
        assert!(sink.events().is_empty());
    }
}

#[test]
fn table_accessors() {
    let mut table = ParentTable::new(3, 6);
    assert_eq!(table.tree_count(), 2);
    assert_eq!(table.get(VertexId(4), 2), Ok(None));

    table.set(VertexId(4), 2, Some(VertexId(5))).unwrap();
    assert_eq!(table.row(VertexId(4)), Some(&[None, Some(VertexId(5))][..]));
    assert_eq!(
        table.set(VertexId(6), 1, None),
        Err(TreeError::InvalidVertex {
            vertex: VertexId(6),
            vertex_count: 6
        })
    );
    assert_eq!(
        table.set_row(VertexId(0), [None, None, None]),
        Err(TreeError::InvalidTreeIndex { t: 3, n: 3 })
    );
    assert_eq!(table.iter_tree(0).count(), 0);
    assert_eq!(table.iter_tree(2).count(), 6);
}

#[test]
fn first_neighbor_is_not_a_tree() {
    let graph = BubbleSortGraph::build(3).unwrap();
    let table = table(&graph, &FirstNeighbor);
    assert_eq!(
        check_tree(&graph, &table, 1),
        Err(Violation::RootHasParent {
            t: 1,
            parent: VertexId(2)
        })
    );

    // With the root fixed, the swap pairs still point at each other.
    let mut table = table;
    table.set_row(graph.root(), [None, None]).unwrap();
    assert_eq!(
        check_tree(&graph, &table, 1),
        Err(Violation::Cycle {
            t: 1,
            vertex: VertexId(1),
            repeated: VertexId(1)
        })
    );
}

#[test]
fn detects_broken_tables() {
    let graph = BubbleSortGraph::build(3).unwrap();
    let mut table = table(&graph, &SortingDescent);

    table.set(VertexId(5), 1, None).unwrap();
    assert_eq!(
        check_tree(&graph, &table, 1),
        Err(Violation::MissingParent {
            t: 1,
            vertex: VertexId(5)
        })
    );

    // 213 -> 231 -> 213
    table.set(VertexId(2), 2, Some(VertexId(3))).unwrap();
    assert_eq!(
        check_tree(&graph, &table, 2),
        Err(Violation::Cycle {
            t: 2,
            vertex: VertexId(2),
            repeated: VertexId(2)
        })
    );

    // 123 and 321 are not adjacent
    table.set(VertexId(4), 1, Some(VertexId(0))).unwrap();
    table.set(VertexId(5), 1, Some(VertexId(0))).unwrap();
    assert_eq!(
        check_tree(&graph, &table, 1),
        Err(Violation::NotAdjacent {
            t: 1,
            vertex: VertexId(4),
            parent: VertexId(0)
        })
    );
}

#[test]
fn sorting_descent_is_not_independent() {
    let graph = BubbleSortGraph::build(3).unwrap();
    let table = table(&graph, &SortingDescent);
    assert_eq!(
        check_independence(&graph, &table),
        Err(Violation::NotIndependent {
            vertex: VertexId(3),
            trees: (1, 2),
            shared: VertexId(2)
        })
    );
}

#[test]
fn independence_holds_for_b2() {
    let graph = BubbleSortGraph::build(2).unwrap();
    let table = table(&graph, &SortingDescent);
    assert_eq!(check_independence(&graph, &table), Ok(()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn sorting_descent_spans(n in 1usize..=6) {
        let graph = BubbleSortGraph::build(n).unwrap();
        let table = table(&graph, &SortingDescent);
        for t in 1..n {
            prop_assert_eq!(check_tree(&graph, &table, t), Ok(()));
            prop_assert_eq!(table.get(graph.root(), t), Ok(None));
            for (v, _) in graph.iter_vertices().skip(1) {
                let path = table.path_to_root(v, t).unwrap();
                let inversions = graph.permutation(v).unwrap().inversions();
                prop_assert_eq!(path.len(), inversions + 1);
            }
        }
    }
}
