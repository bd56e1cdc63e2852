//! End-to-end run of one compute unit, and of a whole in-process world.
//!
//! Every unit builds the graph, partitions it and computes the rows of its own
//! vertices. The units then meet in a checkpoint: if any of them failed, all of
//! them stop with [`CommError::Aborted`] before the gather. Otherwise the rows
//! are gathered on the root, which alone writes the output file.
//!
//! Each unit times its stages with a monotonic clock and reports them as a
//! single [`Event::Timing`] at the end of a successful run.

use std::{path::PathBuf, time::Instant};

use thiserror::Error;

use crate::{
    aggregate::{self, AggregateError},
    comm::{CommError, Communicator, ThreadWorld},
    graph::{BubbleSortGraph, GraphError, VertexId},
    observe::{Event, EventSink, StageTimings, UnitObserver},
    output::{self, OutputError},
    partition::{
        partition_graph, GraphPartitioner, KwayConfig, KwayPartitioner, PartitionError,
        PartitionMap,
    },
    tree::{LocalRows, LocalTreeBuilder, ParentTable, Strategy, TreeError},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub dimension: usize,
    pub output_dir: PathBuf,
    /// Number of compute units.
    pub units: usize,
    /// Worker threads per unit; `None` leaves the choice to rayon.
    pub threads: Option<usize>,
    pub strategy: Strategy,
    pub partitioner: KwayConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            dimension: 3,
            output_dir: PathBuf::from("data/output"),
            units: 1,
            threads: None,
            strategy: Strategy::default(),
            partitioner: KwayConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_units(mut self, units: usize) -> Self {
        self.units = units;
        self
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_partitioner(mut self, partitioner: KwayConfig) -> Self {
        self.partitioner = partitioner;
        self
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Comm(#[from] CommError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error("Failed to start the worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("At least one compute unit is required")]
    NoUnits,
    #[error("No unit produced the merged table")]
    MissingReport,
}

/// What the root knows at the end of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub table: ParentTable,
    pub output: PathBuf,
    /// Edge cut of the partition, if a partitioner ran.
    pub edge_cut: Option<usize>,
    /// Vertices per unit, by rank.
    pub unit_sizes: Vec<usize>,
    /// Stage times of the root.
    pub timings: StageTimings,
}

struct LocalSlice {
    graph: BubbleSortGraph,
    partition: PartitionMap,
    vertices: Vec<VertexId>,
    rows: LocalRows,
}

fn build_local<P: GraphPartitioner + ?Sized>(
    rank: usize,
    nparts: usize,
    config: &RunConfig,
    partitioner: &P,
    observer: UnitObserver<'_>,
    timings: &mut StageTimings,
) -> Result<LocalSlice, RunError> {
    let start = Instant::now();
    let graph = BubbleSortGraph::build(config.dimension)?;
    timings.graph = start.elapsed();
    observer.emit(Event::GraphBuilt {
        dimension: graph.dimension(),
        vertices: graph.vertex_count(),
    });

    let start = Instant::now();
    let partition = partition_graph(&graph, nparts, partitioner, observer)?;
    timings.partition = start.elapsed();

    let start = Instant::now();
    let vertices = partition.local_vertices(rank);
    timings.local_vertices = start.elapsed();

    let start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads.unwrap_or(0))
        .build()?;
    let rows = pool
        .install(|| LocalTreeBuilder::new(&graph, &config.strategy, observer).build(&vertices))?;
    timings.ist = start.elapsed();

    Ok(LocalSlice {
        graph,
        partition,
        vertices,
        rows,
    })
}

/// Runs one unit with the built-in k-way partitioner. Returns the report on
/// the root and `None` on every other unit.
pub fn run_unit<C: Communicator + ?Sized>(
    comm: &mut C,
    config: &RunConfig,
    sink: &dyn EventSink,
) -> Result<Option<RunReport>, RunError> {
    let partitioner = KwayPartitioner::new(config.partitioner.clone());
    run_unit_with(comm, config, &partitioner, sink)
}

/// [`run_unit`] with a caller-supplied partitioner. Every unit must use an
/// equivalent one.
pub fn run_unit_with<C, P>(
    comm: &mut C,
    config: &RunConfig,
    partitioner: &P,
    sink: &dyn EventSink,
) -> Result<Option<RunReport>, RunError>
where
    C: Communicator + ?Sized,
    P: GraphPartitioner + ?Sized,
{
    let run_start = Instant::now();
    let observer = UnitObserver::new(sink, comm.rank());
    let mut timings = StageTimings::default();

    let local = build_local(
        comm.rank(),
        comm.size(),
        config,
        partitioner,
        observer,
        &mut timings,
    );
    let status = match &local {
        Ok(_) => Ok(()),
        Err(err) => {
            observer.emit(Event::Failed {
                reason: err.to_string(),
            });
            Err(err.to_string())
        }
    };
    let verdict = comm.checkpoint(status);
    observer.emit(Event::Checkpoint {
        all_ok: verdict.is_ok(),
    });
    verdict?;

    let LocalSlice {
        graph,
        partition,
        vertices,
        rows,
    } = local?;

    let start = Instant::now();
    let gathered = aggregate::gather(
        comm,
        &rows,
        &vertices,
        &partition,
        graph.vertex_count(),
        graph.dimension(),
        observer,
    )?;
    timings.gather = start.elapsed();

    let Some(table) = gathered else {
        timings.total = run_start.elapsed();
        observer.emit(Event::Timing(timings));
        return Ok(None);
    };

    let start = Instant::now();
    let output = output::write_to_dir(&graph, &table, &config.output_dir)?;
    timings.output = start.elapsed();
    observer.emit(Event::Written {
        path: output.clone(),
    });

    timings.total = run_start.elapsed();
    observer.emit(Event::Timing(timings));

    Ok(Some(RunReport {
        table,
        output,
        edge_cut: partition.edge_cut(),
        unit_sizes: partition.sizes(),
        timings,
    }))
}

/// Runs `config.units` units on threads of this process and returns the root's report.
pub fn run_threaded(config: &RunConfig, sink: &dyn EventSink) -> Result<RunReport, RunError> {
    let partitioner = KwayPartitioner::new(config.partitioner.clone());
    run_threaded_with(config, &partitioner, sink)
}

/// [`run_threaded`] with a partitioner shared by every unit.
pub fn run_threaded_with<P>(
    config: &RunConfig,
    partitioner: &P,
    sink: &dyn EventSink,
) -> Result<RunReport, RunError>
where
    P: GraphPartitioner + Sync + ?Sized,
{
    if config.units == 0 {
        return Err(RunError::NoUnits);
    }

    let mut report = None;
    let results = ThreadWorld::run(config.units, |unit| {
        run_unit_with(unit, config, partitioner, sink)
    });
    for result in results {
        if let Some(r) = result? {
            report = Some(r);
        }
    }
    report.ok_or(RunError::MissingReport)
}
