use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
#[cfg(feature = "metis")]
use bubble_ist::{partition::MetisPartitioner, pipeline::run_threaded_with};
use bubble_ist::{
    observe::LogSink,
    partition::KwayConfig,
    pipeline::{run_threaded, RunConfig, RunError, RunReport},
    tree::Strategy,
};
use clap::{ArgAction, Parser};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "bubble-ist",
    about = "Construct one spanning tree per generator of the bubble-sort network B_n across parallel compute units."
)]
struct Cli {
    /// Dimension n of the network; it has n! vertices.
    #[arg(short = 'n', long, value_name = "N", default_value_t = 3)]
    dimension: usize,
    /// Directory receiving ists_B<n>.txt.
    #[arg(short, long, value_name = "DIR", default_value = "data/output")]
    output_dir: PathBuf,
    /// Number of compute units the vertices are partitioned across.
    #[arg(short, long, value_name = "K", default_value_t = 1)]
    units: usize,
    /// Worker threads per unit (defaults to one per core).
    #[arg(short = 'j', long, value_name = "N")]
    threads: Option<usize>,
    /// Parent-selection rule.
    #[arg(long, value_enum, default_value_t = Strategy::FirstNeighbor)]
    strategy: Strategy,
    /// Allowed part-size imbalance of the partitioner.
    #[arg(long, value_name = "FACTOR", default_value_t = 1.05)]
    ubfactor: f64,
    /// Refinement passes of the partitioner.
    #[arg(long, value_name = "N", default_value_t = 10)]
    niter: usize,
    /// Partition with METIS instead of the built-in partitioner.
    #[cfg(feature = "metis")]
    #[arg(long)]
    metis: bool,
    /// More output per occurrence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    ensure!(cli.units > 0, "units must be greater than zero");
    ensure!(
        cli.threads != Some(0),
        "threads must be greater than zero when given"
    );

    stderrlog::new()
        .verbosity(2 + usize::from(cli.verbose))
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .context("failed to initialise logging")?;

    let config = RunConfig::default()
        .with_dimension(cli.dimension)
        .with_output_dir(cli.output_dir.clone())
        .with_units(cli.units)
        .with_threads(cli.threads)
        .with_strategy(cli.strategy)
        .with_partitioner(KwayConfig {
            ubfactor: cli.ubfactor,
            niter: cli.niter,
            ..KwayConfig::default()
        });
    log::debug!("{config:?}");

    let report = partition_and_run(&cli, &config).with_context(|| {
        format!(
            "failed to construct the trees of B_{} on {} units",
            config.dimension, config.units
        )
    })?;

    println!(
        "Wrote {} trees over {} vertices to {}",
        report.table.tree_count(),
        report.table.vertex_count(),
        report.output.display()
    );
    println!("{}", report.timings);
    Ok(())
}

#[cfg(feature = "metis")]
fn partition_and_run(cli: &Cli, config: &RunConfig) -> Result<RunReport, RunError> {
    if cli.metis {
        let partitioner = MetisPartitioner::new(config.partitioner.clone());
        return run_threaded_with(config, &partitioner, &LogSink);
    }
    run_threaded(config, &LogSink)
}

#[cfg(not(feature = "metis"))]
fn partition_and_run(_cli: &Cli, config: &RunConfig) -> Result<RunReport, RunError> {
    run_threaded(config, &LogSink)
}
