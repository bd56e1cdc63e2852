//! Observability for a run.
//!
//! Components never log through global state directly: they receive an
//! [`EventSink`] and report structured [`Event`]s tagged with the rank of the
//! unit that produced them. [`LogSink`] forwards to the `log` facade,
//! [`MemorySink`] keeps events around for inspection in tests.

use std::{fmt, path::PathBuf, sync::Mutex, time::Duration};

use itertools::Itertools;
use log::Level;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    GraphBuilt {
        dimension: usize,
        vertices: usize,
    },
    Encoded {
        offsets: usize,
        columns: usize,
    },
    Partitioned {
        parts: usize,
        edge_cut: Option<usize>,
        sizes: Vec<usize>,
    },
    LocalBuilt {
        vertices: usize,
        trees: usize,
    },
    Checkpoint {
        all_ok: bool,
    },
    Displacements {
        displacements: Vec<usize>,
    },
    Gathered {
        units: usize,
        elements: usize,
    },
    Written {
        path: PathBuf,
    },
    Failed {
        reason: String,
    },
    Timing(StageTimings),
}

/// Wall-clock time a unit spent in each stage of a run. Stages a unit does not
/// take part in, such as output on every unit but the root, stay at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageTimings {
    pub graph: Duration,
    pub partition: Duration,
    pub local_vertices: Duration,
    pub ist: Duration,
    pub gather: Duration,
    pub output: Duration,
    pub total: Duration,
}

impl StageTimings {
    /// Sum of the individual stages, which `total` bounds from above.
    pub fn stages(&self) -> Duration {
        self.graph + self.partition + self.local_vertices + self.ist + self.gather + self.output
    }
}

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timing: Graph={:.6}s, Partition={:.6}s, LocalVertices={:.6}s, IST={:.6}s, \
             Gather={:.6}s, Output={:.6}s, Total={:.6}s",
            self.graph.as_secs_f64(),
            self.partition.as_secs_f64(),
            self.local_vertices.as_secs_f64(),
            self.ist.as_secs_f64(),
            self.gather.as_secs_f64(),
            self.output.as_secs_f64(),
            self.total.as_secs_f64(),
        )
    }
}

impl Event {
    pub fn level(&self) -> Level {
        match self {
            Event::Failed { .. } => Level::Error,
            Event::Checkpoint { all_ok: false } => Level::Error,
            Event::Encoded { .. } | Event::Displacements { .. } => Level::Debug,
            _ => Level::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::GraphBuilt {
                dimension,
                vertices,
            } => write!(
                f,
                "bubble-sort graph B_{dimension} constructed with {vertices} vertices"
            ),
            Event::Encoded { offsets, columns } => write!(
                f,
                "encoded graph: offsets size={offsets}, columns size={columns}"
            ),
            Event::Partitioned {
                parts,
                edge_cut,
                sizes,
            } => {
                write!(f, "partitioned into {parts} parts, sizes=[{}]", sizes.iter().join(" "))?;
                if let Some(cut) = edge_cut {
                    write!(f, ", edge cut={cut}")?;
                }
                Ok(())
            }
            Event::LocalBuilt { vertices, trees } => write!(
                f,
                "local construction completed for {vertices} vertices across {trees} trees"
            ),
            Event::Checkpoint { all_ok } => {
                if *all_ok {
                    write!(f, "checkpoint passed on every unit")
                } else {
                    write!(f, "checkpoint failed, aborting run")
                }
            }
            Event::Displacements { displacements } => {
                write!(f, "displacements=[{}]", displacements.iter().join(" "))
            }
            Event::Gathered { units, elements } => {
                write!(f, "gathered {elements} parent slots from {units} units")
            }
            Event::Written { path } => write!(f, "output written to {}", path.display()),
            Event::Failed { reason } => write!(f, "{reason}"),
            Event::Timing(timings) => write!(f, "{timings}"),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, unit: usize, event: Event);
}

/// Forwards every event to the `log` facade, prefixed with the unit rank.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, unit: usize, event: Event) {
        log::log!(event.level(), "[unit {unit}] {event}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _unit: usize, _event: Event) {}
}

/// Records events in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(usize, Event)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(usize, Event)> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events emitted by a single unit, in order.
    pub fn events_of(&self, unit: usize) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|(u, _)| *u == unit)
            .map(|(_, e)| e)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, unit: usize, event: Event) {
        match self.events.lock() {
            Ok(mut events) => events.push((unit, event)),
            Err(poisoned) => poisoned.into_inner().push((unit, event)),
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn emit(&self, unit: usize, event: Event) {
        (**self).emit(unit, event)
    }
}

/// An [`EventSink`] bound to the rank of the unit reporting through it.
#[derive(Clone, Copy)]
pub struct UnitObserver<'a> {
    sink: &'a dyn EventSink,
    unit: usize,
}

impl<'a> UnitObserver<'a> {
    pub fn new(sink: &'a dyn EventSink, unit: usize) -> Self {
        UnitObserver { sink, unit }
    }

    pub fn emit(&self, event: Event) {
        self.sink.emit(self.unit, event)
    }
}

impl fmt::Debug for UnitObserver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitObserver")
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}
