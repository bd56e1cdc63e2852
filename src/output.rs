//! Text rendering of the spanning trees.
//!
//! ```text
//! Tree T_1^3:
//! Vertex 132 -> Parent 312
//! ...
//!
//! Tree T_2^3:
//! ...
//! ```
//!
//! The root and every vertex without parent are left out of each tree.

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{graph::BubbleSortGraph, tree::ParentTable};

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `ists_B<n>.txt`
pub fn file_name(n: usize) -> String {
    format!("ists_B{n}.txt")
}

pub fn write_trees<W: Write>(
    graph: &BubbleSortGraph,
    table: &ParentTable,
    mut writer: W,
) -> io::Result<()> {
    let n = graph.dimension();
    let root = graph.root();
    for t in 1..n {
        writeln!(writer, "Tree T_{t}^{n}:")?;
        for (v, parent) in table.iter_tree(t) {
            let Some(parent) = parent else { continue };
            if v == root {
                continue;
            }
            match (graph.permutation(v), graph.permutation(parent)) {
                (Some(child), Some(parent)) => {
                    writeln!(writer, "Vertex {child} -> Parent {parent}")?
                }
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("parent pointer {v} -> {parent} leaves the network"),
                    ))
                }
            }
        }
        writeln!(writer)?;
    }
    writer.flush()
}

/// Writes `ists_B<n>.txt` into `dir`, creating the directory first, and returns
/// the path written. The trees go to a temporary file in `dir` that only takes
/// the final name once complete, so a failed write leaves no output behind.
pub fn write_to_dir(
    graph: &BubbleSortGraph,
    table: &ParentTable,
    dir: &Path,
) -> Result<PathBuf, OutputError> {
    let path = dir.join(file_name(graph.dimension()));
    let wrap = |source| OutputError::Write {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(dir).map_err(wrap)?;
    let mut staged = NamedTempFile::new_in(dir).map_err(wrap)?;
    write_trees(graph, table, BufWriter::new(staged.as_file_mut())).map_err(wrap)?;
    staged.persist(&path).map_err(|err| wrap(err.error))?;
    Ok(path)
}
