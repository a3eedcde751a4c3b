//! The whole command-line run, minus argument parsing and printing.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Geometry;
use crate::error::SimError;
use crate::simulator::{replay, RunReport, Simulator};
use crate::trace::TraceReader;

/// Everything a run of the `csim` binary needs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub set_index_bits: u32,
    pub associativity: usize,
    pub block_offset_bits: u32,
    pub trace: PathBuf,
    /// Where to also write the summary as CSV.
    pub csv: Option<PathBuf>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SimError + '_ {
    move |source| SimError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Validate the geometry, replay the trace file and export the summary.
///
/// A truncated trace is not an error: the report carries the truncation and
/// the statistics gathered up to it.
pub fn run_file(options: &RunOptions) -> Result<(Simulator, RunReport), SimError> {
    let geometry = Geometry::new(
        options.set_index_bits,
        options.associativity,
        options.block_offset_bits,
    )?;

    let file = File::open(&options.trace).map_err(io_error(&options.trace))?;
    info!("Trace Path: {}", options.trace.display());
    let (simulator, report) = replay(geometry, TraceReader::new(BufReader::new(file)))?;

    if let Some(path) = &options.csv {
        let file = File::create(path).map_err(io_error(path))?;
        report.summary.write_csv(file)?;
    }

    Ok((simulator, report))
}
