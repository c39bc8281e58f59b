//! The analysis tools built on the matching engine
//!
//! Each tool reads the run parameters, scans the sequence database in
//! parallel, sorts the collected rows and writes its reports.

pub mod report;

pub mod aplaus;
pub mod erpa;
pub mod ispar;
pub mod pat;
pub mod pspa;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use serde::Serialize;

use crate::analysis::{ProgressUpdate, RunConfig, ScanSummary, SequenceDatabase, ToolKind};
use crate::error::Result;

/// What a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub tool: ToolKind,
    pub summary: ScanSummary,
    /// Rows written to the reports
    pub rows: usize,
    pub files: Vec<PathBuf>,
}

/// Run one tool end to end
pub fn run_tool(
    tool: ToolKind,
    config: &RunConfig,
    progress_tx: Option<Sender<ProgressUpdate>>,
) -> Result<ToolOutcome> {
    log::info!("running {} with parameters for '{}'", tool.name(), config.filename);
    let outcome = match tool {
        ToolKind::Ispar => ispar::run(config, progress_tx),
        ToolKind::Aplaus => aplaus::run(config, progress_tx),
        ToolKind::Pat => pat::run(config, progress_tx),
        ToolKind::Pspa => pspa::run(config, progress_tx),
        ToolKind::Erpa => erpa::run(config, progress_tx),
    }?;
    log::info!(
        "{}: {} rows from {} records, reports {:?}",
        tool.name(),
        outcome.rows,
        outcome.summary.records_scanned,
        outcome.files
    );
    Ok(outcome)
}

pub(crate) fn open_database(config: &RunConfig) -> Result<SequenceDatabase<BufReader<File>>> {
    SequenceDatabase::open(config.require_database()?)
}
