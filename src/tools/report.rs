//! Report writers shared by the tools
//!
//! Every tool renders its rows into a [`Table`] and writes it as aligned
//! plain text (`.txt`), quoted CSV with a preamble (`.csv`) and bare CSV rows
//! (`.dat`). The typed rows also go to `.json` together with the run
//! parameters.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analysis::{RunConfig, ScanSummary, ToolKind};
use crate::error::Result;

/// One table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Count(usize),
    /// Value and number of decimals
    Real(f64, usize),
    Text(String),
}

impl Cell {
    pub fn text<S: Into<String>>(s: S) -> Self {
        Cell::Text(s.into())
    }

    fn plain(&self) -> String {
        match self {
            Cell::Count(n) => n.to_string(),
            Cell::Real(v, precision) => format!("{:.*}", precision, v),
            Cell::Text(s) => s.clone(),
        }
    }

    fn csv(&self) -> String {
        match self {
            Cell::Text(s) => quote(s),
            other => other.plain(),
        }
    }

    fn is_text(&self) -> bool {
        matches!(self, Cell::Text(_))
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Rows of a report plus the free-text lines printed above them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub preamble: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            preamble: Vec::new(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_preamble(mut self, lines: Vec<String>) -> Self {
        self.preamble = lines;
        self
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.plain().len();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    /// Column-aligned text: numbers right-aligned, text left-aligned
    pub fn write_txt<W: Write>(&self, mut out: W) -> io::Result<()> {
        for line in &self.preamble {
            writeln!(out, "{}", line)?;
        }
        if !self.preamble.is_empty() {
            writeln!(out)?;
        }

        let widths = self.widths();
        let last = widths.len().saturating_sub(1);
        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| if i == last { c.clone() } else { format!("{:<w$}", c, w = widths[i]) })
            .collect();
        writeln!(out, "{}", header.join(" "))?;

        for row in &self.rows {
            let fields: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let value = cell.plain();
                    if i == last && cell.is_text() {
                        value
                    } else if cell.is_text() {
                        format!("{:<w$}", value, w = widths[i])
                    } else {
                        format!("{:>w$}", value, w = widths[i])
                    }
                })
                .collect();
            writeln!(out, "{}", fields.join(" "))?;
        }
        out.flush()
    }

    /// Quoted preamble, quoted header, then one line per row
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        for line in &self.preamble {
            writeln!(out, "{}", quote(line))?;
        }
        if !self.preamble.is_empty() {
            writeln!(out)?;
        }
        let header: Vec<String> = self.columns.iter().map(|c| quote(c)).collect();
        writeln!(out, "{}", header.join(","))?;
        self.write_dat(out)
    }

    /// Rows only, comma separated
    pub fn write_dat<W: Write>(&self, mut out: W) -> io::Result<()> {
        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(Cell::csv).collect();
            writeln!(out, "{}", fields.join(","))?;
        }
        out.flush()
    }
}

/// JSON form of a finished run
#[derive(Debug, Serialize)]
pub struct JsonReport<'a, T: Serialize> {
    pub tool: ToolKind,
    pub parameters: &'a RunConfig,
    pub summary: ScanSummary,
    pub sort: String,
    pub rows: &'a [T],
}

/// `<prefix>.<extension>`
pub fn output_path(prefix: &str, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", prefix, extension))
}

pub(crate) fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut out = BufWriter::new(File::create(path)?);
    write(&mut out)?;
    out.flush()?;
    log::debug!("wrote {:?}", path);
    Ok(())
}

/// Write the `.txt`, `.csv`, `.dat` and `.json` reports for `prefix`
pub fn write_reports<T: Serialize>(prefix: &str, table: &Table, report: &JsonReport<T>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let path = output_path(prefix, "txt");
    write_file(&path, |out| table.write_txt(out))?;
    written.push(path);

    let path = output_path(prefix, "csv");
    write_file(&path, |out| table.write_csv(out))?;
    written.push(path);

    let path = output_path(prefix, "dat");
    write_file(&path, |out| table.write_dat(out))?;
    written.push(path);

    let path = output_path(prefix, "json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;
    written.push(path);

    Ok(written)
}

pub fn returned_line(rows: usize) -> String {
    format!("Query returned {} record(s).", rows)
}

pub fn primer_line(config: &RunConfig) -> String {
    format!(
        "Forward Primer: {}, Reverse Primer: {}",
        config.forward.first().map(String::as_str).unwrap_or(""),
        config.reverse.first().map(String::as_str).unwrap_or("")
    )
}

pub fn enzyme_line(enzymes: &[String]) -> String {
    format!("Restriction Enzyme(s): {}", enzymes.join(" "))
}

pub fn mismatch_line(config: &RunConfig) -> String {
    format!(
        "Query allowed at most {} mismatches within {} bases from 5' end of primer.",
        config.mismatch, config.max_base
    )
}
