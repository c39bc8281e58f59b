//! Primer pair prevalence
//!
//! Every forward primer is paired with every reverse primer and searched in
//! each record. The report counts the records in which the forward primer,
//! the reverse primer, and both were found.

use std::cmp::Ordering;
use std::io::BufRead;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::mpsc::Sender;

use serde::Serialize;

use super::report::{self, Cell, JsonReport, Table};
use super::{open_database, ToolOutcome};
use crate::analysis::{
    scan_database, ProgressUpdate, ResultSink, RunConfig, ScanSummary, SequenceDatabase, SlidingMatcher,
    SortField, SortSpec, ToolKind,
};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairRow {
    pub forward: String,
    pub forward_matches: usize,
    pub reverse: String,
    pub reverse_matches: usize,
    pub both_matches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSortField {
    ForwardPrimer,
    ReversePrimer,
    BothMatches,
}

impl SortField for PairSortField {
    const ALL: &'static [Self] = &[Self::ForwardPrimer, Self::ReversePrimer, Self::BothMatches];

    fn label(&self) -> &'static str {
        match self {
            Self::ForwardPrimer => "forward primer",
            Self::ReversePrimer => "reverse primer",
            Self::BothMatches => "number of both primer matches",
        }
    }
}

fn compare(field: PairSortField, a: &PairRow, b: &PairRow) -> Ordering {
    match field {
        PairSortField::ForwardPrimer => a.forward.cmp(&b.forward),
        PairSortField::ReversePrimer => a.reverse.cmp(&b.reverse),
        PairSortField::BothMatches => a.both_matches.cmp(&b.both_matches),
    }
}

#[derive(Default)]
struct PairTally {
    forward: AtomicUsize,
    reverse: AtomicUsize,
    both: AtomicUsize,
}

/// Count primer hits for every forward x reverse pair, in configuration order
pub fn collect<R: BufRead + Send>(
    database: SequenceDatabase<R>,
    config: &RunConfig,
    progress_tx: Option<Sender<ProgressUpdate>>,
) -> Result<(Vec<PairRow>, ScanSummary)> {
    let forward = config.forward_primers()?;
    let reverse = config.reverse_primers()?;
    let matchers: Vec<SlidingMatcher> = forward
        .iter()
        .flat_map(|f| reverse.iter().map(move |r| SlidingMatcher::new(f, r)))
        .collect();
    let tallies: Vec<PairTally> = matchers.iter().map(|_| PairTally::default()).collect();
    log::info!("pspa: searching {} primer pairs", matchers.len());

    let (_, summary) = scan_database(database, config.threads, progress_tx, |record, _: &ResultSink<()>| {
        let mut amplified = false;
        for (matcher, tally) in matchers.iter().zip(&tallies) {
            let outcome = matcher.search(record.sequence.as_bytes());
            if outcome.forward_found() {
                tally.forward.fetch_add(1, AtomicOrdering::Relaxed);
            }
            if outcome.reverse_found() {
                tally.reverse.fetch_add(1, AtomicOrdering::Relaxed);
            }
            if outcome.forward_found() && outcome.reverse_found() {
                tally.both.fetch_add(1, AtomicOrdering::Relaxed);
                amplified = true;
            }
        }
        amplified
    })?;

    let pairs = forward.iter().flat_map(|f| reverse.iter().map(move |r| (f, r)));
    let rows = pairs
        .zip(tallies)
        .map(|((f, r), tally)| PairRow {
            forward: f.sequence().to_string(),
            forward_matches: tally.forward.into_inner(),
            reverse: r.sequence().to_string(),
            reverse_matches: tally.reverse.into_inner(),
            both_matches: tally.both.into_inner(),
        })
        .collect();
    Ok((rows, summary))
}

pub fn table(rows: &[PairRow], config: &RunConfig) -> Table {
    let mut table = Table::new(&[
        "Forward Primer",
        "Forward Matches",
        "Reverse Primer",
        "Reverse Matches",
        "Both Matches",
    ])
    .with_preamble(vec![report::mismatch_line(config)]);
    for row in rows {
        table.push_row(vec![
            Cell::text(row.forward.as_str()),
            Cell::Count(row.forward_matches),
            Cell::text(row.reverse.as_str()),
            Cell::Count(row.reverse_matches),
            Cell::Count(row.both_matches),
        ]);
    }
    table
}

pub fn run(config: &RunConfig, progress_tx: Option<Sender<ProgressUpdate>>) -> Result<ToolOutcome> {
    let sort = SortSpec::<PairSortField>::from_code(config.sort_option)?;
    let database = open_database(config)?;
    let (mut rows, summary) = collect(database, config, progress_tx)?;
    sort.apply(&mut rows, compare);

    let json = JsonReport {
        tool: ToolKind::Pspa,
        parameters: config,
        summary,
        sort: sort.describe(),
        rows: &rows,
    };
    let files = report::write_reports(&config.filename, &table(&rows, config), &json)?;

    Ok(ToolOutcome {
        tool: ToolKind::Pspa,
        summary,
        rows: rows.len(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{reverse_complement, ThreadCount};
    use crate::tools::testing::{amplicon, database, FORWARD, REVERSE};

    const OTHER_FORWARD: &str = "CCTACGGGAGGCAGCAG";

    #[test]
    fn test_counts_per_pair() {
        let config = RunConfig {
            forward: vec![FORWARD.to_string(), OTHER_FORWARD.to_string()],
            reverse: vec![REVERSE.to_string()],
            threads: ThreadCount::Fixed(2),
            ..RunConfig::default()
        };

        let both = amplicon("ACACACACACACACACACAC");
        let forward_only = format!("{}{}", FORWARD, "ACAC".repeat(10));
        let reverse_only = format!("{}{}", "ACAC".repeat(10), reverse_complement(REVERSE));
        let other = format!("{}{}{}", OTHER_FORWARD, "ACAC".repeat(5), reverse_complement(REVERSE));
        let records = [
            ("a", "1", both.as_str()),
            ("b", "2", forward_only.as_str()),
            ("c", "3", reverse_only.as_str()),
            ("d", "4", other.as_str()),
            ("e", "5", "ACGT"),
        ];

        let (rows, summary) = collect(database(&records), &config, None).unwrap();
        assert_eq!(summary.records_scanned, 5);
        assert_eq!(summary.records_amplified, 2);
        assert_eq!(
            rows[0],
            PairRow {
                forward: FORWARD.to_string(),
                forward_matches: 2,
                reverse: REVERSE.to_string(),
                reverse_matches: 3,
                both_matches: 1,
            }
        );
        assert_eq!(rows[1].forward, OTHER_FORWARD);
        assert_eq!((rows[1].forward_matches, rows[1].reverse_matches, rows[1].both_matches), (1, 3, 1));
    }

    #[test]
    fn test_sort_by_both_matches_descending() {
        let row = |f: &str, both| PairRow {
            forward: f.to_string(),
            forward_matches: 0,
            reverse: String::new(),
            reverse_matches: 0,
            both_matches: both,
        };
        let mut rows = vec![row("A", 1), row("B", 5), row("C", 3)];
        SortSpec::<PairSortField>::from_code(5).unwrap().apply(&mut rows, compare);
        let order: Vec<&str> = rows.iter().map(|r| r.forward.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
        assert!(SortSpec::<PairSortField>::from_code(6).is_err());
    }
}
