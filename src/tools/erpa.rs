//! Enzyme resolving power
//!
//! Digests every amplified record with each enzyme and summarises, per
//! enzyme, how many records it cut and how well its terminal fragments
//! separate the records.

use std::cmp::Ordering;
use std::io::BufRead;
use std::sync::mpsc::Sender;

use serde::Serialize;

use super::report::{self, Cell, JsonReport, Table};
use super::{open_database, ToolOutcome};
use crate::analysis::{
    digest_all, mean, sample_std_dev, scan_database, unique_count, ProgressUpdate, RunConfig, ScanSummary,
    SequenceDatabase, SlidingMatcher, SortField, SortSpec, ToolKind,
};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvingRow {
    pub site: String,
    /// Amplified records digested with this enzyme
    pub total_hits: usize,
    pub cut: usize,
    pub full_length: usize,
    pub forward_unique: usize,
    pub forward_mean: f64,
    pub forward_std_dev: f64,
    pub reverse_unique: usize,
    pub reverse_mean: f64,
    pub reverse_std_dev: f64,
}

impl ResolvingRow {
    fn summarise(site: &str, fragments: &EnzymeFragments) -> Self {
        let total_hits = fragments.forward.len();
        Self {
            site: site.to_string(),
            total_hits,
            cut: fragments.cut,
            full_length: total_hits - fragments.cut,
            forward_unique: unique_count(&fragments.forward),
            forward_mean: mean(&fragments.forward),
            forward_std_dev: sample_std_dev(&fragments.forward),
            reverse_unique: unique_count(&fragments.reverse),
            reverse_mean: mean(&fragments.reverse),
            reverse_std_dev: sample_std_dev(&fragments.reverse),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvingSortField {
    Site,
    ForwardUnique,
    ReverseUnique,
}

impl SortField for ResolvingSortField {
    const ALL: &'static [Self] = &[Self::Site, Self::ForwardUnique, Self::ReverseUnique];

    fn label(&self) -> &'static str {
        match self {
            Self::Site => "restriction site",
            Self::ForwardUnique => "number of unique forward fragments",
            Self::ReverseUnique => "number of unique reverse fragments",
        }
    }
}

fn compare(field: ResolvingSortField, a: &ResolvingRow, b: &ResolvingRow) -> Ordering {
    match field {
        ResolvingSortField::Site => a.site.cmp(&b.site),
        ResolvingSortField::ForwardUnique => a.forward_unique.cmp(&b.forward_unique),
        ResolvingSortField::ReverseUnique => a.reverse_unique.cmp(&b.reverse_unique),
    }
}

#[derive(Debug, Default)]
struct EnzymeFragments {
    forward: Vec<usize>,
    reverse: Vec<usize>,
    cut: usize,
}

/// One row per enzyme, in configuration order
pub fn collect<R: BufRead + Send>(
    database: SequenceDatabase<R>,
    config: &RunConfig,
    progress_tx: Option<Sender<ProgressUpdate>>,
) -> Result<(Vec<ResolvingRow>, ScanSummary)> {
    let (forward, reverse) = config.primer_pair()?;
    let enzymes = config.endonucleases()?;
    let matcher = SlidingMatcher::new(&forward, &reverse);

    let (digested, summary) = scan_database(database, config.threads, progress_tx, |record, sink| {
        match matcher.delimit(record.sequence.as_bytes()) {
            Some(amplicon) => {
                sink.push(digest_all(amplicon.inner, &enzymes, forward.len(), reverse.len()));
                true
            }
            None => false,
        }
    })?;

    let mut per_enzyme: Vec<EnzymeFragments> = enzymes.iter().map(|_| EnzymeFragments::default()).collect();
    for digestions in digested {
        for (fragments, digestion) in per_enzyme.iter_mut().zip(digestions) {
            fragments.forward.push(digestion.forward_fragment);
            fragments.reverse.push(digestion.reverse_fragment);
            if digestion.is_cut() {
                fragments.cut += 1;
            }
        }
    }

    let rows = enzymes
        .iter()
        .zip(&per_enzyme)
        .map(|(enzyme, fragments)| ResolvingRow::summarise(enzyme.site(), fragments))
        .collect();
    Ok((rows, summary))
}

pub fn table(rows: &[ResolvingRow], config: &RunConfig) -> Table {
    let preamble = vec![report::primer_line(config), report::mismatch_line(config)];
    let mut table = Table::new(&[
        "Restrict Site",
        "Total Hits",
        "Cut",
        "Full Length",
        "5'Unique",
        "5'Average",
        "5'StdDev",
        "3'Unique",
        "3'Average",
        "3'StdDev",
    ])
    .with_preamble(preamble);
    for row in rows {
        table.push_row(vec![
            Cell::text(row.site.as_str()),
            Cell::Count(row.total_hits),
            Cell::Count(row.cut),
            Cell::Count(row.full_length),
            Cell::Count(row.forward_unique),
            Cell::Real(row.forward_mean, 3),
            Cell::Real(row.forward_std_dev, 3),
            Cell::Count(row.reverse_unique),
            Cell::Real(row.reverse_mean, 3),
            Cell::Real(row.reverse_std_dev, 3),
        ]);
    }
    table
}

pub fn run(config: &RunConfig, progress_tx: Option<Sender<ProgressUpdate>>) -> Result<ToolOutcome> {
    let sort = SortSpec::<ResolvingSortField>::from_code(config.sort_option)?;
    let database = open_database(config)?;
    let (mut rows, summary) = collect(database, config, progress_tx)?;
    sort.apply(&mut rows, compare);

    let json = JsonReport {
        tool: ToolKind::Erpa,
        parameters: config,
        summary,
        sort: sort.describe(),
        rows: &rows,
    };
    let files = report::write_reports(&config.filename, &table(&rows, config), &json)?;

    Ok(ToolOutcome {
        tool: ToolKind::Erpa,
        summary,
        rows: rows.len(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ThreadCount;
    use crate::tools::testing::{amplicon, database, FORWARD, REVERSE};

    fn config() -> RunConfig {
        RunConfig {
            forward: vec![FORWARD.to_string()],
            reverse: vec![REVERSE.to_string()],
            enzymes: vec!["G^AATTC".to_string(), "GG^CC".to_string()],
            threads: ThreadCount::Fixed(2),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_statistics_per_enzyme() {
        let fl = FORWARD.len();
        let rl = REVERSE.len();
        // 20-symbol inner regions; EcoRI at 2 and 10, HaeIII nowhere
        let a = amplicon("CCGAATTCCCCCCCCCCCCC");
        let b = amplicon("CCCCCCCCCCGAATTCCCCC");
        let c = amplicon("CCCCCCCCCCCCCCCCCCCC");
        let records = [
            ("A", "1", a.as_str()),
            ("B", "2", b.as_str()),
            ("C", "3", c.as_str()),
            ("D", "4", "ACGTACGT"),
        ];

        let (rows, summary) = collect(database(&records), &config(), None).unwrap();
        assert_eq!(summary.records_amplified, 3);
        assert_eq!(rows.len(), 2);

        let ecori = &rows[0];
        assert_eq!(ecori.site, "G^AATTC");
        assert_eq!((ecori.total_hits, ecori.cut, ecori.full_length), (3, 2, 1));
        let full = fl + rl + 20;
        let mut forward = vec![3 + fl, 11 + fl, full];
        forward.sort_unstable();
        assert_eq!(ecori.forward_unique, 3);
        assert!((ecori.forward_mean - mean(&forward)).abs() < 1e-9);
        assert!((ecori.forward_std_dev - sample_std_dev(&forward)).abs() < 1e-9);
        assert_eq!(ecori.reverse_unique, 3);

        let haeiii = &rows[1];
        assert_eq!((haeiii.total_hits, haeiii.cut, haeiii.full_length), (3, 0, 3));
        assert_eq!(haeiii.forward_unique, 1);
        assert_eq!(haeiii.forward_mean, full as f64);
        assert_eq!(haeiii.forward_std_dev, 0.0);
    }

    #[test]
    fn test_nothing_amplified() {
        let records = [("A", "1", "ACGTACGTACGT")];
        let (rows, _) = collect(database(&records), &config(), None).unwrap();
        assert_eq!(rows[0].total_hits, 0);
        assert_eq!(rows[0].forward_mean, 0.0);
        assert_eq!(rows[0].forward_std_dev, 0.0);
    }

    #[test]
    fn test_run_sorts_by_forward_unique_descending() {
        let dir = tempfile::tempdir().unwrap();
        let db = format!(
            "A|1|16S|{}\nB|2|16S|{}\n",
            amplicon("CCGAATTCCCCCCCCCCCCC"),
            amplicon("CCCCCCCCCCGAATTCCCCC")
        );
        std::fs::write(dir.path().join("db.txt"), db).unwrap();

        let mut config = config();
        config.database = Some(dir.path().join("db.txt"));
        config.filename = dir.path().join("erpa").to_string_lossy().into_owned();
        config.sort_option = 4;
        let outcome = run(&config, None).unwrap();
        assert_eq!(outcome.rows, 2);
        assert_eq!(outcome.files.len(), 4);

        let txt = std::fs::read_to_string(report::output_path(&config.filename, "txt")).unwrap();
        let ecori = txt.find("G^AATTC").unwrap();
        let haeiii = txt.find("GG^CC").unwrap();
        assert!(ecori < haeiii);
    }
}
