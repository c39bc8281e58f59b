//! Phylogenetic assignment from a forward T-RFLP profile
//!
//! Like the community analysis but only the forward terminal fragment is
//! matched, against a single observed sample.

use std::cmp::Ordering;
use std::io::BufRead;
use std::sync::mpsc::Sender;

use serde::Serialize;

use super::report::{self, Cell, JsonReport, Table};
use super::{open_database, ToolOutcome};
use crate::analysis::{
    digest, normalize, scan_database, ProgressUpdate, RunConfig, SampleProfile, ScanSummary,
    SequenceDatabase, SlidingMatcher, SortField, SortSpec, ToolKind,
};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentRow {
    pub predicted: usize,
    pub observed: f64,
    pub biomass: f64,
    pub accession: String,
    pub organism: String,
    #[serde(skip)]
    peak: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSortField {
    Fragment,
    Biomass,
    Organism,
}

impl SortField for AssignmentSortField {
    const ALL: &'static [Self] = &[Self::Fragment, Self::Biomass, Self::Organism];

    fn label(&self) -> &'static str {
        match self {
            Self::Fragment => "predicted forward fragment",
            Self::Biomass => "species abundance",
            Self::Organism => "species name",
        }
    }
}

fn compare(field: AssignmentSortField, a: &AssignmentRow, b: &AssignmentRow) -> Ordering {
    match field {
        AssignmentSortField::Fragment => a.predicted.cmp(&b.predicted),
        AssignmentSortField::Biomass => a.biomass.total_cmp(&b.biomass),
        AssignmentSortField::Organism => a.organism.cmp(&b.organism),
    }
}

pub fn collect<R: BufRead + Send>(
    database: SequenceDatabase<R>,
    config: &RunConfig,
    sample: &SampleProfile,
    progress_tx: Option<Sender<ProgressUpdate>>,
) -> Result<(Vec<AssignmentRow>, ScanSummary)> {
    let (forward, reverse) = config.primer_pair()?;
    let enzymes = config.endonucleases()?;
    let enzyme = &enzymes[0];
    let matcher = SlidingMatcher::new(&forward, &reverse);
    let bin = config.forward_shift;

    scan_database(database, config.threads, progress_tx, |record, sink| {
        let amplicon = match matcher.delimit(record.sequence.as_bytes()) {
            Some(amplicon) => amplicon,
            None => return false,
        };
        let predicted = digest(amplicon.inner, enzyme, forward.len(), reverse.len()).forward_fragment;

        if let Some(peak) = sample.find(predicted, bin) {
            sink.push(AssignmentRow {
                predicted,
                observed: sample.get(peak).map(|p| p.fragment).unwrap_or(0.0),
                biomass: 0.0,
                accession: record.accession.clone(),
                organism: record.organism.clone(),
                peak,
            });
        }
        true
    })
}

/// Each row receives its peak's biomass share, normalised to 1
pub fn assign_biomass(rows: &mut [AssignmentRow], sample: &SampleProfile) {
    let shares = sample.shares(rows.iter().map(|r| r.peak));
    let mut biomass: Vec<f64> = rows.iter().map(|r| shares[r.peak]).collect();
    normalize(&mut biomass);
    for (row, value) in rows.iter_mut().zip(biomass) {
        row.biomass = value;
    }
}

pub fn table(rows: &[AssignmentRow], config: &RunConfig) -> Table {
    let preamble = vec![
        report::returned_line(rows.len()),
        report::primer_line(config),
        report::enzyme_line(&config.enzymes[..config.enzymes.len().min(1)]),
        report::mismatch_line(config),
    ];
    let mut table = Table::new(&["Predict", "Observe", "Abundance", "Accession", "Name"]).with_preamble(preamble);
    for row in rows {
        table.push_row(vec![
            Cell::Count(row.predicted),
            Cell::Real(row.observed, 2),
            Cell::Real(row.biomass, 6),
            Cell::text(row.accession.as_str()),
            Cell::text(row.organism.as_str()),
        ]);
    }
    table
}

pub fn run(config: &RunConfig, progress_tx: Option<Sender<ProgressUpdate>>) -> Result<ToolOutcome> {
    let sort = SortSpec::<AssignmentSortField>::from_code(config.sort_option)?;
    let sample = SampleProfile::load(config.require_forward_sample()?)?;
    let database = open_database(config)?;

    let (mut rows, summary) = collect(database, config, &sample, progress_tx)?;
    assign_biomass(&mut rows, &sample);
    sort.apply(&mut rows, compare);

    let json = JsonReport {
        tool: ToolKind::Pat,
        parameters: config,
        summary,
        sort: sort.describe(),
        rows: &rows,
    };
    let files = report::write_reports(&config.filename, &table(&rows, config), &json)?;

    Ok(ToolOutcome {
        tool: ToolKind::Pat,
        summary,
        rows: rows.len(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ThreadCount;
    use crate::tools::testing::{amplicon, FORWARD, REVERSE};

    fn config() -> RunConfig {
        RunConfig {
            forward: vec![FORWARD.to_string()],
            reverse: vec![REVERSE.to_string()],
            enzymes: vec!["GG^CC".to_string()],
            forward_shift: 0.5,
            threads: ThreadCount::Fixed(3),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_run_assigns_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let fl = FORWARD.len();
        // HaeIII cuts 4 and 12 symbols into the inner region
        let short = amplicon("AAGGCCAAAAAAAA");
        let long = amplicon("AAAAAAAAAAGGCCAAAA");
        let db = format!("Short one|S1|16S|{}\nLong one|L1|16S|{}\nShort two|S2|16S|{}\n", short, long, short);
        std::fs::write(dir.path().join("db.txt"), db).unwrap();
        std::fs::write(
            dir.path().join("sample.csv"),
            format!("0.8,{}\n0.2,{}\n", 4 + fl, 12 + fl),
        )
        .unwrap();

        let mut config = config();
        config.database = Some(dir.path().join("db.txt"));
        config.forward_sample = Some(dir.path().join("sample.csv"));
        config.filename = dir.path().join("pat").to_string_lossy().into_owned();
        config.sort_option = 4; // biomass descending

        let outcome = run(&config, None).unwrap();
        assert_eq!(outcome.rows, 3);
        assert_eq!(outcome.summary.records_amplified, 3);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(report::output_path(&config.filename, "json")).unwrap())
                .unwrap();
        let rows = json["rows"].as_array().unwrap();
        // 0.8 split over two records, then 0.2
        assert!((rows[0]["biomass"].as_f64().unwrap() - 0.4).abs() < 1e-12);
        assert!((rows[1]["biomass"].as_f64().unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(rows[2]["organism"], "Long one");
        assert!((rows[2]["biomass"].as_f64().unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(rows[2]["predicted"], 12 + fl);
    }

    #[test]
    fn test_unmatched_fragment_is_dropped() {
        let sample = SampleProfile::parse("1.0,1000\n", std::path::Path::new("s")).unwrap();
        let seq = amplicon("AAGGCCAAAAAAAA");
        let records = [("Org", "A", seq.as_str())];
        let (rows, summary) =
            collect(crate::tools::testing::database(&records), &config(), &sample, None).unwrap();
        assert!(rows.is_empty());
        assert_eq!(summary.records_amplified, 1);
    }
}
