//! Plausible community composition from a T-RFLP profile
//!
//! Records are amplified and digested with the first enzyme. A record joins
//! the community when both its predicted terminal fragments fall within the
//! bin of an observed peak in the forward and reverse samples. Each peak's
//! biomass is then shared among the records that matched it.

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

/// A record whose terminal fragments match both samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NicheRow {
    pub forward_predicted: usize,
    pub reverse_predicted: usize,
    pub forward_observed: f64,
    pub reverse_observed: f64,
    /// Normalised relative abundance
    pub biomass: f64,
    pub accession: String,
    pub organism: String,
    #[serde(skip)]
    forward_peak: usize,
    #[serde(skip)]
    reverse_peak: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NicheSortField {
    ObservedForward,
    ObservedReverse,
    Biomass,
    Organism,
}

impl SortField for NicheSortField {
    const ALL: &'static [Self] = &[
        Self::ObservedForward,
        Self::ObservedReverse,
        Self::Biomass,
        Self::Organism,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::ObservedForward => "sample forward fragment size",
            Self::ObservedReverse => "sample reverse fragment size",
            Self::Biomass => "species abundance",
            Self::Organism => "species name",
        }
    }
}

fn compare(field: NicheSortField, a: &NicheRow, b: &NicheRow) -> Ordering {
    match field {
        NicheSortField::ObservedForward => a.forward_observed.total_cmp(&b.forward_observed),
        NicheSortField::ObservedReverse => a.reverse_observed.total_cmp(&b.reverse_observed),
        NicheSortField::Biomass => a.biomass.total_cmp(&b.biomass),
        NicheSortField::Organism => a.organism.cmp(&b.organism),
    }
}

/// Observed peaks and the bins used to match them
pub struct Samples {
    pub forward: SampleProfile,
    pub reverse: SampleProfile,
    pub forward_bin: f64,
    pub reverse_bin: f64,
}

impl Samples {
    pub fn load(config: &RunConfig) -> Result<Self> {
        Ok(Self {
            forward: SampleProfile::load(config.require_forward_sample()?)?,
            reverse: SampleProfile::load(config.require_reverse_sample()?)?,
            forward_bin: config.forward_shift,
            reverse_bin: config.reverse_shift,
        })
    }
}

/// Collect every record whose predicted fragments match both samples
pub fn collect<R: BufRead + Send>(
    database: SequenceDatabase<R>,
    config: &RunConfig,
    samples: &Samples,
    progress_tx: Option<Sender<ProgressUpdate>>,
) -> Result<(Vec<NicheRow>, ScanSummary)> {
    let (forward, reverse) = config.primer_pair()?;
    let enzymes = config.endonucleases()?;
    let enzyme = &enzymes[0];
    let matcher = SlidingMatcher::new(&forward, &reverse);

    scan_database(database, config.threads, progress_tx, |record, sink| {
        let amplicon = match matcher.delimit(record.sequence.as_bytes()) {
            Some(amplicon) => amplicon,
            None => return false,
        };
        let digestion = digest(amplicon.inner, enzyme, forward.len(), reverse.len());

        let peaks = (
            samples.forward.find(digestion.forward_fragment, samples.forward_bin),
            samples.reverse.find(digestion.reverse_fragment, samples.reverse_bin),
        );
        if let (Some(forward_peak), Some(reverse_peak)) = peaks {
            let observed = |profile: &SampleProfile, peak| profile.get(peak).map(|p| p.fragment).unwrap_or(0.0);
            sink.push(NicheRow {
                forward_predicted: digestion.forward_fragment,
                reverse_predicted: digestion.reverse_fragment,
                forward_observed: observed(&samples.forward, forward_peak),
                reverse_observed: observed(&samples.reverse, reverse_peak),
                biomass: 0.0,
                accession: record.accession.clone(),
                organism: record.organism.clone(),
                forward_peak,
                reverse_peak,
            });
        }
        true
    })
}

/// Share peak biomass among matched rows and normalise to 1
pub fn assign_biomass(rows: &mut [NicheRow], samples: &Samples) {
    let forward = samples.forward.shares(rows.iter().map(|r| r.forward_peak));
    let reverse = samples.reverse.shares(rows.iter().map(|r| r.reverse_peak));

    let mut biomass: Vec<f64> = rows
        .iter()
        .map(|r| forward[r.forward_peak] + reverse[r.reverse_peak])
        .collect();
    normalize(&mut biomass);
    for (row, value) in rows.iter_mut().zip(biomass) {
        row.biomass = value;
    }
}

pub fn table(rows: &[NicheRow], config: &RunConfig) -> Table {
    let preamble = vec![
        report::returned_line(rows.len()),
        report::primer_line(config),
        report::enzyme_line(&config.enzymes[..config.enzymes.len().min(1)]),
        report::mismatch_line(config),
    ];
    let mut table = Table::new(&["Forward", "Reverse", "Forward", "Reverse", "Abundance", "Accession", "Name"])
        .with_preamble(preamble);
    for row in rows {
        table.push_row(vec![
            Cell::Count(row.forward_predicted),
            Cell::Count(row.reverse_predicted),
            Cell::Real(row.forward_observed, 2),
            Cell::Real(row.reverse_observed, 2),
            Cell::Real(row.biomass, 6),
            Cell::text(row.accession.as_str()),
            Cell::text(row.organism.as_str()),
        ]);
    }
    table
}

pub fn run(config: &RunConfig, progress_tx: Option<Sender<ProgressUpdate>>) -> Result<ToolOutcome> {
    let sort = SortSpec::<NicheSortField>::from_code(config.sort_option)?;
    let samples = Samples::load(config)?;
    let database = open_database(config)?;

    let (mut rows, summary) = collect(database, config, &samples, progress_tx)?;
    assign_biomass(&mut rows, &samples);
    sort.apply(&mut rows, compare);

    let json = JsonReport {
        tool: ToolKind::Aplaus,
        parameters: config,
        summary,
        sort: sort.describe(),
        rows: &rows,
    };
    let files = report::write_reports(&config.filename, &table(&rows, config), &json)?;

    Ok(ToolOutcome {
        tool: ToolKind::Aplaus,
        summary,
        rows: rows.len(),
        files,
    })
}
