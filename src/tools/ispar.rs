//! In-silico restriction analysis with several enzymes
//!
//! Every amplified record is digested with each configured enzyme; the
//! report lists the terminal fragments per enzyme and the shortest pair.

use std::cmp::Ordering;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::Sender;

use serde::Serialize;

use super::report::{self, Cell, JsonReport, Table};
use super::{open_database, ToolOutcome};
use crate::analysis::{
    digest_all, scan_database, Enzyme, Primer, ProgressUpdate, RunConfig, ScanSummary,
    SequenceDatabase, SequenceRecord, SlidingMatcher, SortField, SortSpec, ToolKind,
};
use crate::error::Result;

/// Terminal fragments of one amplified record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestRow {
    /// Forward terminal fragment per enzyme, in enzyme order
    pub forward: Vec<usize>,
    /// Reverse terminal fragment per enzyme, in enzyme order
    pub reverse: Vec<usize>,
    pub shortest_forward: usize,
    pub shortest_reverse: usize,
    pub accession: String,
    pub locus: String,
    pub organism: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSortField {
    ForwardFragment,
    ReverseFragment,
    ShortestForward,
    ShortestReverse,
    Organism,
}

impl SortField for DigestSortField {
    const ALL: &'static [Self] = &[
        Self::ForwardFragment,
        Self::ReverseFragment,
        Self::ShortestForward,
        Self::ShortestReverse,
        Self::Organism,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::ForwardFragment => "forward fragments",
            Self::ReverseFragment => "reverse fragments",
            Self::ShortestForward => "shortest forward fragment",
            Self::ShortestReverse => "shortest reverse fragment",
            Self::Organism => "organism name",
        }
    }
}

fn compare(field: DigestSortField, a: &DigestRow, b: &DigestRow) -> Ordering {
    match field {
        DigestSortField::ForwardFragment => a.forward.first().cmp(&b.forward.first()),
        DigestSortField::ReverseFragment => a.reverse.first().cmp(&b.reverse.first()),
        DigestSortField::ShortestForward => a.shortest_forward.cmp(&b.shortest_forward),
        DigestSortField::ShortestReverse => a.shortest_reverse.cmp(&b.shortest_reverse),
        DigestSortField::Organism => a.organism.cmp(&b.organism),
    }
}

/// Delimit and digest one record; `None` when the primers do not amplify it
pub fn digest_record(
    record: &SequenceRecord,
    matcher: &SlidingMatcher,
    enzymes: &[Enzyme],
    forward_len: usize,
    reverse_len: usize,
) -> Option<DigestRow> {
    let amplicon = matcher.delimit(record.sequence.as_bytes())?;
    let digestions = digest_all(amplicon.inner, enzymes, forward_len, reverse_len);

    let full = forward_len + reverse_len + amplicon.len();
    let cut = digestions.iter().filter(|d| d.is_cut());
    let shortest_forward = cut.clone().map(|d| d.forward_fragment).min().unwrap_or(full);
    let shortest_reverse = cut.map(|d| d.reverse_fragment).min().unwrap_or(full);

    Some(DigestRow {
        forward: digestions.iter().map(|d| d.forward_fragment).collect(),
        reverse: digestions.iter().map(|d| d.reverse_fragment).collect(),
        shortest_forward,
        shortest_reverse,
        accession: record.accession.clone(),
        locus: record.locus.clone(),
        organism: record.organism.clone(),
    })
}

/// Digest every amplified record of `database`
pub fn collect<R: BufRead + Send>(
    database: SequenceDatabase<R>,
    config: &RunConfig,
    progress_tx: Option<Sender<ProgressUpdate>>,
) -> Result<(Vec<DigestRow>, ScanSummary)> {
    let (forward, reverse): (Primer, Primer) = config.primer_pair()?;
    let enzymes = config.endonucleases()?;
    let matcher = SlidingMatcher::new(&forward, &reverse);
    log::info!("ispar: digesting with {} enzymes", enzymes.len());

    scan_database(database, config.threads, progress_tx, |record, sink| {
        match digest_record(record, &matcher, &enzymes, forward.len(), reverse.len()) {
            Some(row) => {
                sink.push(row);
                true
            }
            None => false,
        }
    })
}

pub fn table(rows: &[DigestRow], config: &RunConfig) -> Table {
    let preamble = vec![
        report::returned_line(rows.len()),
        report::primer_line(config),
        report::enzyme_line(&config.enzymes),
        report::mismatch_line(config),
    ];

    let mut columns = Vec::new();
    if config.output_all {
        for _ in &config.enzymes {
            columns.extend(["Forward", "Reverse"]);
        }
    } else {
        columns.extend(["Forward", "Reverse"]);
    }
    columns.extend(["Accession", "Locus", "Organism"]);

    let mut table = Table::new(&columns).with_preamble(preamble);
    for row in rows {
        let mut cells = Vec::new();
        if config.output_all {
            for (f, r) in row.forward.iter().zip(&row.reverse) {
                cells.push(Cell::Count(*f));
                cells.push(Cell::Count(*r));
            }
        } else {
            cells.push(Cell::Count(row.shortest_forward));
            cells.push(Cell::Count(row.shortest_reverse));
        }
        cells.push(Cell::text(row.accession.as_str()));
        cells.push(Cell::text(row.locus.as_str()));
        cells.push(Cell::text(row.organism.as_str()));
        table.push_row(cells);
    }
    table
}

/// Species-by-enzyme matrix of forward fragments, tab separated
pub fn write_pat<W: Write>(mut out: W, rows: &[DigestRow], enzymes: &[String]) -> io::Result<()> {
    write!(out, "Species")?;
    for enzyme in enzymes {
        write!(out, "\t{}", enzyme)?;
    }
    writeln!(out)?;

    for row in rows {
        write!(out, "{}", row.organism)?;
        for fragment in &row.forward {
            write!(out, "\t{}", fragment)?;
        }
        writeln!(out)?;
    }
    out.flush()
}

pub fn run(config: &RunConfig, progress_tx: Option<Sender<ProgressUpdate>>) -> Result<ToolOutcome> {
    let sort = SortSpec::<DigestSortField>::from_code(config.sort_option)?;
    let database = open_database(config)?;
    let (mut rows, summary) = collect(database, config, progress_tx)?;
    sort.apply(&mut rows, compare);

    let json = JsonReport {
        tool: ToolKind::Ispar,
        parameters: config,
        summary,
        sort: sort.describe(),
        rows: &rows,
    };
    let mut files = report::write_reports(&config.filename, &table(&rows, config), &json)?;

    let pat = report::output_path(&config.filename, "pat");
    report::write_file(&pat, |out| write_pat(out, &rows, &config.enzymes))?;
    files.push(pat);

    Ok(ToolOutcome {
        tool: ToolKind::Ispar,
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
    fn test_collect_digests_amplified_records() {
        let records = [
            ("Escherichia coli", "A1", amplicon("CCCCCCCCCCGAATTCCCCCGGCCTT")),
            ("Bacillus subtilis", "A2", amplicon("TTTTTTTTTTTTTTTTTTTT")),
            ("Not amplified", "A3", "ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT".to_string()),
        ];
        let refs: Vec<(&str, &str, &str)> = records.iter().map(|(o, a, s)| (*o, *a, s.as_str())).collect();
        let (mut rows, summary) = collect(database(&refs), &config(), None).unwrap();
        rows.sort_by(|a, b| a.accession.cmp(&b.accession));

        assert_eq!(summary.records_scanned, 3);
        assert_eq!(summary.records_amplified, 2);
        assert_eq!(rows.len(), 2);

        let fl = FORWARD.len();
        let rl = REVERSE.len();
        let coli = &rows[0];
        // EcoRI at inner position 10, HaeIII (GG^CC) at 20
        assert_eq!(coli.forward, vec![11 + fl, 22 + fl]);
        assert_eq!(coli.reverse, vec![26 - 11 + rl, 26 - 22 + rl]);
        assert_eq!(coli.shortest_forward, 11 + fl);
        assert_eq!(coli.shortest_reverse, 4 + rl);

        let subtilis = &rows[1];
        let full = fl + rl + 20;
        assert_eq!(subtilis.forward, vec![full, full]);
        assert_eq!(subtilis.shortest_forward, full);
        assert_eq!(subtilis.shortest_reverse, full);
    }

    #[test]
    fn test_table_layouts() {
        let row = DigestRow {
            forward: vec![31, 42],
            reverse: vec![34, 23],
            shortest_forward: 31,
            shortest_reverse: 23,
            accession: "A1".into(),
            locus: "16S".into(),
            organism: "Escherichia coli".into(),
        };
        let mut config = config();
        let all = table(std::slice::from_ref(&row), &config);
        assert_eq!(all.columns.len(), 7);
        assert_eq!(all.rows[0][1], Cell::Count(34));

        config.output_all = false;
        let short = table(&[row], &config);
        assert_eq!(short.columns, vec!["Forward", "Reverse", "Accession", "Locus", "Organism"]);
        assert_eq!(short.rows[0][..2], [Cell::Count(31), Cell::Count(23)]);
    }

    #[test]
    fn test_sort_by_shortest_reverse_descending() {
        let make = |name: &str, r: usize| DigestRow {
            forward: vec![1],
            reverse: vec![r],
            shortest_forward: 1,
            shortest_reverse: r,
            accession: name.into(),
            locus: String::new(),
            organism: name.into(),
        };
        let mut rows = vec![make("a", 5), make("b", 9), make("c", 7)];
        SortSpec::<DigestSortField>::from_code(8).unwrap().apply(&mut rows, compare);
        let order: Vec<&str> = rows.iter().map(|r| r.organism.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_pat_matrix() {
        let row = DigestRow {
            forward: vec![31, 42],
            reverse: vec![34, 23],
            shortest_forward: 31,
            shortest_reverse: 23,
            accession: "A1".into(),
            locus: "16S".into(),
            organism: "E. coli".into(),
        };
        let mut out = Vec::new();
        write_pat(&mut out, &[row], &["G^AATTC".into(), "GG^CC".into()]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Species\tG^AATTC\tGG^CC\nE. coli\t31\t42\n");
    }

    #[test]
    fn test_run_writes_reports() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("db.txt");
        std::fs::write(&db_path, format!("E. coli|A1|16S|{}\n", amplicon("CCCGAATTCCCC"))).unwrap();

        let mut config = config();
        config.database = Some(db_path);
        config.filename = dir.path().join("out").to_string_lossy().into_owned();
        let outcome = run(&config, None).unwrap();

        assert_eq!(outcome.rows, 1);
        assert_eq!(outcome.files.len(), 5);
        let pat = std::fs::read_to_string(report::output_path(&config.filename, "pat")).unwrap();
        assert!(pat.starts_with("Species\tG^AATTC\tGG^CC\n"));
    }
}
