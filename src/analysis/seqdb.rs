//! Sequence database access
//!
//! The database is plain text with one record per line and four
//! pipe-separated fields: `organism|accession|locus|sequence`. FASTA files
//! are converted into this format with [`convert_fasta`], GenBank files with
//! `convert_genbank`.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::Mutex;

use bio::io::fasta;
use serde::Serialize;

use crate::error::{Error, Result};

/// Field separator of the database format
pub const FIELD_DELIMITER: char = '|';

/// Separator of annotation fields in FASTA headers
const HEADER_DELIMITER: char = ';';

/// Characters dropped from FASTA sequences on conversion
const STRIPPED_SYMBOLS: &[char] = &['%', '_', '\'', '&', ';', '"'];

/// One database entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceRecord {
    pub organism: String,
    pub accession: String,
    pub locus: String,
    pub sequence: String,
}

impl SequenceRecord {
    fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.splitn(4, FIELD_DELIMITER);
        let organism = fields.next()?.trim();
        let accession = fields.next()?.trim();
        let locus = fields.next()?.trim();
        let sequence = fields.next()?.trim();
        Some(Self {
            organism: organism.to_string(),
            accession: accession.to_string(),
            locus: locus.to_string(),
            sequence: sequence.to_ascii_uppercase(),
        })
    }

    /// Render as one database line, without the newline
    pub fn to_line(&self) -> String {
        format!(
            "{organism}{d}{accession}{d}{locus}{d}{sequence}",
            organism = self.organism,
            accession = self.accession,
            locus = self.locus,
            sequence = self.sequence,
            d = FIELD_DELIMITER
        )
    }
}

/// Sequential reader over a database file
pub struct SequenceDatabase<R> {
    reader: R,
    line: usize,
    buffer: Vec<u8>,
}

impl SequenceDatabase<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        log::debug!("opened sequence database {:?}", path.as_ref());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> SequenceDatabase<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buffer: Vec::new(),
        }
    }

    /// Next well-formed record. Blank lines are skipped; malformed lines are
    /// logged and skipped. Bytes that are not UTF-8 are replaced, so one badly
    /// encoded line never ends the scan. `Ok(None)` marks the end of the database.
    pub fn next_record(&mut self) -> Result<Option<SequenceRecord>> {
        loop {
            self.buffer.clear();
            if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = String::from_utf8_lossy(&self.buffer);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match SequenceRecord::parse_line(text) {
                Some(record) => return Ok(Some(record)),
                None => log::warn!(
                    "sequence database line {}: expected organism|accession|locus|sequence, line skipped",
                    self.line
                ),
            }
        }
    }

    /// Lines read so far, including skipped ones
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for SequenceDatabase<R> {
    type Item = Result<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

struct CursorState<R> {
    database: SequenceDatabase<R>,
    records: usize,
    finished: bool,
    error: Option<Error>,
}

/// Database cursor shared by all workers. Each call to
/// [`SharedCursor::next_record`] takes the lock once.
pub struct SharedCursor<R> {
    state: Mutex<CursorState<R>>,
}

impl<R: BufRead> SharedCursor<R> {
    pub fn new(database: SequenceDatabase<R>) -> Self {
        Self {
            state: Mutex::new(CursorState {
                database,
                records: 0,
                finished: false,
                error: None,
            }),
        }
    }

    /// Hand out the next record, or `None` once the database is exhausted.
    /// A read error ends the stream for every worker and is kept for
    /// [`SharedCursor::finish`].
    pub fn next_record(&self) -> Option<SequenceRecord> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.finished {
            return None;
        }
        match state.database.next_record() {
            Ok(Some(record)) => {
                state.records += 1;
                Some(record)
            }
            Ok(None) => {
                state.finished = true;
                None
            }
            Err(err) => {
                log::error!("sequence database read failed: {}", err);
                state.finished = true;
                state.error = Some(err);
                None
            }
        }
    }

    /// Number of records handed out, or the read error that stopped the scan
    pub fn finish(self) -> Result<usize> {
        let state = match self.state.into_inner() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        match state.error {
            Some(err) => Err(err),
            None => Ok(state.records),
        }
    }
}

/// Split a FASTA header into accession, locus and organism.
///
/// Annotation fields are separated by `;`: the accession is the first word of
/// the first field, the locus the second-to-last field and the organism the
/// last field.
fn parse_fasta_header(id: &str, desc: Option<&str>) -> (String, String, String) {
    let header = match desc {
        Some(desc) => format!("{} {}", id, desc),
        None => id.to_string(),
    };
    let fields: Vec<&str> = header.split(HEADER_DELIMITER).map(str::trim).collect();

    let accession = fields[0].split_whitespace().next().unwrap_or(id).to_string();
    if fields.len() < 2 {
        let organism = desc.map(str::trim).filter(|d| !d.is_empty()).unwrap_or(id);
        return (accession.clone(), accession, organism.to_string());
    }

    let locus = fields[fields.len() - 2].to_string();
    let organism = fields[fields.len() - 1].to_string();
    (accession, locus, organism)
}

pub(crate) fn clean_sequence(seq: &[u8]) -> String {
    String::from_utf8_lossy(seq)
        .chars()
        .filter(|c| !STRIPPED_SYMBOLS.contains(c) && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Convert FASTA records from `input` into database lines on `output`.
/// Returns the number of records written.
pub fn convert_fasta<I: Read, W: Write>(input: I, mut output: W) -> Result<usize> {
    let reader = fasta::Reader::new(input);
    let mut written = 0;

    for result in reader.records() {
        let record = result.map_err(|e| Error::Fasta(e.to_string()))?;
        let (accession, locus, organism) = parse_fasta_header(record.id(), record.desc());
        let entry = SequenceRecord {
            organism,
            accession,
            locus,
            sequence: clean_sequence(record.seq()),
        };
        if entry.sequence.is_empty() {
            log::warn!("FASTA record '{}' has no sequence, skipped", record.id());
            continue;
        }
        writeln!(output, "{}", entry.to_line())?;
        written += 1;
    }

    output.flush()?;
    Ok(written)
}

/// File-to-file form of [`convert_fasta`]
pub fn convert_fasta_file<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<usize> {
    let input = File::open(input.as_ref())?;
    let output = std::io::BufWriter::new(File::create(output.as_ref())?);
    convert_fasta(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DATABASE: &str = "\
Escherichia coli|J01695|rrnB|agagtttgatcatggctcag
\n\
broken line without fields
Bacillus subtilis | AB042061 | 16S | ACGTACGT \n";

    #[test]
    fn test_reads_records_and_skips_bad_lines() {
        let mut db = SequenceDatabase::new(Cursor::new(DATABASE));
        let first = db.next_record().unwrap().unwrap();
        assert_eq!(first.organism, "Escherichia coli");
        assert_eq!(first.accession, "J01695");
        assert_eq!(first.locus, "rrnB");
        assert_eq!(first.sequence, "AGAGTTTGATCATGGCTCAG");

        let second = db.next_record().unwrap().unwrap();
        assert_eq!(second.organism, "Bacillus subtilis");
        assert_eq!(second.locus, "16S");
        assert_eq!(second.sequence, "ACGTACGT");

        assert!(db.next_record().unwrap().is_none());
        assert_eq!(db.lines_read(), 4);
    }

    #[test]
    fn test_iterator_collects_records() {
        let records: Vec<_> = SequenceDatabase::new(Cursor::new(DATABASE))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].to_line(), "Bacillus subtilis|AB042061|16S|ACGTACGT");
    }

    #[test]
    fn test_latin1_line_does_not_end_the_scan() {
        let bytes = b"Escherichia coli|A1|16S|ACGT\nM\xfcller strain|A2|16S|GGCC\nBacillus|A3|16S|TTAA\n".to_vec();
        let cursor = SharedCursor::new(SequenceDatabase::new(Cursor::new(bytes)));
        let mut accessions = Vec::new();
        while let Some(record) = cursor.next_record() {
            accessions.push(record.accession);
        }
        assert_eq!(accessions, vec!["A1", "A2", "A3"]);
        assert_eq!(cursor.finish().unwrap(), 3);
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let bytes = b"M\xfcller|A2|16S|ggcc\n".to_vec();
        let record = SequenceDatabase::new(Cursor::new(bytes)).next_record().unwrap().unwrap();
        assert_eq!(record.organism, "M\u{fffd}ller");
        assert_eq!(record.sequence, "GGCC");
    }

    #[test]
    fn test_shared_cursor_hands_out_each_record_once() {
        let text: String = (0..100)
            .map(|i| format!("org{}|acc{}|loc|ACGT\n", i, i))
            .collect();
        let cursor = SharedCursor::new(SequenceDatabase::new(Cursor::new(text)));
        let seen = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    while let Some(record) = cursor.next_record() {
                        seen.lock().unwrap().push(record.accession);
                    }
                });
            }
        });

        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 100);
        assert_eq!(cursor.finish().unwrap(), 100);
    }

    #[test]
    fn test_fasta_header_fields() {
        assert_eq!(
            parse_fasta_header("AB000001.1", Some("Bacteria; Firmicutes; rrnA; Bacillus subtilis")),
            ("AB000001.1".into(), "rrnA".into(), "Bacillus subtilis".into())
        );
        assert_eq!(
            parse_fasta_header("X1;locus9;Some organism", None),
            ("X1".into(), "locus9".into(), "Some organism".into())
        );
        assert_eq!(
            parse_fasta_header("X2", Some("Escherichia coli")),
            ("X2".into(), "X2".into(), "Escherichia coli".into())
        );
        assert_eq!(parse_fasta_header("X3", None), ("X3".into(), "X3".into(), "X3".into()));
    }

    #[test]
    fn test_convert_fasta() {
        let fasta = ">S1 Bacteria; 16S; Escherichia coli\nagag_ttt%g\nATC;A\n>S2 empty; x; y\n\n>S3 Archaea; rrs; Haloferax\nGGGG\n";
        let mut out = Vec::new();
        let written = convert_fasta(fasta.as_bytes(), &mut out).unwrap();
        assert_eq!(written, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Escherichia coli|S1|16S|AGAGTTTGATCA");
        assert_eq!(lines[1], "Haloferax|S3|rrs|GGGG");

        let records: Vec<_> = SequenceDatabase::new(Cursor::new(text.clone()))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records[0].sequence, "AGAGTTTGATCA");
    }

    #[test]
    fn test_convert_fasta_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fasta");
        let output = dir.path().join("db.txt");
        std::fs::write(&input, ">A1 x; loc; Org\nACGT\n").unwrap();
        assert_eq!(convert_fasta_file(&input, &output).unwrap(), 1);
        let db = SequenceDatabase::open(&output).unwrap();
        let records: Vec<_> = db.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records[0].organism, "Org");
    }
}
