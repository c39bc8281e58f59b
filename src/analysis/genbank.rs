//! GenBank flat file import
//!
//! Records run from a `LOCUS` line to the `//` terminator. Only the locus
//! name, accession, organism and `ORIGIN` sequence are kept; everything else
//! in the record is ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::seqdb::{clean_sequence, SequenceRecord, FIELD_DELIMITER};
use crate::error::Result;

/// Placeholder for fields a record does not carry
const MISSING_FIELD: &str = "none";

/// Organism names longer than this are shortened with an ellipsis
const MAX_ORGANISM_LEN: usize = 60;

/// Fields collected while reading one record
#[derive(Debug, Default)]
struct RecordBuilder {
    locus: Option<String>,
    accession: Option<String>,
    organism: Option<String>,
    sequence: Vec<u8>,
    in_origin: bool,
}

impl RecordBuilder {
    fn add_line(&mut self, line: &str) {
        if self.in_origin {
            // "        1 cgaacgctgg cggcgtgcct ..." with the position first
            for part in line.split_whitespace().skip(1) {
                self.sequence.extend(part.bytes().map(origin_symbol));
            }
            return;
        }

        if line.starts_with("ORIGIN") {
            self.in_origin = true;
        } else if line.starts_with("LOCUS") {
            if self.locus.is_none() {
                self.locus = line.split_whitespace().nth(1).map(str::to_string);
            }
        } else if line.starts_with("ACCESSION") {
            if self.accession.is_none() {
                self.accession = line.split_whitespace().nth(1).map(str::to_string);
            }
        } else if let Some(rest) = line.split_once("GenBank entry:").map(|(_, rest)| rest) {
            if self.accession.is_none() {
                self.accession = rest
                    .split(|c: char| c.is_whitespace() || c == FIELD_DELIMITER)
                    .find(|s| !s.is_empty())
                    .map(str::to_string);
            }
        } else if let Some(definition) = line.strip_prefix("DEFINITION") {
            if self.organism.is_none() {
                self.organism = Some(definition.trim().to_string());
            }
        } else if let Some(rest) = line.split_once("/organism=").map(|(_, rest)| rest) {
            if self.organism.is_none() {
                self.organism = Some(rest.trim().trim_matches('"').to_string());
            }
        }
    }

    fn build(self) -> SequenceRecord {
        let field = |value: Option<String>| {
            value
                .map(|v| safe_text(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| MISSING_FIELD.to_string())
        };
        SequenceRecord {
            organism: shorten(&field(self.organism), MAX_ORGANISM_LEN),
            accession: field(self.accession),
            locus: field(self.locus),
            sequence: clean_sequence(&self.sequence),
        }
    }
}

/// RNA and unknown symbols are written as DNA
fn origin_symbol(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        b'U' => b'T',
        b'X' => b'N',
        other => other,
    }
}

/// Drop characters that break the database line format
fn safe_text(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '%' | '_' | '\'' | ';' | '"' | '\n' | '\r') && *c != FIELD_DELIMITER)
        .map(|c| if c == '&' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max - 3).collect();
    format!("{}...", kept)
}

/// Convert GenBank records from `input` into database lines on `output`.
/// Returns the number of records written; records without sequence are
/// skipped.
pub fn convert_genbank<I: BufRead, W: Write>(mut input: I, mut output: W) -> Result<usize> {
    let mut buffer = Vec::new();
    let mut current: Option<RecordBuilder> = None;
    let mut written = 0;
    let mut total_len = 0;

    loop {
        buffer.clear();
        if input.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim_end();

        if line.starts_with("//") {
            let Some(builder) = current.take() else {
                continue;
            };
            let record = builder.build();
            if record.sequence.is_empty() {
                log::warn!("GenBank record '{}' has no sequence, skipped", record.locus);
                continue;
            }
            total_len += record.sequence.len();
            writeln!(output, "{}", record.to_line())?;
            written += 1;
            continue;
        }

        if line.starts_with("LOCUS") {
            current = Some(RecordBuilder::default());
        }
        if let Some(builder) = current.as_mut() {
            builder.add_line(line);
        }
    }

    if current.is_some() {
        log::warn!("GenBank input ends inside a record without '//', record dropped");
    }
    output.flush()?;
    if written > 0 {
        log::info!(
            "{} GenBank records converted, average length {:.1}",
            written,
            total_len as f64 / written as f64
        );
    }
    Ok(written)
}

/// File-to-file form of [`convert_genbank`]
pub fn convert_genbank_file<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<usize> {
    let input = BufReader::new(File::open(input.as_ref())?);
    let output = BufWriter::new(File::create(output.as_ref())?);
    convert_genbank(input, output)
}
