//! Parameter file parsing
//!
//! A parameter file holds one `key value` pair per line. Keys and values may
//! be separated by spaces, tabs or `=`; lines starting with `#` are comments
//! and unknown keys are ignored. `forward`, `reverse` and `enzyme` may repeat
//! and keep their order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::pattern::{Enzyme, MismatchPolicy, Primer};
use super::types::ThreadCount;
use crate::error::{ConfigError, PatternError, Result};

const SEPARATORS: &[char] = &[' ', '=', '\t'];

/// Settings of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Output prefix; reports are written to `<filename>.txt` and friends
    pub filename: String,
    pub database: Option<PathBuf>,
    pub forward: Vec<String>,
    pub reverse: Vec<String>,
    pub enzymes: Vec<String>,
    /// Mismatches tolerated within the `max_base` 5' symbols of a primer
    pub mismatch: usize,
    pub max_base: usize,
    pub sort_option: usize,
    /// Bin width for matching forward fragments against the sample
    pub forward_shift: f64,
    /// Bin width for matching reverse fragments against the sample
    pub reverse_shift: f64,
    pub output_all: bool,
    pub forward_sample: Option<PathBuf>,
    pub reverse_sample: Option<PathBuf>,
    pub threads: ThreadCount,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            filename: "mica".to_string(),
            database: None,
            forward: Vec::new(),
            reverse: Vec::new(),
            enzymes: Vec::new(),
            mismatch: 0,
            max_base: 0,
            sort_option: 0,
            forward_shift: 0.0,
            reverse_shift: 0.0,
            output_all: true,
            forward_sample: None,
            reverse_sample: None,
            threads: ThreadCount::Auto,
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

impl RunConfig {
    /// Read a parameter file. The output prefix defaults to the file's path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::parse(&text, &path.to_string_lossy())?;
        log::debug!("parameters from {:?}: {:?}", path, config);
        Ok(config)
    }

    pub fn parse(text: &str, default_filename: &str) -> std::result::Result<Self, ConfigError> {
        let mut config = Self {
            filename: default_filename.to_string(),
            ..Self::default()
        };

        for line in text.lines() {
            let line = line.trim_start();
            if line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split(SEPARATORS).filter(|t| !t.is_empty());
            let key = match tokens.next() {
                Some(key) => key,
                None => continue,
            };
            let value = tokens.next().unwrap_or("");
            config.set(key, value)?;
        }

        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigError> {
        let known = [
            "database",
            "filename",
            "forward",
            "reverse",
            "enzyme",
            "mismatch",
            "max_base",
            "sort_option",
            "forward_shift",
            "reverse_shift",
            "output_all",
            "forward_sample",
            "reverse_sample",
            "threads",
        ];
        if !known.contains(&key) {
            log::debug!("ignoring unknown parameter '{}'", key);
            return Ok(());
        }
        if value.is_empty() {
            return Err(invalid(key, value));
        }

        match key {
            "database" => self.database = Some(PathBuf::from(value)),
            "filename" => self.filename = value.to_string(),
            "forward" => self.forward.push(value.to_ascii_uppercase()),
            "reverse" => self.reverse.push(value.to_ascii_uppercase()),
            "enzyme" => self.enzymes.push(value.to_ascii_uppercase()),
            "mismatch" => self.mismatch = parse_number(key, value)?,
            "max_base" => self.max_base = parse_number(key, value)?,
            "sort_option" => self.sort_option = parse_number(key, value)?,
            "forward_shift" => self.forward_shift = parse_number(key, value)?,
            "reverse_shift" => self.reverse_shift = parse_number(key, value)?,
            "output_all" => self.output_all = parse_number::<i64>(key, value)? != 0,
            "forward_sample" => self.forward_sample = Some(PathBuf::from(value)),
            "reverse_sample" => self.reverse_sample = Some(PathBuf::from(value)),
            "threads" => self.threads = ThreadCount::parse(value).ok_or_else(|| invalid(key, value))?,
            _ => {}
        }
        Ok(())
    }

    pub fn mismatch_policy(&self) -> MismatchPolicy {
        MismatchPolicy::new(self.mismatch, self.max_base)
    }

    pub fn require_database(&self) -> std::result::Result<&Path, ConfigError> {
        self.database.as_deref().ok_or(ConfigError::Missing("database"))
    }

    pub fn require_forward_sample(&self) -> std::result::Result<&Path, ConfigError> {
        self.forward_sample.as_deref().ok_or(ConfigError::Missing("forward_sample"))
    }

    pub fn require_reverse_sample(&self) -> std::result::Result<&Path, ConfigError> {
        self.reverse_sample.as_deref().ok_or(ConfigError::Missing("reverse_sample"))
    }

    /// Every configured forward primer, encoded
    pub fn forward_primers(&self) -> Result<Vec<Primer>> {
        build_primers(&self.forward, "forward", self.mismatch_policy(), Primer::forward)
    }

    /// Every configured reverse primer, encoded
    pub fn reverse_primers(&self) -> Result<Vec<Primer>> {
        build_primers(&self.reverse, "reverse", self.mismatch_policy(), Primer::reverse)
    }

    /// The first forward and reverse primer
    pub fn primer_pair(&self) -> Result<(Primer, Primer)> {
        let forward = self.forward_primers()?.swap_remove(0);
        let reverse = self.reverse_primers()?.swap_remove(0);
        Ok((forward, reverse))
    }

    /// Every configured restriction enzyme, encoded
    pub fn endonucleases(&self) -> Result<Vec<Enzyme>> {
        if self.enzymes.is_empty() {
            return Err(ConfigError::Missing("enzyme").into());
        }
        self.enzymes
            .iter()
            .map(|site| -> Result<Enzyme> {
                let enzyme = Enzyme::parse(site)?;
                if enzyme.is_empty() {
                    return Err(ConfigError::EmptyPattern("enzyme").into());
                }
                log::debug!(
                    "enzyme {} cuts after {} of {} symbols",
                    enzyme.site(),
                    enzyme.left_offset(),
                    enzyme.len()
                );
                Ok(enzyme)
            })
            .collect()
    }
}

fn build_primers(
    sequences: &[String],
    key: &'static str,
    policy: MismatchPolicy,
    build: fn(&str, MismatchPolicy) -> std::result::Result<Primer, PatternError>,
) -> Result<Vec<Primer>> {
    if sequences.is_empty() {
        return Err(ConfigError::Missing(key).into());
    }
    sequences
        .iter()
        .map(|sequence| -> Result<Primer> {
            let primer = build(sequence, policy)?;
            if primer.is_empty() {
                return Err(ConfigError::EmptyPattern(key).into());
            }
            log::debug!(
                "{} primer {} ({} symbols, {} conserved)",
                key,
                primer.sequence(),
                primer.len(),
                primer.conserved_len()
            );
            Ok(primer)
        })
        .collect()
}
