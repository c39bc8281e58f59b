//! Shared data types for analysis runs

use serde::{Deserialize, Serialize};

/// Thread count configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadCount {
    /// Use all available CPU cores
    Auto,
    /// Use a specific number of threads
    Fixed(usize),
}

impl Default for ThreadCount {
    fn default() -> Self {
        Self::Auto
    }
}

impl ThreadCount {
    /// Get the actual number of threads to use
    pub fn get_count(&self) -> usize {
        match self {
            Self::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            Self::Fixed(n) => (*n).max(1),
        }
    }

    /// `auto` or a positive count
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("auto") {
            return Some(Self::Auto);
        }
        match value.parse::<usize>() {
            Ok(n) if n > 0 => Some(Self::Fixed(n)),
            _ => None,
        }
    }
}

/// Which analysis produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Virtual digest with several enzymes
    Ispar,
    /// T-RFLP community profile from forward and reverse samples
    Aplaus,
    /// Phylogenetic assignment from a forward sample
    Pat,
    /// Primer pair prevalence
    Pspa,
    /// Enzyme resolving power
    Erpa,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ispar => "ispar",
            Self::Aplaus => "aplaus",
            Self::Pat => "pat",
            Self::Pspa => "pspa",
            Self::Erpa => "erpa",
        }
    }
}

/// Counters of one database scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Records read from the database
    pub records_scanned: usize,
    /// Records in which the primer pair delimited an amplicon
    pub records_amplified: usize,
}

/// Progress update during a database scan
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub records_scanned: usize,
    pub records_amplified: usize,
    pub message: String,
}
