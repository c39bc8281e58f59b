//! Error types shared by the engine and the analysis tools

use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning a primer or restriction site into a bit pattern
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern '{pattern}' has {length} symbols, at most {max} are supported")]
    TooLong {
        pattern: String,
        length: usize,
        max: usize,
    },

    #[error("pattern '{pattern}' contains invalid symbol '{symbol}' at position {position}")]
    InvalidSymbol {
        pattern: String,
        symbol: char,
        position: usize,
    },

    #[error("restriction site '{pattern}' contains more than one cut marker")]
    MultipleCutMarkers { pattern: String },
}

/// Problems with the parameter file or command-line overrides
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("required parameter '{0}' is missing")]
    Missing(&'static str),

    #[error("parameter '{key}' has invalid value '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("sort option {option} is out of range (0..{max})")]
    SortOption { option: usize, max: usize },

    #[error("parameter '{0}' is empty")]
    EmptyPattern(&'static str),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("sample file {path:?} line {line}: {message}")]
    Sample {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("FASTA input: {0}")]
    Fasta(String),

    #[error("JSON report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
