//! Mica - Microbial Community Analysis
//!
//! In-silico PCR and terminal restriction fragment analysis over a 16S
//! rRNA sequence database, built on bit-parallel IUPAC pattern matching.

pub mod analysis;
pub mod error;
pub mod tools;

pub use analysis::*;
pub use error::{Error, Result};
