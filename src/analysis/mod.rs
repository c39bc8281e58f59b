mod types;
mod iupac;
mod pattern;
mod matcher;
mod digest;
mod seqdb;
mod genbank;
mod params;
mod sample;
mod stats;
mod sort;
mod runner;

pub use types::*;
pub use iupac::*;
pub use pattern::*;
pub use matcher::*;
pub use digest::*;
pub use seqdb::*;
pub use genbank::*;
pub use params::*;
pub use sample::*;
pub use stats::*;
pub use sort::*;
pub use runner::*;
