//! Observed fragment profiles (electropherogram peaks) and biomass shares

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

const VALUE_DELIMITERS: &[char] = &[' ', ',', ';', '|', '\t'];

/// One observed peak: fragment size and its relative abundance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObservedFragment {
    pub biomass: f64,
    pub fragment: f64,
}

/// Peaks of one sample, in file order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleProfile {
    fragments: Vec<ObservedFragment>,
}

impl SampleProfile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let profile = Self::parse(&text, path)?;
        log::debug!("loaded {} observed fragments from {:?}", profile.len(), path);
        Ok(profile)
    }

    /// Each line holds `biomass` then `fragment`, separated by any of
    /// ` ,;|` or tab. Lines shorter than three characters are skipped.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut fragments = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.len() < 3 {
                continue;
            }
            let error = |message: String| Error::Sample {
                path: path.to_path_buf(),
                line: idx + 1,
                message,
            };

            let mut values = line.split(VALUE_DELIMITERS).filter(|v| !v.is_empty());
            let (biomass, fragment) = match (values.next(), values.next()) {
                (Some(b), Some(f)) => (b, f),
                _ => return Err(error("expected biomass and fragment size".to_string())),
            };
            let biomass: f64 = biomass
                .parse()
                .map_err(|_| error(format!("invalid biomass '{}'", biomass)))?;
            let fragment: f64 = fragment
                .parse()
                .map_err(|_| error(format!("invalid fragment size '{}'", fragment)))?;
            fragments.push(ObservedFragment { biomass, fragment });
        }

        Ok(Self { fragments })
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[ObservedFragment] {
        &self.fragments
    }

    pub fn get(&self, index: usize) -> Option<&ObservedFragment> {
        self.fragments.get(index)
    }

    /// Index of the first peak within `bin` of a predicted fragment size
    pub fn find(&self, predicted: usize, bin: f64) -> Option<usize> {
        let predicted = predicted as f64;
        self.fragments
            .iter()
            .position(|peak| (peak.fragment - predicted).abs() <= bin)
    }

    /// Biomass of every peak split evenly across the predictions matched to
    /// it. `matches` holds the matched peak index of each prediction.
    pub fn shares<I>(&self, matches: I) -> Vec<f64>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut counts = vec![0usize; self.fragments.len()];
        for index in matches {
            if let Some(count) = counts.get_mut(index) {
                *count += 1;
            }
        }
        self.fragments
            .iter()
            .zip(counts)
            .map(|(peak, count)| peak.biomass / count.max(1) as f64)
            .collect()
    }
}

/// Scale `values` to sum to 1. A zero total leaves them untouched.
pub fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(text: &str) -> SampleProfile {
        SampleProfile::parse(text, Path::new("sample.csv")).unwrap()
    }

    #[test]
    fn test_parse_mixed_delimiters() {
        let p = profile("0.5,120\n\n1\n0.25;  88.5\n0.25|301\t\n2\t64\n");
        assert_eq!(p.len(), 4);
        assert_eq!(p.fragments()[0], ObservedFragment { biomass: 0.5, fragment: 120.0 });
        assert_eq!(p.fragments()[1].fragment, 88.5);
        assert_eq!(p.fragments()[3].biomass, 2.0);
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = SampleProfile::parse("0.5,120\nabc,12\n", Path::new("s.csv")).unwrap_err();
        match err {
            Error::Sample { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(SampleProfile::parse("0.125\n", Path::new("s.csv")).is_err());
    }

    #[test]
    fn test_find_first_peak_within_bin() {
        let p = profile("1,100\n1,103\n1,250\n");
        assert_eq!(p.find(101, 1.0), Some(0));
        assert_eq!(p.find(102, 1.0), Some(1));
        assert_eq!(p.find(102, 2.0), Some(0));
        assert_eq!(p.find(104, 0.0), None);
        assert_eq!(p.find(250, 0.0), Some(2));
    }

    #[test]
    fn test_shares_split_biomass() {
        let p = profile("0.6,100\n0.4,200\n0.2,300\n");
        let shares = p.shares(vec![0, 0, 0, 1]);
        assert!((shares[0] - 0.2).abs() < 1e-12);
        assert!((shares[1] - 0.4).abs() < 1e-12);
        assert!((shares[2] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_normalize() {
        let mut values = vec![1.0, 3.0];
        normalize(&mut values);
        assert_eq!(values, vec![0.25, 0.75]);

        let mut zeros = vec![0.0, 0.0];
        normalize(&mut zeros);
        assert_eq!(zeros, vec![0.0, 0.0]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forward.csv");
        std::fs::write(&path, "0.7,95\n0.3,410\n").unwrap();
        let p = SampleProfile::load(&path).unwrap();
        assert_eq!(p.get(1).map(|f| f.fragment), Some(410.0));
    }
}
