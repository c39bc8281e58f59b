//! Primer-pair search over a template from both ends at once

use super::pattern::{Primer, ScanDirection, TemplateWindow};

/// Progress of a primer-pair search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Scanning,
    ForwardFound,
    ReverseFound,
    BothFound,
    Exhausted,
}

impl ScanState {
    fn from_flags(forward_found: bool, reverse_found: bool) -> Self {
        match (forward_found, reverse_found) {
            (false, false) => ScanState::Scanning,
            (true, false) => ScanState::ForwardFound,
            (false, true) => ScanState::ReverseFound,
            (true, true) => ScanState::BothFound,
        }
    }
}

/// Region of a template delimited by a primer pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amplicon<'t> {
    /// Template between the two primer sites
    pub inner: &'t [u8],
    /// Start of the forward primer site, counted from the 5' end
    pub forward_offset: usize,
    /// Start of the reverse primer site, counted from the 3' end
    pub reverse_offset: usize,
}

impl Amplicon<'_> {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Terminal outcome of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome<'t> {
    BothFound(Amplicon<'t>),
    /// The windows met before both primers matched
    Exhausted {
        forward_found: bool,
        reverse_found: bool,
    },
}

impl<'t> ScanOutcome<'t> {
    pub fn forward_found(&self) -> bool {
        match self {
            ScanOutcome::BothFound(_) => true,
            ScanOutcome::Exhausted { forward_found, .. } => *forward_found,
        }
    }

    pub fn reverse_found(&self) -> bool {
        match self {
            ScanOutcome::BothFound(_) => true,
            ScanOutcome::Exhausted { reverse_found, .. } => *reverse_found,
        }
    }

    pub fn state(&self) -> ScanState {
        match self {
            ScanOutcome::BothFound(_) => ScanState::BothFound,
            ScanOutcome::Exhausted { .. } => ScanState::Exhausted,
        }
    }

    pub fn amplicon(self) -> Option<Amplicon<'t>> {
        match self {
            ScanOutcome::BothFound(amplicon) => Some(amplicon),
            ScanOutcome::Exhausted { .. } => None,
        }
    }
}

/// Searches a template for a forward primer from the 5' end and a reverse
/// primer from the 3' end. Each side stops advancing once it matches; the
/// search ends when both have matched or the windows meet.
#[derive(Debug, Clone, Copy)]
pub struct SlidingMatcher<'p> {
    forward: &'p Primer,
    reverse: &'p Primer,
}

impl<'p> SlidingMatcher<'p> {
    pub fn new(forward: &'p Primer, reverse: &'p Primer) -> Self {
        Self { forward, reverse }
    }

    pub fn search<'t>(&self, template: &'t [u8]) -> ScanOutcome<'t> {
        let n = template.len();
        let fl = self.forward.len();
        let rl = self.reverse.len();
        if fl == 0 || rl == 0 || fl > n || rl > n {
            return ScanOutcome::Exhausted {
                forward_found: false,
                reverse_found: false,
            };
        }

        let mut forward_window = TemplateWindow::new(template, fl, ScanDirection::LeftToRight);
        let mut reverse_window = TemplateWindow::new(template, rl, ScanDirection::RightToLeft);
        // index of the newest symbol in each window
        let mut f_idx = fl - 1;
        let mut r_idx = n - rl;
        let mut state = ScanState::Scanning;

        while f_idx < r_idx {
            let mut forward_found = matches!(state, ScanState::ForwardFound);
            let mut reverse_found = matches!(state, ScanState::ReverseFound);

            // each side consumes one more symbol after its final test, so the
            // offsets below subtract one
            if !forward_found {
                forward_found = self.forward.matches(&forward_window);
                f_idx += 1;
                if let Some(&symbol) = template.get(f_idx) {
                    forward_window.append(symbol);
                }
            }
            if !reverse_found {
                reverse_found = self.reverse.matches(&reverse_window);
                r_idx -= 1;
                reverse_window.append(template[r_idx]);
            }

            state = ScanState::from_flags(forward_found, reverse_found);
            if state == ScanState::BothFound {
                let inner = if f_idx > r_idx {
                    &template[f_idx..f_idx]
                } else {
                    &template[f_idx..=r_idx]
                };
                let amplicon = Amplicon {
                    inner,
                    forward_offset: forward_window.consumed() - fl - 1,
                    reverse_offset: reverse_window.consumed() - rl - 1,
                };
                log::trace!(
                    "primer pair delimits {} symbols (forward at {}, reverse at {} from the end)",
                    amplicon.len(),
                    amplicon.forward_offset,
                    amplicon.reverse_offset
                );
                return ScanOutcome::BothFound(amplicon);
            }
        }

        ScanOutcome::Exhausted {
            forward_found: state == ScanState::ForwardFound,
            reverse_found: state == ScanState::ReverseFound,
        }
    }

    /// The amplified region between the primer sites, if both primers match
    pub fn delimit<'t>(&self, template: &'t [u8]) -> Option<Amplicon<'t>> {
        self.search(template).amplicon()
    }
}

/// Delimit `template` with a primer pair
pub fn delimit<'t>(template: &'t [u8], forward: &Primer, reverse: &Primer) -> Option<Amplicon<'t>> {
    SlidingMatcher::new(forward, reverse).delimit(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::iupac::reverse_complement;
    use crate::analysis::pattern::MismatchPolicy;

    const FORWARD: &str = "AGAGTTTGATCATGGCTCAG";
    const REVERSE: &str = "GGTTACCTTGTTACGACTT";

    fn primers() -> (Primer, Primer) {
        (
            Primer::forward(FORWARD, MismatchPolicy::exact()).unwrap(),
            Primer::reverse(REVERSE, MismatchPolicy::exact()).unwrap(),
        )
    }

    fn template(prefix: &str, inner: &str, suffix: &str) -> String {
        format!("{}{}{}{}{}", prefix, FORWARD, inner, reverse_complement(REVERSE), suffix)
    }

    #[test]
    fn test_first_window_match_consumes_primer_length() {
        let (forward, _) = primers();
        let seq = template("", "CCCCCCCCCC", "");
        let window = TemplateWindow::new(seq.as_bytes(), forward.len(), ScanDirection::LeftToRight);
        assert!(forward.matches(&window));
        assert_eq!(window.consumed(), FORWARD.len());
    }

    #[test]
    fn test_delimit_returns_inner_region() {
        let (forward, reverse) = primers();
        let seq = template("", "CCCCGGGGAA", "");
        let amplicon = delimit(seq.as_bytes(), &forward, &reverse).unwrap();
        assert_eq!(amplicon.inner, b"CCCCGGGGAA");
        assert_eq!(amplicon.forward_offset, 0);
        assert_eq!(amplicon.reverse_offset, 0);
    }

    #[test]
    fn test_delimit_with_flanking_sequence() {
        let (forward, reverse) = primers();
        let seq = template("TTTTT", "ACGTACGTACGTACGTACGT", "CCC");
        let amplicon = delimit(seq.as_bytes(), &forward, &reverse).unwrap();
        assert_eq!(amplicon.inner, b"ACGTACGTACGTACGTACGT");
        assert_eq!(amplicon.forward_offset, 5);
        assert_eq!(amplicon.reverse_offset, 3);
    }

    #[test]
    fn test_adjacent_primer_sites_give_empty_inner() {
        let (forward, reverse) = primers();
        let seq = template("", "", "");
        let amplicon = delimit(seq.as_bytes(), &forward, &reverse).unwrap();
        assert!(amplicon.is_empty());
    }

    #[test]
    fn test_missing_reverse_primer_is_exhausted() {
        let (forward, reverse) = primers();
        let seq = format!("{}{}", FORWARD, "ACGT".repeat(20));
        let outcome = SlidingMatcher::new(&forward, &reverse).search(seq.as_bytes());
        assert_eq!(outcome.state(), ScanState::Exhausted);
        assert!(outcome.forward_found());
        assert!(!outcome.reverse_found());
    }

    #[test]
    fn test_missing_forward_primer_is_exhausted() {
        let (forward, reverse) = primers();
        let seq = format!("{}{}", "ACGT".repeat(20), reverse_complement(REVERSE));
        let outcome = SlidingMatcher::new(&forward, &reverse).search(seq.as_bytes());
        assert_eq!(
            outcome,
            ScanOutcome::Exhausted {
                forward_found: false,
                reverse_found: true
            }
        );
    }

    #[test]
    fn test_short_template_is_exhausted() {
        let (forward, reverse) = primers();
        assert_eq!(delimit(b"AGAGTTTG", &forward, &reverse), None);
        assert_eq!(delimit(b"", &forward, &reverse), None);
    }

    #[test]
    fn test_mismatch_tolerance_applies_to_search() {
        let forward = Primer::forward(FORWARD, MismatchPolicy::new(1, 4)).unwrap();
        let reverse = Primer::reverse(REVERSE, MismatchPolicy::exact()).unwrap();
        let mut seq = template("GG", "TTTTTTTT", "");
        // disagree at the primer's first (5') symbol
        seq.replace_range(2..3, "C");
        let amplicon = delimit(seq.as_bytes(), &forward, &reverse).unwrap();
        assert_eq!(amplicon.inner, b"TTTTTTTT");
        assert_eq!(amplicon.forward_offset, 2);

        let exact = Primer::forward(FORWARD, MismatchPolicy::exact()).unwrap();
        assert_eq!(delimit(seq.as_bytes(), &exact, &reverse), None);
    }
}
