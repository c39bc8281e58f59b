//! Virtual restriction digest of a delimited amplicon

use serde::Serialize;

use super::pattern::{Enzyme, ScanDirection, TemplateWindow};

/// Fragments produced by one enzyme on one amplicon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digestion {
    /// Size of every fragment cut off, 5' to 3'; empty when the enzyme never cut
    pub cuts: Vec<usize>,
    /// Terminal fragment carrying the forward primer
    pub forward_fragment: usize,
    /// Terminal fragment carrying the reverse primer
    pub reverse_fragment: usize,
}

impl Digestion {
    pub fn is_cut(&self) -> bool {
        !self.cuts.is_empty()
    }
}

/// Cut `inner` (the amplicon without its primer sites) with `enzyme`.
///
/// Terminal fragment sizes add back the primer lengths. Without a cut both
/// terminal fragments are the whole amplicon.
pub fn digest(inner: &[u8], enzyme: &Enzyme, forward_len: usize, reverse_len: usize) -> Digestion {
    let n = inner.len();
    let width = enzyme.len();
    let mut cuts = Vec::new();
    let mut prior = 0;

    if width > 0 && width <= n {
        let mut window = TemplateWindow::new(inner, width, ScanDirection::LeftToRight);
        let mut idx = width - 1;
        while idx < n {
            if enzyme.recognizes(&window) {
                let size = window
                    .consumed()
                    .saturating_sub(enzyme.right_offset() + prior);
                cuts.push(size);
                prior += size;
                // the site is consumed by the cut
                window.clear();
            }
            idx += 1;
            if let Some(&symbol) = inner.get(idx) {
                window.append(symbol);
            }
        }
    }

    let digestion = if cuts.is_empty() {
        let full = forward_len + reverse_len + n;
        Digestion {
            cuts,
            forward_fragment: full,
            reverse_fragment: full,
        }
    } else {
        Digestion {
            forward_fragment: cuts[0] + forward_len,
            reverse_fragment: n - prior + reverse_len,
            cuts,
        }
    };
    log::trace!(
        "{} cut {} times: forward {} reverse {}",
        enzyme.site(),
        digestion.cuts.len(),
        digestion.forward_fragment,
        digestion.reverse_fragment
    );
    digestion
}

/// Digest with each enzyme independently, keeping enzyme order
pub fn digest_all(inner: &[u8], enzymes: &[Enzyme], forward_len: usize, reverse_len: usize) -> Vec<Digestion> {
    enzymes
        .iter()
        .map(|enzyme| digest(inner, enzyme, forward_len, reverse_len))
        .collect()
}
