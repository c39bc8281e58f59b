//! Four-channel bit patterns for primers, restriction sites and template windows
//!
//! A pattern keeps one 32-bit word per base channel. Appending a symbol shifts
//! every channel left by one bit and ORs in that symbol's channel bits, so the
//! most recently appended symbol always sits in bit 0. Comparing two patterns
//! is a per-channel AND folded together with OR: bit `k` of the result is set
//! when the two symbols at that position share at least one base.

use serde::{Deserialize, Serialize};

use super::iupac::{encode_symbol, is_target_symbol, Channel, Table};
use crate::error::PatternError;

/// Widest pattern a channel word can hold
pub const MAX_PATTERN_WIDTH: usize = u32::BITS as usize;

/// Marks the cleavage point inside a restriction site, e.g. `G^AATTC`
pub const CUT_MARKER: u8 = b'^';

/// Mask with the low `width` bits set
#[inline]
fn low_bits(width: usize) -> u32 {
    if width >= MAX_PATTERN_WIDTH {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Shared bit storage behind primers, enzymes and template windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternVector {
    channels: [u32; 4],
    width: usize,
    mask: u32,
}

impl PatternVector {
    /// Empty pattern holding at most `width` symbols (capped at 32)
    pub fn with_width(width: usize) -> Self {
        let width = width.min(MAX_PATTERN_WIDTH);
        Self {
            channels: [0; 4],
            width,
            mask: low_bits(width),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn channel(&self, channel: Channel) -> u32 {
        self.channels[channel.index()]
    }

    /// Shift one symbol's channel bits in; the oldest symbol falls off the mask.
    #[inline]
    pub fn push(&mut self, bits: [u32; 4]) {
        for (word, bit) in self.channels.iter_mut().zip(bits) {
            *word = ((*word << 1) | bit) & self.mask;
        }
    }

    /// Forget every symbol but keep the width
    pub fn clear(&mut self) {
        self.channels = [0; 4];
    }

    /// Positions at which both patterns admit a common base
    #[inline]
    pub fn overlap(&self, other: &PatternVector) -> u32 {
        self.channels
            .iter()
            .zip(other.channels.iter())
            .fold(0, |acc, (a, b)| acc | (a & b))
    }
}

/// Mismatch tolerance of primer matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MismatchPolicy {
    /// Mismatches tolerated inside the window
    pub allowed: usize,
    /// Number of symbols at the primer's 5' end where mismatches are tolerated
    pub window: usize,
}

impl MismatchPolicy {
    pub fn new(allowed: usize, window: usize) -> Self {
        Self { allowed, window }
    }

    /// No mismatches anywhere
    pub fn exact() -> Self {
        Self::default()
    }
}

/// Strand a primer anneals to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

fn check_symbols(pattern: &str, symbols: &[u8]) -> Result<(), PatternError> {
    if symbols.len() > MAX_PATTERN_WIDTH {
        return Err(PatternError::TooLong {
            pattern: pattern.to_string(),
            length: symbols.len(),
            max: MAX_PATTERN_WIDTH,
        });
    }
    if let Some(position) = symbols.iter().position(|&b| !is_target_symbol(b)) {
        return Err(PatternError::InvalidSymbol {
            pattern: pattern.to_string(),
            symbol: symbols[position] as char,
            position,
        });
    }
    Ok(())
}

/// A degenerate PCR primer encoded with the target table.
///
/// The low `conserved_len` bits (the primer's 3' end) must match exactly; the
/// remaining high bits form the mismatch window at the 5' end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primer {
    sequence: String,
    strand: Strand,
    pattern: PatternVector,
    conserved: usize,
    window: usize,
    required: usize,
}

impl Primer {
    /// Encode a primer that anneals to the template as written
    pub fn forward(sequence: &str, policy: MismatchPolicy) -> Result<Self, PatternError> {
        Self::build(sequence, Strand::Forward, policy)
    }

    /// Encode a primer that anneals to the reverse complement of the template.
    ///
    /// The string is scanned in the same order as a forward primer, but each
    /// channel draws its bit from the complementary base, so it lines up with
    /// a template window read backwards from the 3' end.
    pub fn reverse(sequence: &str, policy: MismatchPolicy) -> Result<Self, PatternError> {
        Self::build(sequence, Strand::Reverse, policy)
    }

    fn build(sequence: &str, strand: Strand, policy: MismatchPolicy) -> Result<Self, PatternError> {
        let symbols = sequence.as_bytes();
        check_symbols(sequence, symbols)?;

        let mut pattern = PatternVector::with_width(symbols.len());
        for &symbol in symbols {
            let bits = encode_symbol(symbol, Table::Target);
            let bits = match strand {
                Strand::Forward => bits,
                Strand::Reverse => {
                    Channel::ALL.map(|channel| bits[channel.complement().index()])
                }
            };
            pattern.push(bits);
        }

        let window = policy.window.min(symbols.len());
        Ok(Self {
            sequence: sequence.to_string(),
            strand,
            pattern,
            conserved: symbols.len() - window,
            window,
            required: window.saturating_sub(policy.allowed),
        })
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn pattern(&self) -> &PatternVector {
        &self.pattern
    }

    pub fn len(&self) -> usize {
        self.pattern.width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the 3' region that must match exactly
    pub fn conserved_len(&self) -> usize {
        self.conserved
    }

    /// Test the primer against a template window of the same width.
    ///
    /// Every conserved position must agree; within the 5' window at least
    /// `window - allowed` positions must agree.
    pub fn matches(&self, window: &TemplateWindow) -> bool {
        let combined = self.pattern.overlap(window.pattern());
        if !combined & low_bits(self.conserved) != 0 {
            return false;
        }

        let tail = combined.checked_shr(self.conserved as u32).unwrap_or(0) & low_bits(self.window);
        tail.count_ones() as usize >= self.required
    }
}

/// A restriction endonuclease recognition site with its cut position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enzyme {
    site: String,
    recognition: String,
    pattern: PatternVector,
    left_offset: usize,
    right_offset: usize,
}

impl Enzyme {
    /// Parse a site such as `G^AATTC`. Without a marker the cut is assumed at
    /// the 5' end of the site.
    pub fn parse(site: &str) -> Result<Self, PatternError> {
        let bytes = site.as_bytes();
        let mut markers = bytes
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == CUT_MARKER)
            .map(|(i, _)| i);
        let left_offset = markers.next().unwrap_or(0);
        if markers.next().is_some() {
            return Err(PatternError::MultipleCutMarkers {
                pattern: site.to_string(),
            });
        }

        // positions are reported within the site as written, marker included
        if let Some(position) = bytes.iter().position(|&b| b != CUT_MARKER && !is_target_symbol(b)) {
            return Err(PatternError::InvalidSymbol {
                pattern: site.to_string(),
                symbol: bytes[position] as char,
                position,
            });
        }
        let recognition: Vec<u8> = bytes.iter().copied().filter(|&b| b != CUT_MARKER).collect();
        check_symbols(site, &recognition)?;

        let mut pattern = PatternVector::with_width(recognition.len());
        for &symbol in &recognition {
            pattern.push(encode_symbol(symbol, Table::Target));
        }

        Ok(Self {
            site: site.to_string(),
            right_offset: recognition.len() - left_offset,
            recognition: String::from_utf8_lossy(&recognition).into_owned(),
            pattern,
            left_offset,
        })
    }

    /// Site as configured, including the cut marker
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Recognition sequence without the cut marker
    pub fn recognition(&self) -> &str {
        &self.recognition
    }

    pub fn pattern(&self) -> &PatternVector {
        &self.pattern
    }

    pub fn len(&self) -> usize {
        self.pattern.width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Symbols of the site that stay on the 5' fragment
    pub fn left_offset(&self) -> usize {
        self.left_offset
    }

    /// Symbols of the site that go to the 3' fragment
    pub fn right_offset(&self) -> usize {
        self.right_offset
    }

    /// Exact recognition (ambiguity codes aside). Only the given strand is
    /// tested, which is sufficient for palindromic sites.
    pub fn recognizes(&self, window: &TemplateWindow) -> bool {
        self.pattern.overlap(window.pattern()) == self.pattern.mask()
    }
}

/// Direction in which a template window consumes its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// From the 5' end, for forward primers and restriction sites
    LeftToRight,
    /// From the 3' end backwards, for reverse primers
    RightToLeft,
}

/// Rolling window over a template sequence, encoded with the template table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateWindow {
    pattern: PatternVector,
    consumed: usize,
}

impl TemplateWindow {
    /// Load the first `width` symbols of `template` in `direction`
    pub fn new(template: &[u8], width: usize, direction: ScanDirection) -> Self {
        let mut window = Self::empty(width);
        let width = width.min(template.len());
        match direction {
            ScanDirection::LeftToRight => template[..width].iter().for_each(|&b| window.append(b)),
            ScanDirection::RightToLeft => template[template.len() - width..]
                .iter()
                .rev()
                .for_each(|&b| window.append(b)),
        }
        window
    }

    /// Window with nothing consumed yet
    pub fn empty(width: usize) -> Self {
        Self {
            pattern: PatternVector::with_width(width),
            consumed: 0,
        }
    }

    /// Shift the next template symbol into the window
    #[inline]
    pub fn append(&mut self, symbol: u8) {
        self.pattern.push(encode_symbol(symbol, Table::Template));
        self.consumed += 1;
    }

    /// Drop the bit history; matching restarts once the window refills
    pub fn clear(&mut self) {
        self.pattern.clear();
    }

    /// Number of template symbols consumed so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn pattern(&self) -> &PatternVector {
        &self.pattern
    }

    pub fn width(&self) -> usize {
        self.pattern.width()
    }
}
