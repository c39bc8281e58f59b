//! IUPAC ambiguity tables and per-symbol channel encoding
//!
//! Every nucleotide symbol resolves to four base channels (A, C, G, T). The
//! tables below pack that resolution into one 32-bit word per channel, keyed
//! by the symbol's position in the Latin alphabet (`A` = bit 0 ... `Z` = bit 25).

use once_cell::sync::Lazy;

/// Number of letters covered by the packed tables
pub const ALPHABET_SIZE: usize = 26;

/// One of the four base channels of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    A = 0,
    C = 1,
    G = 2,
    T = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::A, Channel::C, Channel::G, Channel::T];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Watson-Crick partner channel (A<->T, C<->G)
    #[inline]
    pub fn complement(self) -> Channel {
        match self {
            Channel::A => Channel::T,
            Channel::C => Channel::G,
            Channel::G => Channel::C,
            Channel::T => Channel::A,
        }
    }
}

/// Which ambiguity table resolves a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Scanned template sequences; N, X and I never contribute a bit
    Template,
    /// Primers and restriction sites; N, X and I are wildcards
    Target,
}

//                                ZY XWVU TSRQ PONM LKJI HGFE DCBA
/// Ambiguity table for template sequences
pub const TEMPLATE_TABLE: [u32; 4] = [
    0x0062_1089, // adenine  0000:0000:0110:0010:0001:0000:1000:1001
    0x0124_1086, // cytosine 0000:0001:0010:0100:0001:0000:1000:0110
    0x0026_044a, // guanine  0000:0000:0010:0110:0000:0100:0100:1010
    0x0158_048a, // thymine  0000:0001:0101:1000:0000:0100:1000:1010
];

/// Ambiguity table for primers and restriction sites
pub const TARGET_TABLE: [u32; 4] = [
    0x00e2_3189, // adenine  0000:0000:1110:0010:0011:0001:1000:1001
    0x01a4_3186, // cytosine 0000:0001:1010:0100:0011:0001:1000:0110
    0x00a6_254a, // guanine  0000:0000:1010:0110:0010:0101:0100:1010
    0x01d8_258a, // thymine  0000:0001:1101:1000:0010:0101:1000:1010
];

/// Bitmask representation: bit 0 = A, bit 1 = C, bit 2 = G, bit 3 = T
static TEMPLATE_MASKS: Lazy<[u8; ALPHABET_SIZE]> = Lazy::new(|| unpack(&TEMPLATE_TABLE));
static TARGET_MASKS: Lazy<[u8; ALPHABET_SIZE]> = Lazy::new(|| unpack(&TARGET_TABLE));

/// Lookup table: 4-bit bitmask index -> IUPAC code byte.
/// Index 0 (no bases) maps to b'?' and should not occur with valid DNA data.
pub const IUPAC_FROM_MASK: [u8; 16] = [
    b'?', // 0b0000 - no bases (invalid)
    b'A', // 0b0001
    b'C', // 0b0010
    b'M', // 0b0011 - A|C
    b'G', // 0b0100
    b'R', // 0b0101 - A|G
    b'S', // 0b0110 - C|G
    b'V', // 0b0111 - A|C|G
    b'T', // 0b1000
    b'W', // 0b1001 - A|T
    b'Y', // 0b1010 - C|T
    b'H', // 0b1011 - A|C|T
    b'K', // 0b1100 - G|T
    b'D', // 0b1101 - A|G|T
    b'B', // 0b1110 - C|G|T
    b'N', // 0b1111 - A|C|G|T
];

fn unpack(table: &[u32; 4]) -> [u8; ALPHABET_SIZE] {
    let mut masks = [0u8; ALPHABET_SIZE];
    for (letter, mask) in masks.iter_mut().enumerate() {
        for channel in Channel::ALL {
            *mask |= (((table[channel.index()] >> letter) & 0x1) as u8) << channel.index();
        }
    }
    masks
}

#[inline]
fn letter_index(symbol: u8) -> Option<usize> {
    if symbol.is_ascii_uppercase() {
        Some((symbol - b'A') as usize)
    } else {
        None
    }
}

/// Channel mask of a symbol under the chosen table.
/// Symbols outside `A`..=`Z` resolve to 0 and can never match.
#[inline]
pub fn symbol_mask(symbol: u8, table: Table) -> u8 {
    match letter_index(symbol) {
        Some(letter) => match table {
            Table::Template => TEMPLATE_MASKS[letter],
            Table::Target => TARGET_MASKS[letter],
        },
        None => 0,
    }
}

/// 1 if `symbol` admits the base of `channel` under `table`, otherwise 0
#[inline]
pub fn resolve(symbol: u8, channel: Channel, table: Table) -> u32 {
    ((symbol_mask(symbol, table) >> channel.index()) & 0x1) as u32
}

/// Per-channel bits of one symbol, indexed by `Channel::index`
#[inline]
pub fn encode_symbol(symbol: u8, table: Table) -> [u32; 4] {
    let mask = symbol_mask(symbol, table);
    [
        (mask & 0x1) as u32,
        ((mask >> 1) & 0x1) as u32,
        ((mask >> 2) & 0x1) as u32,
        ((mask >> 3) & 0x1) as u32,
    ]
}

/// Check if a symbol may appear in a primer or restriction site
pub fn is_target_symbol(symbol: u8) -> bool {
    symbol_mask(symbol, Table::Target) != 0
}

/// Swap the A/T and C/G bits of a channel mask
#[inline]
pub fn complement_mask(mask: u8) -> u8 {
    ((mask & 0b0001) << 3) | ((mask & 0b0010) << 1) | ((mask & 0b0100) >> 1) | ((mask & 0b1000) >> 3)
}

/// Compute the reverse complement of a primer-alphabet sequence.
/// Wildcards without a canonical code (I, X) and unknown bytes are kept as-is.
pub fn reverse_complement(seq: &str) -> String {
    seq.bytes()
        .rev()
        .map(|b| {
            let mask = symbol_mask(b, Table::Target);
            if IUPAC_FROM_MASK[mask as usize] == b {
                IUPAC_FROM_MASK[complement_mask(mask) as usize] as char
            } else {
                b as char
            }
        })
        .collect()
}
