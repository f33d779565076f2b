//! Closed-form names for the two large algorithmically named regions.
//!
//! Ideographs are named by a block prefix followed by their own codepoint in
//! uppercase hexadecimal. Hangul syllables are named by concatenating the
//! short names of their leading consonant, vowel and optional trailing
//! consonant. Neither needs any storage in the compressed table.

use serde::Deserialize;

use crate::MAX_CODEPOINT;

/// Prefix of every precomposed Hangul syllable name.
pub const SYLLABLE_PREFIX: &str = "HANGUL SYLLABLE ";

/// First precomposed Hangul syllable.
pub const SYLLABLE_BASE: u32 = 0xAC00;

/// Number of precomposed Hangul syllables.
pub const SYLLABLE_COUNT: u32 = L_COUNT * N_COUNT;

const L_COUNT: u32 = 19;
const V_COUNT: u32 = 21;
const T_COUNT: u32 = 28;
const N_COUNT: u32 = V_COUNT * T_COUNT;

/// Short names of the leading consonants. Index 11 (IEUNG) is silent.
const LEADING: [&str; L_COUNT as usize] = [
    "G", "GG", "N", "D", "DD", "L", "M", "B", "BB", "S", "SS", "", "J", "JJ", "C", "K", "T", "P",
    "H",
];

/// Short names of the vowels.
const VOWELS: [&str; V_COUNT as usize] = [
    "A", "AE", "YA", "YAE", "EO", "E", "YEO", "YE", "O", "WA", "WAE", "OE", "YO", "U", "WEO", "WE",
    "WI", "YU", "EU", "YI", "I",
];

/// Short names of the trailing consonants. Index 0 is "no trailing consonant".
const TRAILING: [&str; T_COUNT as usize] = [
    "", "G", "GG", "GS", "N", "NJ", "NH", "D", "L", "LG", "LM", "LB", "LS", "LT", "LP", "LH", "M",
    "B", "BS", "S", "SS", "NG", "J", "C", "K", "T", "P", "H",
];

/// A contiguous run of characters named `prefix` + uppercase hex codepoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdeographBlock {
    pub prefix: String,
    pub first: u32,
    pub last: u32,
}

impl IdeographBlock {
    pub fn new(prefix: impl Into<String>, first: u32, last: u32) -> Self {
        Self {
            prefix: prefix.into(),
            first,
            last,
        }
    }

    #[inline]
    pub const fn contains(&self, code: u32) -> bool {
        self.first <= code && code <= self.last
    }

    fn name(&self, code: u32) -> String {
        format!("{}{code:X}", self.prefix)
    }

    fn code(&self, name: &str) -> Option<u32> {
        let digits = name.strip_prefix(self.prefix.as_str())?;
        let code = parse_upper_hex(digits)?;
        self.contains(code).then_some(code)
    }
}

/// Parses one to six uppercase hexadecimal digits.
fn parse_upper_hex(digits: &str) -> Option<u32> {
    if digits.is_empty()
        || digits.len() > 6
        || !digits.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
    {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// The set of algorithmic naming rules a dataset relies on.
///
/// Every codepoint claimed here is absent from the compressed table, so the
/// rules must be consulted before any table access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRules {
    ideographs: Vec<IdeographBlock>,
    syllables: bool,
}

impl RangeRules {
    pub fn new(ideographs: Vec<IdeographBlock>, syllables: bool) -> Self {
        Self {
            ideographs,
            syllables,
        }
    }

    /// Rules that claim nothing; every lookup goes to the table.
    pub fn none() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn ideographs(&self) -> &[IdeographBlock] {
        &self.ideographs
    }

    pub const fn syllables(&self) -> bool {
        self.syllables
    }

    /// Whether `code` is named by a rule rather than by the table.
    pub fn claims(&self, code: u32) -> bool {
        (self.syllables && is_syllable(code)) || self.ideographs.iter().any(|b| b.contains(code))
    }

    /// Name of `code` if a rule covers it.
    pub fn name(&self, code: u32) -> Option<String> {
        if code > MAX_CODEPOINT {
            return None;
        }
        if self.syllables && is_syllable(code) {
            return syllable_name(code);
        }
        self.ideographs
            .iter()
            .find(|block| block.contains(code))
            .map(|block| block.name(code))
    }

    /// Codepoint named `name` if a rule recognizes it.
    pub fn code(&self, name: &str) -> Option<u32> {
        let syllable = if self.syllables { syllable_code(name) } else { None };
        syllable.or_else(|| self.ideographs.iter().find_map(|block| block.code(name)))
    }
}

#[inline]
const fn is_syllable(code: u32) -> bool {
    code.wrapping_sub(SYLLABLE_BASE) < SYLLABLE_COUNT
}

/// Name of a precomposed Hangul syllable, or `None` outside `AC00..=D7A3`.
pub fn syllable_name(code: u32) -> Option<String> {
    if !is_syllable(code) {
        return None;
    }
    let index = code - SYLLABLE_BASE;
    let l = (index / N_COUNT) as usize;
    let v = ((index % N_COUNT) / T_COUNT) as usize;
    let t = (index % T_COUNT) as usize;

    let mut name = String::with_capacity(SYLLABLE_PREFIX.len() + 7);
    name.push_str(SYLLABLE_PREFIX);
    name.push_str(LEADING[l]);
    name.push_str(VOWELS[v]);
    name.push_str(TRAILING[t]);
    Some(name)
}

/// Codepoint of a Hangul syllable name.
///
/// Each component is matched greedily by longest entry; the trailing part, if
/// any, must be consumed exactly.
pub fn syllable_code(name: &str) -> Option<u32> {
    let rest = name.strip_prefix(SYLLABLE_PREFIX)?;
    let (l, rest) = longest_prefix(&LEADING, rest)?;
    let (v, rest) = longest_prefix(&VOWELS, rest)?;
    let t = if rest.is_empty() {
        0
    } else {
        TRAILING.iter().skip(1).position(|t| *t == rest)? + 1
    };
    Some(SYLLABLE_BASE + (l as u32 * V_COUNT + v as u32) * T_COUNT + t as u32)
}

fn longest_prefix<'a>(table: &[&str], s: &'a str) -> Option<(usize, &'a str)> {
    table
        .iter()
        .enumerate()
        .filter(|(_, entry)| s.starts_with(**entry))
        .max_by_key(|(_, entry)| entry.len())
        .map(|(index, entry)| (index, &s[entry.len()..]))
}
