//! # Genotype Decoding
//!
//! Split a `GT` subfield into its two allele tokens and separator. Tokens
//! are kept as strings: `.` (missing) and the imputed missing-data token pass
//! through untouched and callers decide how to interpret numbers.

use std::fmt;

/// Missing allele token
pub const MISSING: &str = ".";

/// Default token marking a call imputed by an earlier tool
pub const DEFAULT_IMPUTED_MD_ID: &str = "99";

/// Allele separator; both forms are preserved per sample
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Separator {
    Unphased,
    Phased,
}

impl Separator {
    pub fn as_char(self) -> char {
        match self {
            Separator::Unphased => '/',
            Separator::Phased => '|',
        }
    }
}

/// A diploid call: two allele tokens and their separator
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Genotype {
    pub left: String,
    pub right: String,
    pub sep: Separator,
}

impl Genotype {
    pub fn new(left: impl Into<String>, right: impl Into<String>, sep: Separator) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            sep,
        }
    }

    /// Parse `GT` text, splitting on the first `/` or `|`.
    /// Returns `None` when there is no separator.
    pub fn parse(gt: &str) -> Option<Self> {
        let idx = gt.find(['/', '|'])?;
        let sep = if gt.as_bytes()[idx] == b'|' {
            Separator::Phased
        } else {
            Separator::Unphased
        };
        Some(Self {
            left: gt[..idx].to_string(),
            right: gt[idx + 1..].to_string(),
            sep,
        })
    }

    /// True if either side is `.`
    pub fn has_missing(&self) -> bool {
        self.left == MISSING || self.right == MISSING
    }

    /// True if either side equals `token`
    pub fn has_token(&self, token: &str) -> bool {
        self.left == token || self.right == token
    }

    /// Both sides are `0` or `1`
    pub fn is_fully_observed_biallelic(&self) -> bool {
        is_biallelic_index(&self.left) && is_biallelic_index(&self.right)
    }

    /// Same separator, new alleles
    pub fn with_alleles(&self, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            sep: self.sep,
        }
    }

    /// Order the two tokens so that `left <= right`
    pub fn sorted(mut self) -> Self {
        if self.left > self.right {
            std::mem::swap(&mut self.left, &mut self.right);
        }
        self
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.left, self.sep.as_char(), self.right)
    }
}

fn is_biallelic_index(token: &str) -> bool {
    token == "0" || token == "1"
}

/// Resolve an allele token to its sequence using `[ref] ++ alts`.
/// `None` for `.`, the imputed token, or an index out of range.
pub fn allele_for_token<'a>(token: &str, alleles: &[&'a str]) -> Option<&'a str> {
    token
        .parse::<usize>()
        .ok()
        .and_then(|idx| alleles.get(idx).copied())
}

/// IUPAC ambiguity symbol for an unordered pair of alleles.
///
/// Identical bases give the base itself, missing sides give `N`, and any
/// allele that is not a single nucleotide gives `?`.
pub fn iupac_code(a: Option<&str>, b: Option<&str>) -> char {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return 'N',
    };
    let (a, b) = match (single_base(a), single_base(b)) {
        (Some(a), Some(b)) => (a, b),
        _ => return '?',
    };
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    match (lo, hi) {
        (x, y) if x == y => x,
        ('A', 'G') => 'R',
        ('C', 'T') => 'Y',
        ('C', 'G') => 'S',
        ('A', 'T') => 'W',
        ('G', 'T') => 'K',
        ('A', 'C') => 'M',
        _ => '?',
    }
}

fn single_base(allele: &str) -> Option<char> {
    let mut chars = allele.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let c = c.to_ascii_uppercase();
            matches!(c, 'A' | 'C' | 'G' | 'T').then_some(c)
        }
        _ => None,
    }
}
