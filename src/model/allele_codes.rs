//! # fastPHASE Allele Codes
//!
//! fastPHASE files carry alleles as 1-based integer codes. The code list of a
//! variant is `A, T, C, G` followed by every other allele of the variant
//! (indel sequences, ambiguous symbols) in REF/ALT order. The same list is
//! used to write fastPHASE input and to read fastPHASE results back.

/// Codes 1 to 4
pub const BASE_CODES: [&str; 4] = ["A", "T", "C", "G"];

/// Per-variant site type written on the fastPHASE flag line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiteFlag {
    /// Biallelic
    S,
    /// More than two alleles
    M,
}

impl SiteFlag {
    pub fn for_alleles(n_alleles: usize) -> Self {
        if n_alleles > 2 {
            SiteFlag::M
        } else {
            SiteFlag::S
        }
    }

    pub fn as_char(self) -> char {
        match self {
            SiteFlag::S => 'S',
            SiteFlag::M => 'M',
        }
    }

    /// Token for a missing allele at this kind of site
    pub fn missing_code(self) -> &'static str {
        match self {
            SiteFlag::S => "?",
            SiteFlag::M => "-1",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlleleCodes {
    codes: Vec<String>,
}

impl AlleleCodes {
    /// Code list for a variant given `[ref] ++ alts`
    pub fn for_alleles(alleles: &[&str]) -> Self {
        let mut codes: Vec<String> = BASE_CODES.iter().map(|b| b.to_string()).collect();
        for allele in alleles {
            if !codes.iter().any(|c| c.eq_ignore_ascii_case(allele)) {
                codes.push(allele.to_string());
            }
        }
        Self { codes }
    }

    /// 1-based code of an allele
    pub fn code_of(&self, allele: &str) -> Option<usize> {
        self.codes
            .iter()
            .position(|c| c.eq_ignore_ascii_case(allele))
            .map(|i| i + 1)
    }

    /// Allele for a 1-based code
    pub fn allele_of(&self, code: usize) -> Option<&str> {
        code.checked_sub(1)
            .and_then(|i| self.codes.get(i))
            .map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
