//! # Variant Records
//!
//! Typed form of one VCF data line: the nine fixed columns plus the raw
//! per-sample columns. Sample columns stay as text so that anything not
//! touched by a transformation is written back byte for byte.

use crate::data::genotype::{Genotype, MISSING};
use crate::error::{PopVcfError, Result};

/// One VCF data row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantRecord {
    pub chrom: String,
    pub pos: u64,
    pub id: String,
    pub ref_allele: String,
    pub alt: String,
    pub qual: String,
    pub filter: String,
    pub info: String,
    pub format: String,
    pub samples: Vec<String>,
}

impl VariantRecord {
    /// `{chrom}-{pos}`
    pub fn variant_id(&self) -> String {
        variant_id(&self.chrom, self.pos)
    }

    /// Ordering key used when merging streams
    pub fn sort_key(&self) -> (&str, u64) {
        (&self.chrom, self.pos)
    }

    /// Alternative alleles; empty when ALT is `.`
    pub fn alt_alleles(&self) -> Vec<&str> {
        if self.alt == MISSING {
            Vec::new()
        } else {
            self.alt.split(',').collect()
        }
    }

    /// `[ref] ++ alts`, indexable by numeric allele tokens
    pub fn alleles(&self) -> Vec<&str> {
        let mut alleles = Vec::with_capacity(2);
        alleles.push(self.ref_allele.as_str());
        alleles.extend(self.alt_alleles());
        alleles
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// At most one alternative allele
    pub fn is_biallelic(&self) -> bool {
        self.alt_alleles().len() <= 1
    }

    /// Fail with `L021` when ALT lists more than one allele
    pub fn require_biallelic(&self) -> Result<()> {
        if self.is_biallelic() {
            Ok(())
        } else {
            Err(PopVcfError::multiallelic(self.variant_id()))
        }
    }

    /// REF or any ALT longer than one base
    pub fn is_indel(&self) -> bool {
        self.ref_allele.len() > 1 || self.alt.split(',').any(|a| a.len() > 1)
    }

    /// Position of `GT` among the FORMAT subfields
    pub fn gt_index(&self) -> Result<usize> {
        self.format
            .split(':')
            .position(|f| f == "GT")
            .ok_or_else(|| PopVcfError::GtAbsent {
                variant_id: self.variant_id(),
            })
    }

    /// Decode the genotype of every sample
    pub fn genotypes(&self) -> Result<Vec<Genotype>> {
        let gt_idx = self.gt_index()?;
        (0..self.samples.len())
            .map(|s| self.genotype_at(s, gt_idx))
            .collect()
    }

    /// Decode one sample's genotype given the GT position
    pub fn genotype_at(&self, sample: usize, gt_idx: usize) -> Result<Genotype> {
        let field = &self.samples[sample];
        let gt = field.split(':').nth(gt_idx).ok_or_else(|| self.malformed(field))?;
        Genotype::parse(gt).ok_or_else(|| self.malformed(gt))
    }

    /// Replace the GT subfield of one sample, leaving other subfields as they are
    pub fn set_genotype(&mut self, sample: usize, gt_idx: usize, genotype: &Genotype) {
        let field = &self.samples[sample];
        let mut parts: Vec<&str> = field.split(':').collect();
        let rendered = genotype.to_string();
        if gt_idx < parts.len() {
            parts[gt_idx] = &rendered;
            self.samples[sample] = parts.join(":");
        }
    }

    /// Tab-joined line without terminator
    pub fn to_line(&self) -> String {
        let pos = self.pos.to_string();
        let fixed: [&str; 8] = [
            &self.chrom,
            &pos,
            &self.id,
            &self.ref_allele,
            &self.alt,
            &self.qual,
            &self.filter,
            &self.info,
        ];
        let mut line = String::with_capacity(64 + self.samples.len() * 8);
        line.push_str(&fixed.join("\t"));
        // sites-only lines have no FORMAT column
        if !self.format.is_empty() || !self.samples.is_empty() {
            line.push('\t');
            line.push_str(&self.format);
        }
        for sample in &self.samples {
            line.push('\t');
            line.push_str(sample);
        }
        line
    }

    fn malformed(&self, token: &str) -> PopVcfError {
        PopVcfError::MalformedGt {
            variant_id: self.variant_id(),
            token: token.to_string(),
        }
    }
}

/// `{chrom}-{pos}`
pub fn variant_id(chrom: &str, pos: u64) -> String {
    format!("{}-{}", chrom, pos)
}

/// Split a `chrom-pos` identifier at its last `-`
pub fn split_variant_id(id: &str) -> Option<(&str, &str)> {
    id.rsplit_once('-')
}
