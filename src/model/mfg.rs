//! # Most-Frequent-Genotype Imputation
//!
//! Per-variant kernel of the naive imputer. Each variant is independent, so
//! the pipeline can run this on any number of workers and still produce the
//! same output.
//!
//! ## Algorithm
//! 1. Count GT strings (separator included) over samples whose two alleles
//!    are both `0` or `1`.
//! 2. No such sample: the variant is left alone.
//! 3. Otherwise the most frequent string wins, ties going to the one seen
//!    first in sample order.
//! 4. Every sample whose GT contains `.` takes the winning alleles and keeps
//!    its own separator.

use crate::data::genotype::{allele_for_token, iupac_code, Genotype};
use crate::data::record::VariantRecord;
use crate::error::Result;

/// Header of the imputation sidecar file
pub const SIDECAR_HEADER: &str = "chrom;pos;ref;alt;samples_with_md;symbolic_genotypes";

/// What the imputer did to one variant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidecarRecord {
    pub chrom: String,
    pub pos: u64,
    pub ref_allele: String,
    pub alt: String,
    /// Zero-based indices of the samples that were missing before imputation
    pub samples_with_md: Vec<usize>,
    /// One IUPAC symbol per sample after imputation
    pub symbolic_genotypes: String,
}

impl SidecarRecord {
    pub fn to_line(&self) -> String {
        let indices: Vec<String> = self.samples_with_md.iter().map(|i| i.to_string()).collect();
        format!(
            "{};{};{};{};{};{}",
            self.chrom,
            self.pos,
            self.ref_allele,
            self.alt,
            indices.join(","),
            self.symbolic_genotypes
        )
    }
}

/// Impute one variant. Returns the (possibly rewritten) record and a sidecar
/// entry when at least one sample changed.
pub fn impute_variant(
    mut record: VariantRecord,
    imputed_md_id: &str,
) -> Result<(VariantRecord, Option<SidecarRecord>)> {
    record.require_biallelic()?;
    let gt_idx = record.gt_index()?;
    let genotypes = record.genotypes()?;

    let winner = match most_frequent(&genotypes) {
        Some(gt) => gt.clone(),
        None => return Ok((record, None)),
    };

    let mut samples_with_md = Vec::new();
    let mut imputed = Vec::with_capacity(genotypes.len());
    for (s, gt) in genotypes.into_iter().enumerate() {
        if gt.has_missing() {
            let filled = gt.with_alleles(winner.left.as_str(), winner.right.as_str());
            record.set_genotype(s, gt_idx, &filled);
            samples_with_md.push(s);
            imputed.push(filled);
        } else {
            imputed.push(gt);
        }
    }

    if samples_with_md.is_empty() {
        return Ok((record, None));
    }

    let symbolic_genotypes = symbolic_string(&record, &imputed, imputed_md_id);
    let sidecar = SidecarRecord {
        chrom: record.chrom.clone(),
        pos: record.pos,
        ref_allele: record.ref_allele.clone(),
        alt: record.alt.clone(),
        samples_with_md,
        symbolic_genotypes,
    };
    Ok((record, Some(sidecar)))
}

/// Most frequent fully observed biallelic GT, first seen on ties
fn most_frequent(genotypes: &[Genotype]) -> Option<&Genotype> {
    // (genotype, count) in first-seen order; a handful of distinct values at most
    let mut counts: Vec<(&Genotype, usize)> = Vec::with_capacity(4);
    for gt in genotypes.iter().filter(|gt| gt.is_fully_observed_biallelic()) {
        match counts.iter_mut().find(|(seen, _)| *seen == gt) {
            Some((_, n)) => *n += 1,
            None => counts.push((gt, 1)),
        }
    }

    let mut best: Option<(&Genotype, usize)> = None;
    for (gt, n) in counts {
        if best.map_or(true, |(_, best_n)| n > best_n) {
            best = Some((gt, n));
        }
    }
    best.map(|(gt, _)| gt)
}

fn symbolic_string(record: &VariantRecord, genotypes: &[Genotype], imputed_md_id: &str) -> String {
    let alleles = record.alleles();
    let resolve = |token: &str| {
        if token == imputed_md_id {
            None
        } else {
            allele_for_token(token, &alleles)
        }
    };
    genotypes
        .iter()
        .map(|gt| iupac_code(resolve(gt.left.as_str()), resolve(gt.right.as_str())))
        .collect()
}
