//! # External-Tool Update
//!
//! Rewrites missing genotypes of a VCF from the results of an external
//! phasing/imputation tool. Each tool gets a [`CallSource`]; the streaming
//! loop is shared.
//!
//! ## Contract
//! - The source learns the VCF sample order when the header is read and
//!   reindexes its own samples by id. A different sample count or an id the
//!   VCF lacks is `L018`.
//! - Only samples whose GT contains `.` are rewritten. Their separator is
//!   kept.
//! - Bases that are neither REF nor an ALT become `*`.

pub mod fastphase;
pub mod mach;
pub mod rmatrix;

pub use fastphase::{FastphaseCalls, FastphaseUpdatePipeline};
pub use mach::{MachCalls, MachUpdatePipeline};
pub use rmatrix::{RMatrixCalls, RMatrixUpdatePipeline};

use std::collections::HashMap;

use crate::data::record::VariantRecord;
use crate::error::{PopVcfError, Result};
use crate::io::vcf::{VcfLine, VcfReader, VcfWriter};
use crate::utils::telemetry::{Progress, RunContext};

/// Token for a base matching no allele of the variant
pub const UNKNOWN_ALLELE: &str = "*";

/// Allele tokens for each VCF sample; `None` leaves the sample untouched
pub type SampleCalls = Vec<Option<(String, String)>>;

/// Results of an external tool, queried record by record in VCF order
pub trait CallSource {
    /// Bind the VCF sample order; called when the header is read
    fn bind_samples(&mut self, vcf_samples: &[String]) -> Result<()>;

    /// Calls for `record` in VCF sample order, or `None` when the source has
    /// nothing for it
    fn calls_for(&mut self, record: &VariantRecord) -> Result<Option<SampleCalls>>;
}

/// For each VCF sample, the index of the same id among `external` samples
pub fn reindex(external: &[String], vcf_samples: &[String]) -> Result<Vec<usize>> {
    if external.len() != vcf_samples.len() {
        return Err(PopVcfError::sample_set(format!(
            "{} samples in the external result, {} in the VCF",
            external.len(),
            vcf_samples.len()
        )));
    }
    let positions: HashMap<&str, usize> = external
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    vcf_samples
        .iter()
        .map(|id| {
            positions.get(id.as_str()).copied().ok_or_else(|| {
                PopVcfError::sample_set(format!("sample {} is not in the external result", id))
            })
        })
        .collect()
}

/// Allele token of a base: `0` for REF, the ALT index, or `*`
pub fn translate_base(base: &str, alleles: &[&str]) -> String {
    alleles
        .iter()
        .position(|a| a.eq_ignore_ascii_case(base))
        .map(|i| i.to_string())
        .unwrap_or_else(|| UNKNOWN_ALLELE.to_string())
}

/// Ordered pair, smaller token first
pub fn sorted_pair(a: String, b: String) -> (String, String) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Overwrite missing genotypes of `record`; returns how many changed
pub fn apply_calls(record: &mut VariantRecord, calls: &[Option<(String, String)>]) -> Result<usize> {
    let gt_idx = record.gt_index()?;
    let mut changed = 0;
    for s in 0..record.n_samples() {
        let gt = record.genotype_at(s, gt_idx)?;
        if !gt.has_missing() {
            continue;
        }
        if let Some(Some((left, right))) = calls.get(s) {
            record.set_genotype(s, gt_idx, &gt.with_alleles(left.as_str(), right.as_str()));
            changed += 1;
        }
    }
    Ok(changed)
}

/// Stream `reader` to `writer`, filling missing calls from `source`
pub fn update_stream<S: CallSource>(
    reader: &mut VcfReader,
    writer: &mut VcfWriter,
    source: &mut S,
    ctx: &RunContext,
    progress: &Progress,
) -> Result<()> {
    while let Some(line) = reader.next_line()? {
        match line {
            VcfLine::Record(mut record) => {
                progress.record_read();
                if let Some(calls) = source.calls_for(&record)? {
                    if apply_calls(&mut record, &calls)? > 0 {
                        progress.record_changed();
                    }
                }
                ctx.trace_record("update", &record);
                writer.write_record(&record)?;
                progress.record_written();
            }
            VcfLine::Header(header) => {
                source.bind_samples(&header.samples)?;
                writer.write_header(&header)?;
            }
            meta => writer.write(&meta)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::tests::record;

    #[test]
    fn test_reindex_by_id() {
        let ext = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let vcf = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(reindex(&ext, &vcf).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_reindex_mismatch_is_l018() {
        let ext = vec!["a".to_string()];
        let vcf = vec!["a".to_string(), "b".to_string()];
        assert_eq!(reindex(&ext, &vcf).unwrap_err().code(), "L018");

        let ext = vec!["a".to_string(), "x".to_string()];
        assert_eq!(reindex(&ext, &vcf).unwrap_err().code(), "L018");
    }

    #[test]
    fn test_translate_base() {
        let alleles = ["A", "G"];
        assert_eq!(translate_base("A", &alleles), "0");
        assert_eq!(translate_base("g", &alleles), "1");
        assert_eq!(translate_base("T", &alleles), "*");
        assert_eq!(sorted_pair("1".into(), "0".into()), ("0".to_string(), "1".to_string()));
    }

    #[test]
    fn test_apply_calls_only_touches_missing() {
        let mut rec = record("chr1", 1, "A", "G", &["0/0", ".|.", "./1", "./."]);
        let calls = vec![
            Some(("1".to_string(), "1".to_string())),
            Some(("0".to_string(), "1".to_string())),
            Some(("1".to_string(), "1".to_string())),
            None,
        ];
        assert_eq!(apply_calls(&mut rec, &calls).unwrap(), 2);
        assert_eq!(rec.samples, vec!["0/0", "0|1", "1/1", "./."]);
    }
}
