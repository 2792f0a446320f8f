//! # Indel Collapsing
//!
//! Fuses runs of single-base records at consecutive positions on one
//! sequence into a single record whose REF is the concatenation of the
//! members' REF alleles.
//!
//! A run only forms when its first record carries imputed calls on adult
//! samples. Otherwise that record is emitted on its own and grouping starts
//! again at the next record. The fused record takes every field except CHROM,
//! POS and REF from its representative: the first member whose ALT is `.`,
//! or the first member when there is none.

use crate::data::genotype::MISSING;
use crate::data::record::VariantRecord;
use crate::data::sample::SampleRegistry;
use crate::error::Result;

/// Header of the collapse statistics file
pub const STATS_HEADER: &str = "chrom;pos;record_count;collapsed_length;imputed";

/// Which VCF columns belong to adult samples
#[derive(Clone, Debug)]
pub struct AdultMask(Vec<bool>);

impl AdultMask {
    /// Resolve header samples against the registry (`L002` for unknown ids)
    pub fn from_registry<S: AsRef<str>>(registry: &SampleRegistry, samples: &[S]) -> Result<Self> {
        samples
            .iter()
            .map(|id| registry.get(id.as_ref()).map(|s| s.is_adult()))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn from_flags(flags: Vec<bool>) -> Self {
        Self(flags)
    }
}

/// Number of adult samples whose GT carries the imputed token on either side
pub fn imputed_adult_count(record: &VariantRecord, adults: &AdultMask, imputed_md_id: &str) -> Result<usize> {
    let gt_idx = record.gt_index()?;
    let mut count = 0;
    for (s, &is_adult) in adults.0.iter().enumerate().take(record.n_samples()) {
        if is_adult && record.genotype_at(s, gt_idx)?.has_token(imputed_md_id) {
            count += 1;
        }
    }
    Ok(count)
}

/// One statistics row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollapseStats {
    pub chrom: String,
    pub pos: u64,
    pub record_count: usize,
    pub collapsed_length: usize,
    pub imputed: bool,
}

impl CollapseStats {
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{};{};{}",
            self.chrom,
            self.pos,
            self.record_count,
            self.collapsed_length,
            if self.imputed { "IMPUTED" } else { "-" }
        )
    }
}

/// Output of one group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollapsedGroup {
    pub record: VariantRecord,
    pub stats: CollapseStats,
}

/// Streaming group builder; holds at most one open group
pub struct Collapser {
    adults: AdultMask,
    imputed_md_id: String,
    members: Vec<(VariantRecord, usize)>,
}

impl Collapser {
    pub fn new(adults: AdultMask, imputed_md_id: impl Into<String>) -> Self {
        Self {
            adults,
            imputed_md_id: imputed_md_id.into(),
            members: Vec::new(),
        }
    }

    /// Feed the next record; returns the groups it closed, in order
    pub fn push(&mut self, record: VariantRecord) -> Result<Vec<CollapsedGroup>> {
        let count = imputed_adult_count(&record, &self.adults, &self.imputed_md_id)?;
        let mut closed = Vec::with_capacity(2);

        let extends = self
            .members
            .last()
            .map(|(last, _)| last.chrom == record.chrom && last.pos + 1 == record.pos)
            .unwrap_or(false);
        if !extends {
            if let Some(group) = self.close() {
                closed.push(group);
            }
        }

        if self.members.is_empty() && count == 0 {
            closed.push(single(record, false));
        } else {
            self.members.push((record, count));
        }
        Ok(closed)
    }

    /// Close the open group at end of input
    pub fn finish(&mut self) -> Option<CollapsedGroup> {
        self.close()
    }

    fn close(&mut self) -> Option<CollapsedGroup> {
        if self.members.is_empty() {
            return None;
        }
        let members = std::mem::take(&mut self.members);
        Some(fuse(members))
    }
}

fn single(record: VariantRecord, imputed: bool) -> CollapsedGroup {
    let stats = CollapseStats {
        chrom: record.chrom.clone(),
        pos: record.pos,
        record_count: 1,
        collapsed_length: record.ref_allele.len(),
        imputed,
    };
    CollapsedGroup { record, stats }
}

/// `members` is never empty
fn fuse(mut members: Vec<(VariantRecord, usize)>) -> CollapsedGroup {
    let imputed = members.iter().any(|(_, count)| *count > 0);
    let record_count = members.len();
    let chrom = members[0].0.chrom.clone();
    let pos = members[0].0.pos;
    let ref_allele: String = members.iter().map(|(r, _)| r.ref_allele.as_str()).collect();

    let rep_idx = members
        .iter()
        .position(|(r, _)| r.alt == MISSING)
        .unwrap_or(0);
    let (mut record, _) = members.swap_remove(rep_idx);

    record.chrom = chrom;
    record.pos = pos;
    record.ref_allele = ref_allele;

    let stats = CollapseStats {
        chrom: record.chrom.clone(),
        pos,
        record_count,
        collapsed_length: record.ref_allele.len(),
        imputed,
    };
    CollapsedGroup { record, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::tests::record;

    fn collapse_all(records: Vec<VariantRecord>, adults: Vec<bool>) -> Vec<CollapsedGroup> {
        let mut collapser = Collapser::new(AdultMask::from_flags(adults), "99");
        let mut out = Vec::new();
        for rec in records {
            out.extend(collapser.push(rec).unwrap());
        }
        out.extend(collapser.finish());
        out
    }

    #[test]
    fn test_two_snvs_collapse() {
        let first = record("chr2", 10, "A", "C", &["99/99", "0/0"]);
        let second = record("chr2", 11, "T", ".", &["0/0", "./."]);
        let groups = collapse_all(vec![first, second.clone()], vec![true, true]);
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.record.pos, 10);
        assert_eq!(group.record.ref_allele, "AT");
        assert_eq!(group.record.alt, ".");
        assert_eq!(group.record.samples, second.samples);
        assert_eq!(group.stats.to_line(), "chr2;10;2;2;IMPUTED");
    }

    #[test]
    fn test_degenerate_first_member_regroups() {
        let a = record("chr1", 5, "A", "G", &["0/0"]);
        let b = record("chr1", 6, "C", "T", &["99/0"]);
        let c = record("chr1", 7, "G", ".", &["0/0"]);
        let groups = collapse_all(vec![a.clone(), b, c], vec![true]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].record, a);
        assert_eq!(groups[0].stats.to_line(), "chr1;5;1;1;-");
        assert_eq!(groups[1].record.pos, 6);
        assert_eq!(groups[1].record.ref_allele, "CG");
        assert_eq!(groups[1].stats.record_count, 2);
    }

    #[test]
    fn test_non_adult_imputed_calls_do_not_count() {
        let rec = record("chr1", 5, "A", "G", &["0/0", "99/99"]);
        let adults = AdultMask::from_flags(vec![true, false]);
        assert_eq!(imputed_adult_count(&rec, &adults, "99").unwrap(), 0);
        let adults = AdultMask::from_flags(vec![true, true]);
        assert_eq!(imputed_adult_count(&rec, &adults, "99").unwrap(), 1);
    }

    #[test]
    fn test_gap_and_sequence_change_close_groups() {
        let records = vec![
            record("chr1", 1, "A", "G", &["99/0"]),
            record("chr1", 2, "C", "G", &["0/0"]),
            record("chr1", 4, "G", "T", &["99/0"]),
            record("chr2", 5, "T", "A", &["99/0"]),
        ];
        let groups = collapse_all(records, vec![true]);
        let shapes: Vec<(u64, &str, usize)> = groups
            .iter()
            .map(|g| (g.record.pos, g.record.ref_allele.as_str(), g.stats.record_count))
            .collect();
        assert_eq!(shapes, vec![(1, "AC", 2), (4, "G", 1), (5, "T", 1)]);
        assert!(groups.iter().all(|g| g.stats.imputed));
    }

    #[test]
    fn test_first_missing_alt_is_representative() {
        let records = vec![
            record("chr1", 1, "A", "G", &["99/0"]),
            record("chr1", 2, "C", ".", &["0/1"]),
            record("chr1", 3, "G", ".", &["1/1"]),
        ];
        let groups = collapse_all(records, vec![true]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].record.samples, vec!["0/1"]);
        assert_eq!(groups[0].record.ref_allele, "ACG");
    }

    #[test]
    fn test_without_missing_alt_first_member_represents() {
        let records = vec![
            record("chr1", 1, "A", "G", &["99/0"]),
            record("chr1", 2, "C", "T", &["0/1"]),
        ];
        let groups = collapse_all(records, vec![true]);
        assert_eq!(groups[0].record.alt, "G");
        assert_eq!(groups[0].record.samples, vec!["99/0"]);
    }
}
