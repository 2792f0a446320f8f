//! # fastPHASE Input Writer
//!
//! One input file per sequence, `{dir}/{seq_id}.fastphase.inp`:
//!
//! ```text
//! N
//! M
//! P pos_1 … pos_M
//! S…M…           (one flag per variant)
//! # sample_id
//! codes of the first haplotype
//! codes of the second haplotype
//! ```
//!
//! Codes index `[A, T, C, G, extras]` from 1 and are separated by spaces.
//! A missing or imputed allele is `?` at `S` sites and `-1` at `M` sites.
//! Records of one sequence must be contiguous in the VCF.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::config::ToFastphaseArgs;
use crate::data::genotype::{allele_for_token, MISSING};
use crate::data::record::VariantRecord;
use crate::error::{PopVcfError, Result};
use crate::io::text::TextWriter;
use crate::io::vcf::{VcfLine, VcfReader};
use crate::model::allele_codes::{AlleleCodes, SiteFlag};
use crate::utils::telemetry::{Progress, RunContext};

/// Input file name suffix
pub const INPUT_SUFFIX: &str = ".fastphase.inp";

/// Path of the input file for one sequence
pub fn input_path(dir: &Path, seq_id: &str) -> PathBuf {
    dir.join(format!("{}{}", seq_id, INPUT_SUFFIX))
}

/// Variants of the sequence being read
struct SequenceBuffer {
    seq_id: String,
    positions: Vec<u64>,
    flags: Vec<SiteFlag>,
    /// `[sample][haplotype]` code rows
    haplotypes: Vec<[Vec<String>; 2]>,
}

impl SequenceBuffer {
    fn new(seq_id: &str, n_samples: usize) -> Self {
        Self {
            seq_id: seq_id.to_string(),
            positions: Vec::new(),
            flags: Vec::new(),
            haplotypes: vec![[Vec::new(), Vec::new()]; n_samples],
        }
    }

    fn push(&mut self, record: &VariantRecord, imputed_md_id: &str, file: &str, line: usize) -> Result<()> {
        let alleles = record.alleles();
        let codes = AlleleCodes::for_alleles(&alleles);
        let flag = SiteFlag::for_alleles(alleles.len());

        let encode = |token: &str| -> Result<String> {
            if token == MISSING || token == imputed_md_id {
                return Ok(flag.missing_code().to_string());
            }
            allele_for_token(token, &alleles)
                .and_then(|allele| codes.code_of(allele))
                .map(|code| code.to_string())
                .ok_or_else(|| {
                    PopVcfError::format(
                        file,
                        line,
                        format!("allele {:?} of {} is not an allele index", token, record.variant_id()),
                    )
                })
        };

        for (s, gt) in record.genotypes()?.iter().enumerate() {
            let left = encode(gt.left.as_str())?;
            let right = encode(gt.right.as_str())?;
            self.haplotypes[s][0].push(left);
            self.haplotypes[s][1].push(right);
        }
        self.positions.push(record.pos);
        self.flags.push(flag);
        Ok(())
    }

    fn write(&self, dir: &Path, samples: &[String]) -> Result<()> {
        let path = input_path(dir, &self.seq_id);
        debug!(seq_id = %self.seq_id, n_variants = self.positions.len(), path = ?path, "writing fastPHASE input");
        let mut writer = TextWriter::create(&path)?;
        writer.write_line(&samples.len().to_string())?;
        writer.write_line(&self.positions.len().to_string())?;
        let positions: Vec<String> = self.positions.iter().map(|p| p.to_string()).collect();
        writer.write_line(&format!("P {}", positions.join(" ")))?;
        let flags: String = self.flags.iter().map(|f| f.as_char()).collect();
        writer.write_line(&flags)?;
        for (sample, haps) in samples.iter().zip(&self.haplotypes) {
            writer.write_line(&format!("# {}", sample))?;
            writer.write_line(&haps[0].join(" "))?;
            writer.write_line(&haps[1].join(" "))?;
        }
        writer.finish()
    }
}

/// Split a VCF stream into per-sequence fastPHASE inputs; returns the
/// sequence ids written, in order
pub fn write_fastphase_inputs(
    reader: &mut VcfReader,
    dir: &Path,
    imputed_md_id: &str,
    ctx: &RunContext,
    progress: &Progress,
) -> Result<Vec<String>> {
    let mut written: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current: Option<SequenceBuffer> = None;

    while let Some(line) = reader.next_line()? {
        let record = match line {
            VcfLine::Record(record) => record,
            _ => continue,
        };
        progress.record_read();
        ctx.trace_record("to-fastphase", &record);

        let same_sequence = current.as_ref().map(|c| c.seq_id == record.chrom).unwrap_or(false);
        if !same_sequence {
            if let Some(done) = current.take() {
                done.write(dir, reader.samples())?;
                progress.record_written();
                written.push(done.seq_id);
            }
            if !seen.insert(record.chrom.clone()) {
                return Err(PopVcfError::format(
                    reader.display_name(),
                    reader.record_num(),
                    format!("sequence {} appears again after another sequence", record.chrom),
                ));
            }
            current = Some(SequenceBuffer::new(&record.chrom, reader.samples().len()));
        }

        if let Some(buffer) = current.as_mut() {
            buffer.push(&record, imputed_md_id, &reader.display_name(), reader.record_num())?;
        }
    }

    if let Some(done) = current.take() {
        done.write(dir, reader.samples())?;
        progress.record_written();
        written.push(done.seq_id);
    }
    Ok(written)
}

pub struct FastphasePipeline {
    args: ToFastphaseArgs,
    ctx: RunContext,
}

impl FastphasePipeline {
    pub fn new(args: ToFastphaseArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(vcf = ?self.args.vcf, out_dir = ?self.args.out_dir))]
    pub fn run(&mut self) -> Result<()> {
        let mut reader = VcfReader::open(&self.args.vcf)?;
        let progress = self.ctx.progress("to-fastphase");
        write_fastphase_inputs(&mut reader, &self.args.out_dir, &self.args.imd_id, &self.ctx, &progress)?;
        progress.finish();
        Ok(())
    }
}
