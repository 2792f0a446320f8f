//! # fastPHASE Update
//!
//! One fastPHASE result per sequence, `{dir}/{seq_id}{suffix}`, loaded when
//! the VCF stream enters that sequence. The genotype block sits between
//! `BEGIN GENOTYPES` and `END GENOTYPES`: a `# sample_id` line followed by
//! two rows of allele codes per sample. The i-th record of a sequence in the
//! VCF reads column i, so the records of a sequence must be contiguous.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::{reindex, sorted_pair, translate_base, update_stream, CallSource, SampleCalls};
use crate::config::UpdateFastphaseArgs;
use crate::data::record::VariantRecord;
use crate::error::{PopVcfError, Result};
use crate::io::text::TextReader;
use crate::io::vcf::{VcfReader, VcfWriter};
use crate::model::allele_codes::AlleleCodes;
use crate::utils::telemetry::RunContext;

const BEGIN_GENOTYPES: &str = "BEGIN GENOTYPES";
const END_GENOTYPES: &str = "END GENOTYPES";

/// Genotype block of one fastPHASE result file
#[derive(Clone, Debug)]
pub struct FastphaseResult {
    pub file: String,
    pub sample_ids: Vec<String>,
    /// Two code rows per sample
    pub haplotypes: Vec<[Vec<String>; 2]>,
    /// Line of each sample's `#` header, for messages
    lines: Vec<usize>,
}

impl FastphaseResult {
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(TextReader::open(path)?)
    }

    pub fn parse(mut reader: TextReader) -> Result<Self> {
        let file = reader.display_name();
        let mut line = String::new();
        let mut in_block = false;
        let mut closed = false;
        let mut sample_ids = Vec::new();
        let mut rows: Vec<Vec<Vec<String>>> = Vec::new();
        let mut lines = Vec::new();

        while reader.read_line(&mut line)? {
            let text = line.trim();
            if !in_block {
                in_block = text == BEGIN_GENOTYPES;
                continue;
            }
            if text == END_GENOTYPES {
                closed = true;
                break;
            }
            if text.is_empty() {
                continue;
            }
            if let Some(id) = text.strip_prefix('#') {
                let id = id.split_whitespace().next().unwrap_or("");
                sample_ids.push(id.to_string());
                rows.push(Vec::with_capacity(2));
                lines.push(reader.line_num());
                continue;
            }
            let sample_rows = rows.last_mut().ok_or_else(|| {
                PopVcfError::format(&file, reader.line_num(), "haplotype row before any '# sample' line")
            })?;
            if sample_rows.len() == 2 {
                return Err(PopVcfError::format(&file, reader.line_num(), "more than two haplotype rows for one sample"));
            }
            sample_rows.push(text.split_whitespace().map(|s| s.to_string()).collect());
        }

        if !in_block || !closed {
            return Err(PopVcfError::format(
                &file,
                reader.line_num(),
                "missing BEGIN GENOTYPES / END GENOTYPES block",
            ));
        }

        let mut haplotypes = Vec::with_capacity(rows.len());
        for (sample_rows, &row_line) in rows.into_iter().zip(&lines) {
            match <[Vec<String>; 2]>::try_from(sample_rows) {
                Ok(pair) => haplotypes.push(pair),
                Err(_) => {
                    return Err(PopVcfError::format(&file, row_line, "sample does not have two haplotype rows"))
                }
            }
        }

        Ok(Self {
            file,
            sample_ids,
            haplotypes,
            lines,
        })
    }
}

struct LoadedSequence {
    seq_id: String,
    result: FastphaseResult,
    /// For each VCF sample, its index in `result`
    order: Vec<usize>,
    next_column: usize,
}

/// [`CallSource`] reading one result file per sequence
pub struct FastphaseCalls {
    dir: PathBuf,
    suffix: String,
    vcf_samples: Vec<String>,
    current: Option<LoadedSequence>,
    /// Sequences already left behind, with the columns they consumed
    finished: HashMap<String, usize>,
}

impl FastphaseCalls {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
            vcf_samples: Vec::new(),
            current: None,
            finished: HashMap::new(),
        }
    }

    /// Path of the result file for a sequence
    pub fn result_path(&self, seq_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", seq_id, self.suffix))
    }

    fn enter_sequence(&mut self, seq_id: &str) -> Result<()> {
        let path = self.result_path(seq_id);
        if let Some(left) = self.current.take() {
            self.finished.insert(left.seq_id, left.next_column);
        }
        if let Some(&columns) = self.finished.get(seq_id) {
            return Err(PopVcfError::format(
                path.display().to_string(),
                columns,
                format!("sequence {} appears again after another sequence", seq_id),
            ));
        }
        debug!(seq_id, path = ?path, "loading fastPHASE result");
        let result = FastphaseResult::load(&path)?;
        let order = reindex(&result.sample_ids, &self.vcf_samples)?;
        self.current = Some(LoadedSequence {
            seq_id: seq_id.to_string(),
            result,
            order,
            next_column: 0,
        });
        Ok(())
    }
}

impl CallSource for FastphaseCalls {
    fn bind_samples(&mut self, vcf_samples: &[String]) -> Result<()> {
        self.vcf_samples = vcf_samples.to_vec();
        self.current = None;
        self.finished.clear();
        Ok(())
    }

    fn calls_for(&mut self, record: &VariantRecord) -> Result<Option<SampleCalls>> {
        let entering = self
            .current
            .as_ref()
            .map(|c| c.seq_id != record.chrom)
            .unwrap_or(true);
        if entering {
            self.enter_sequence(&record.chrom)?;
        }
        let seq = match self.current.as_mut() {
            Some(seq) => seq,
            None => return Ok(None),
        };

        let column = seq.next_column;
        seq.next_column += 1;

        let alleles = record.alleles();
        let codes = AlleleCodes::for_alleles(&alleles);
        let mut calls = Vec::with_capacity(seq.order.len());
        for &ext in &seq.order {
            let [first, second] = &seq.result.haplotypes[ext];
            let row_line = seq.result.lines[ext];
            let left = decode(first, column, &codes, &alleles, &seq.result.file, row_line)?;
            let right = decode(second, column, &codes, &alleles, &seq.result.file, row_line)?;
            calls.push(match (left, right) {
                (Some(l), Some(r)) => Some(sorted_pair(l, r)),
                _ => None,
            });
        }
        Ok(Some(calls))
    }
}

/// Allele token for one code, `None` for fastPHASE missing codes
fn decode(
    row: &[String],
    column: usize,
    codes: &AlleleCodes,
    alleles: &[&str],
    file: &str,
    line: usize,
) -> Result<Option<String>> {
    let code = row.get(column).ok_or_else(|| {
        PopVcfError::format(
            file,
            line,
            format!("{} columns, but the VCF has more variants for this sequence", row.len()),
        )
    })?;
    if code == "?" || code == "-1" {
        return Ok(None);
    }
    let code: usize = code
        .parse()
        .map_err(|_| PopVcfError::format(file, line, format!("allele code {:?} is not an integer", code)))?;
    Ok(Some(match codes.allele_of(code) {
        Some(allele) => translate_base(allele, alleles),
        None => super::UNKNOWN_ALLELE.to_string(),
    }))
}

pub struct FastphaseUpdatePipeline {
    args: UpdateFastphaseArgs,
    ctx: RunContext,
}

impl FastphaseUpdatePipeline {
    pub fn new(args: UpdateFastphaseArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(vcf = ?self.args.vcf, dir = ?self.args.fastphase_dir))]
    pub fn run(&mut self) -> Result<()> {
        let mut reader = VcfReader::open(&self.args.vcf)?;
        let mut writer = VcfWriter::create(&self.args.out)?;
        let mut source = FastphaseCalls::new(&self.args.fastphase_dir, self.args.suffix.as_str());
        let progress = self.ctx.progress("update-fastphase");
        update_stream(&mut reader, &mut writer, &mut source, &self.ctx, &progress)?;
        writer.finish()?;
        progress.finish();
        Ok(())
    }
}
