//! # Sequence-ID Extraction
//!
//! Keeps the records of a VCF or FASTA file whose sequence id is listed in
//! an id file (one id, or one regular expression, per line).
//!
//! - FASTA: the id is the header text up to the first whitespace; kept
//!   records are copied verbatim.
//! - VCF: records are matched on CHROM and `##contig=<ID=…>` lines on their
//!   ID; all other metadata and the header pass through.

use std::collections::HashSet;
use std::path::Path;

use regex::RegexSet;
use tracing::{debug, instrument};

use crate::config::{ExtractIdsArgs, SourceKind};
use crate::error::{PopVcfError, Result};
use crate::io::fasta::FastaReader;
use crate::io::text::{TextReader, TextWriter};
use crate::io::vcf::{VcfLine, VcfReader, VcfWriter};
use crate::utils::telemetry::{Progress, RunContext};

const FASTA_EXTENSIONS: [&str; 4] = ["fasta", "fa", "fna", "fas"];
const CONTIG_PREFIX: &str = "##contig=<ID=";

/// Which ids to keep
#[derive(Debug)]
pub enum IdMatcher {
    Literal(HashSet<String>),
    Patterns(RegexSet),
}

impl IdMatcher {
    /// Read the id file; blank lines are ignored
    pub fn load(path: &Path, regex: bool) -> Result<Self> {
        let mut reader = TextReader::open(path)?;
        let mut ids = Vec::new();
        let mut line = String::new();
        while reader.read_line(&mut line)? {
            let id = line.trim();
            if !id.is_empty() {
                ids.push(id.to_string());
            }
        }
        debug!(n_ids = ids.len(), regex, "id list loaded");
        Self::from_ids(ids, regex)
    }

    pub fn from_ids(ids: Vec<String>, regex: bool) -> Result<Self> {
        if regex {
            RegexSet::new(&ids)
                .map(IdMatcher::Patterns)
                .map_err(|e| PopVcfError::config(format!("invalid id pattern: {}", e)))
        } else {
            Ok(IdMatcher::Literal(ids.into_iter().collect()))
        }
    }

    pub fn matches(&self, id: &str) -> bool {
        match self {
            IdMatcher::Literal(ids) => ids.contains(id),
            IdMatcher::Patterns(set) => set.is_match(id),
        }
    }
}

/// FASTA for `.fasta/.fa/.fna/.fas` (optionally gzipped), VCF otherwise
pub fn detect_kind(path: &Path) -> SourceKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let is_fasta = name
        .rsplit_once('.')
        .map(|(_, ext)| FASTA_EXTENSIONS.contains(&ext))
        .unwrap_or(false);
    if is_fasta {
        SourceKind::Fasta
    } else {
        SourceKind::Vcf
    }
}

/// Sequence id of a `##contig=<ID=…>` line
fn contig_id(meta: &str) -> Option<&str> {
    let rest = meta.strip_prefix(CONTIG_PREFIX)?;
    let end = rest.find([',', '>']).unwrap_or(rest.len());
    Some(&rest[..end])
}

pub fn extract_vcf(
    reader: &mut VcfReader,
    writer: &mut VcfWriter,
    matcher: &IdMatcher,
    ctx: &RunContext,
    progress: &Progress,
) -> Result<()> {
    while let Some(line) = reader.next_line()? {
        match &line {
            VcfLine::Meta(meta) => {
                if contig_id(meta).map_or(true, |id| matcher.matches(id)) {
                    writer.write(&line)?;
                }
            }
            VcfLine::Header(_) => writer.write(&line)?,
            VcfLine::Record(record) => {
                progress.record_read();
                if matcher.matches(&record.chrom) {
                    ctx.trace_record("extract-ids", record);
                    writer.write(&line)?;
                    progress.record_written();
                }
            }
        }
    }
    Ok(())
}

pub fn extract_fasta(
    reader: &mut FastaReader,
    writer: &mut TextWriter,
    matcher: &IdMatcher,
    ctx: &RunContext,
    progress: &Progress,
) -> Result<()> {
    while let Some(record) = reader.next_record()? {
        progress.record_read();
        if !matcher.matches(record.id()) {
            continue;
        }
        if ctx.traces_sequence(record.id()) {
            tracing::trace!(id = record.id(), n_lines = record.sequence_lines.len(), "keeping sequence");
        }
        writer.write_line(&record.header)?;
        for line in &record.sequence_lines {
            writer.write_line(line)?;
        }
        progress.record_written();
    }
    Ok(())
}

pub struct ExtractPipeline {
    args: ExtractIdsArgs,
    ctx: RunContext,
}

impl ExtractPipeline {
    pub fn new(args: ExtractIdsArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(input = ?self.args.input))]
    pub fn run(&mut self) -> Result<()> {
        let matcher = IdMatcher::load(&self.args.ids, self.args.regex)?;
        let kind = self.args.kind.unwrap_or_else(|| detect_kind(&self.args.input));
        let progress = self.ctx.progress("extract-ids");
        match kind {
            SourceKind::Vcf => {
                let mut reader = VcfReader::open(&self.args.input)?;
                let mut writer = VcfWriter::create(&self.args.out)?;
                extract_vcf(&mut reader, &mut writer, &matcher, &self.ctx, &progress)?;
                writer.finish()?;
            }
            SourceKind::Fasta => {
                let mut reader = FastaReader::open(&self.args.input)?;
                let mut writer = TextWriter::create(&self.args.out)?;
                extract_fasta(&mut reader, &mut writer, &matcher, &self.ctx, &progress)?;
                writer.finish()?;
            }
        }
        progress.finish();
        Ok(())
    }
}
