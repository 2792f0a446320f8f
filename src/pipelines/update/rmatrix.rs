//! # R Dosage Matrix Update
//!
//! The matrix has a header row of sample ids (optionally preceded by a row
//! label cell) and one row per variant: `chrom-pos d_1 … d_N`. Dosages map
//! `0 → 0/0`, `1 → 0/1`, `2 → 1/1`; `NA` leaves the sample alone.
//!
//! Rows are streamed and merged with the VCF on `(chrom, pos)`, comparing
//! chrom as text and pos as an integer. Both files must be sorted that way.
//! Matrix rows absent from the VCF are skipped and VCF records absent from
//! the matrix pass through.

use std::cmp::Ordering;
use std::path::Path;

use tracing::{instrument, trace};

use super::{reindex, update_stream, CallSource, SampleCalls};
use crate::config::UpdateRmatrixArgs;
use crate::data::record::{split_variant_id, VariantRecord};
use crate::error::{PopVcfError, Result};
use crate::io::text::TextReader;
use crate::io::vcf::{VcfReader, VcfWriter};
use crate::utils::telemetry::RunContext;

/// Dosage cell meaning "no call"
pub const NOT_AVAILABLE: &str = "NA";

/// One data row of the matrix
#[derive(Clone, Debug, PartialEq, Eq)]
struct MatrixRow {
    chrom: String,
    pos: u64,
    dosages: Vec<Option<u8>>,
    line: usize,
}

impl MatrixRow {
    fn key(&self) -> (&str, u64) {
        (&self.chrom, self.pos)
    }
}

/// [`CallSource`] merging a dosage matrix with the VCF stream
pub struct RMatrixCalls {
    reader: TextReader,
    sample_ids: Vec<String>,
    order: Vec<usize>,
    pending: Option<MatrixRow>,
    last_key: Option<(String, u64)>,
    line_buf: String,
}

impl RMatrixCalls {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_text(TextReader::open(path)?)
    }

    /// Read the header and the first data row
    pub fn from_text(mut reader: TextReader) -> Result<Self> {
        let file = reader.display_name();
        let mut line_buf = String::new();
        if !reader.read_line(&mut line_buf)? {
            return Err(PopVcfError::format(&file, 0, "empty dosage matrix"));
        }
        let header: Vec<String> = line_buf.split_whitespace().map(unquote).collect();

        let mut calls = Self {
            reader,
            sample_ids: Vec::new(),
            order: Vec::new(),
            pending: None,
            last_key: None,
            line_buf,
        };

        // A row label cell shows up as one header cell more than there are dosages
        let first = calls.read_row(None)?;
        calls.sample_ids = match &first {
            Some(row) if row.dosages.len() + 1 == header.len() => header[1..].to_vec(),
            Some(row) if row.dosages.len() == header.len() => header,
            Some(row) => {
                return Err(PopVcfError::format(
                    &file,
                    row.line,
                    format!("{} dosages for {} header cells", row.dosages.len(), header.len()),
                ))
            }
            None => header,
        };
        calls.pending = first;
        Ok(calls)
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    fn read_row(&mut self, expected: Option<usize>) -> Result<Option<MatrixRow>> {
        let file = self.reader.display_name();
        loop {
            if !self.reader.read_line(&mut self.line_buf)? {
                return Ok(None);
            }
            let line = self.reader.line_num();
            let mut cells = self.line_buf.split_whitespace();
            let vid = match cells.next() {
                Some(vid) => unquote(vid),
                None => continue,
            };
            let (chrom, pos) = split_variant_id(&vid).ok_or_else(|| PopVcfError::InvalidPosition {
                file: file.clone(),
                record: line,
                token: vid.clone(),
            })?;
            let pos = pos.parse::<u64>().ok().filter(|&p| p >= 1).ok_or_else(|| PopVcfError::InvalidPosition {
                file: file.clone(),
                record: line,
                token: pos.to_string(),
            })?;
            let dosages = cells
                .map(|cell| parse_dosage(cell).ok_or_else(|| PopVcfError::parse(&file, line, cell)))
                .collect::<Result<Vec<_>>>()?;
            if let Some(n) = expected {
                if dosages.len() != n {
                    return Err(PopVcfError::format(
                        &file,
                        line,
                        format!("{} dosages, expected {}", dosages.len(), n),
                    ));
                }
            }
            let row = MatrixRow {
                chrom: chrom.to_string(),
                pos,
                dosages,
                line,
            };
            self.check_order(&row, &file)?;
            return Ok(Some(row));
        }
    }

    fn check_order(&mut self, row: &MatrixRow, file: &str) -> Result<()> {
        if let Some((chrom, pos)) = &self.last_key {
            if (chrom.as_str(), *pos) >= row.key() {
                return Err(PopVcfError::format(
                    file,
                    row.line,
                    format!("{}-{} is out of order", row.chrom, row.pos),
                ));
            }
        }
        self.last_key = Some((row.chrom.clone(), row.pos));
        Ok(())
    }
}

fn unquote(cell: &str) -> String {
    cell.trim_matches('"').to_string()
}

fn parse_dosage(cell: &str) -> Option<Option<u8>> {
    match unquote(cell).as_str() {
        NOT_AVAILABLE => Some(None),
        "0" => Some(Some(0)),
        "1" => Some(Some(1)),
        "2" => Some(Some(2)),
        _ => None,
    }
}

fn dosage_pair(dosage: u8) -> (String, String) {
    let (l, r) = match dosage {
        0 => ("0", "0"),
        1 => ("0", "1"),
        _ => ("1", "1"),
    };
    (l.to_string(), r.to_string())
}

impl CallSource for RMatrixCalls {
    fn bind_samples(&mut self, vcf_samples: &[String]) -> Result<()> {
        self.order = reindex(&self.sample_ids, vcf_samples)?;
        Ok(())
    }

    fn calls_for(&mut self, record: &VariantRecord) -> Result<Option<SampleCalls>> {
        let n = self.sample_ids.len();
        loop {
            let ordering = match &self.pending {
                None => return Ok(None),
                Some(row) => row.key().cmp(&record.sort_key()),
            };
            match ordering {
                Ordering::Less => {
                    if let Some(row) = &self.pending {
                        trace!(variant = %format!("{}-{}", row.chrom, row.pos), "matrix row not in VCF");
                    }
                    self.pending = self.read_row(Some(n))?;
                }
                Ordering::Greater => return Ok(None),
                Ordering::Equal => {
                    record.require_biallelic()?;
                    let row = self.pending.take();
                    self.pending = self.read_row(Some(n))?;
                    return Ok(row.map(|row| {
                        self.order
                            .iter()
                            .map(|&ext| row.dosages[ext].map(dosage_pair))
                            .collect()
                    }));
                }
            }
        }
    }
}

pub struct RMatrixUpdatePipeline {
    args: UpdateRmatrixArgs,
    ctx: RunContext,
}

impl RMatrixUpdatePipeline {
    pub fn new(args: UpdateRmatrixArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(vcf = ?self.args.vcf, matrix = ?self.args.matrix))]
    pub fn run(&mut self) -> Result<()> {
        let mut source = RMatrixCalls::open(&self.args.matrix)?;
        let mut reader = VcfReader::open(&self.args.vcf)?;
        let mut writer = VcfWriter::create(&self.args.out)?;
        let progress = self.ctx.progress("update-rmatrix");
        update_stream(&mut reader, &mut writer, &mut source, &self.ctx, &progress)?;
        writer.finish()?;
        progress.finish();
        Ok(())
    }
}
