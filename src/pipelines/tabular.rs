//! # Tabular Conversion
//!
//! A tab-separated sample-by-variant table of allele bases:
//!
//! ```text
//! ID/SNP  chr1-10  chr1-10  chr1-20  chr1-20
//! s1      A        G        C        C
//! ```
//!
//! Each variant takes two columns (left and right allele). Missing and
//! imputed alleles are written with a user-chosen string. Converting back
//! rebuilds biallelic records: REF is the most frequent base (first seen on
//! ties), ALT the other one or `.`.

use tracing::{debug, instrument};

use crate::config::{FromTabularArgs, ToTabularArgs};
use crate::data::genotype::{allele_for_token, MISSING};
use crate::data::record::{split_variant_id, VariantRecord};
use crate::error::{PopVcfError, Result};
use crate::io::text::{TextReader, TextWriter};
use crate::io::vcf::{VcfHeader, VcfLine, VcfReader, VcfWriter};
use crate::utils::telemetry::{Progress, RunContext};

/// First header cell
pub const ID_COLUMN: &str = "ID/SNP";

/// REF written when no sample has a base
const UNKNOWN_REF: &str = "N";

/// Write the VCF as a table of bases
pub fn write_tabular(
    reader: &mut VcfReader,
    writer: &mut TextWriter,
    md: &str,
    imputed_md_id: &str,
    ctx: &RunContext,
    progress: &Progress,
) -> Result<()> {
    let mut variant_ids: Vec<String> = Vec::new();
    // variant-major [variant][sample] = (left, right)
    let mut bases: Vec<Vec<(String, String)>> = Vec::new();

    while let Some(line) = reader.next_line()? {
        let record = match line {
            VcfLine::Record(record) => record,
            _ => continue,
        };
        progress.record_read();
        ctx.trace_record("to-tabular", &record);

        let alleles = record.alleles();
        let base = |token: &str| -> Result<String> {
            if token == MISSING || token == imputed_md_id {
                return Ok(md.to_string());
            }
            allele_for_token(token, &alleles)
                .map(|a| a.to_string())
                .ok_or_else(|| {
                    PopVcfError::format(
                        reader.display_name(),
                        reader.record_num(),
                        format!("allele {:?} of {} is not an allele index", token, record.variant_id()),
                    )
                })
        };
        let row = record
            .genotypes()?
            .iter()
            .map(|gt| Ok((base(gt.left.as_str())?, base(gt.right.as_str())?)))
            .collect::<Result<Vec<_>>>()?;
        variant_ids.push(record.variant_id());
        bases.push(row);
    }

    let mut header = vec![ID_COLUMN.to_string()];
    for vid in &variant_ids {
        header.push(vid.clone());
        header.push(vid.clone());
    }
    writer.write_line(&header.join("\t"))?;

    for (s, sample) in reader.samples().iter().enumerate() {
        let mut row = vec![sample.clone()];
        for variant in &bases {
            row.push(variant[s].0.clone());
            row.push(variant[s].1.clone());
        }
        writer.write_line(&row.join("\t"))?;
        progress.record_written();
    }
    Ok(())
}

/// Table of bases held in memory
struct Table {
    variant_ids: Vec<String>,
    samples: Vec<String>,
    /// `[sample][2 * variant + side]`
    cells: Vec<Vec<String>>,
}

fn read_table(reader: &mut TextReader) -> Result<Table> {
    let file = reader.display_name();
    let mut line = String::new();
    if !reader.read_line(&mut line)? {
        return Err(PopVcfError::format(&file, 0, "empty table"));
    }
    let header: Vec<&str> = line.split('\t').collect();
    let columns = &header[1..];
    if columns.len() % 2 != 0 {
        return Err(PopVcfError::format(&file, 1, "variant columns must come in pairs"));
    }
    let mut variant_ids = Vec::with_capacity(columns.len() / 2);
    for pair in columns.chunks(2) {
        if pair[0] != pair[1] {
            return Err(PopVcfError::format(
                &file,
                1,
                format!("paired columns {} and {} differ", pair[0], pair[1]),
            ));
        }
        variant_ids.push(pair[0].to_string());
    }
    let width = header.len();

    let mut samples = Vec::new();
    let mut cells = Vec::new();
    while reader.read_line(&mut line)? {
        if line.is_empty() {
            continue;
        }
        let row: Vec<&str> = line.split('\t').collect();
        if row.len() != width {
            return Err(PopVcfError::format(
                &file,
                reader.line_num(),
                format!("{} columns, header has {}", row.len(), width),
            ));
        }
        samples.push(row[0].to_string());
        cells.push(row[1..].iter().map(|s| s.to_string()).collect());
    }
    Ok(Table {
        variant_ids,
        samples,
        cells,
    })
}

/// REF/ALT from observed bases, or `L021` with more than two
fn choose_alleles(observed: &[(String, usize)], variant_id: &str) -> Result<(String, String)> {
    match observed {
        [] => Ok((UNKNOWN_REF.to_string(), MISSING.to_string())),
        [only] => Ok((only.0.clone(), MISSING.to_string())),
        [a, b] => {
            if b.1 > a.1 {
                Ok((b.0.clone(), a.0.clone()))
            } else {
                Ok((a.0.clone(), b.0.clone()))
            }
        }
        _ => Err(PopVcfError::multiallelic(variant_id)),
    }
}

/// Rebuild a VCF from a table of bases
pub fn write_vcf_from_tabular(
    reader: &mut TextReader,
    writer: &mut VcfWriter,
    md: &str,
    ctx: &RunContext,
    progress: &Progress,
) -> Result<()> {
    let file = reader.display_name();
    let table = read_table(reader)?;
    debug!(n_samples = table.samples.len(), n_variants = table.variant_ids.len(), "table loaded");

    writer.write_meta("##fileformat=VCFv4.2")?;
    writer.write_meta("##source=popvcf from-tabular")?;
    writer.write_meta("##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">")?;
    writer.write_header(&VcfHeader::for_samples(table.samples.clone()))?;

    for (v, vid) in table.variant_ids.iter().enumerate() {
        progress.record_read();
        let (chrom, pos) = split_variant_id(vid).ok_or_else(|| PopVcfError::InvalidPosition {
            file: file.clone(),
            record: 1,
            token: vid.clone(),
        })?;
        let pos = pos.parse::<u64>().ok().filter(|&p| p >= 1).ok_or_else(|| PopVcfError::InvalidPosition {
            file: file.clone(),
            record: 1,
            token: vid.clone(),
        })?;

        // (base, count) in first-seen order: left then right, sample by sample
        let mut observed: Vec<(String, usize)> = Vec::with_capacity(2);
        for row in &table.cells {
            for base in [&row[2 * v], &row[2 * v + 1]] {
                if base == md {
                    continue;
                }
                match observed.iter_mut().find(|(b, _)| b == base) {
                    Some((_, n)) => *n += 1,
                    None => observed.push((base.clone(), 1)),
                }
            }
        }
        let (ref_allele, alt) = choose_alleles(&observed, vid)?;

        let token = |base: &str| {
            if base == md {
                MISSING
            } else if base == ref_allele {
                "0"
            } else {
                "1"
            }
        };
        let samples = table
            .cells
            .iter()
            .map(|row| format!("{}/{}", token(row[2 * v].as_str()), token(row[2 * v + 1].as_str())))
            .collect();

        let record = VariantRecord {
            chrom: chrom.to_string(),
            pos,
            id: MISSING.to_string(),
            ref_allele,
            alt,
            qual: MISSING.to_string(),
            filter: MISSING.to_string(),
            info: MISSING.to_string(),
            format: "GT".to_string(),
            samples,
        };
        ctx.trace_record("from-tabular", &record);
        writer.write_record(&record)?;
        progress.record_written();
    }
    Ok(())
}

pub struct ToTabularPipeline {
    args: ToTabularArgs,
    ctx: RunContext,
}

impl ToTabularPipeline {
    pub fn new(args: ToTabularArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(vcf = ?self.args.vcf))]
    pub fn run(&mut self) -> Result<()> {
        let mut reader = VcfReader::open(&self.args.vcf)?;
        let mut writer = TextWriter::create(&self.args.out)?;
        let progress = self.ctx.progress("to-tabular");
        write_tabular(&mut reader, &mut writer, &self.args.md, &self.args.imd_id, &self.ctx, &progress)?;
        writer.finish()?;
        progress.finish();
        Ok(())
    }
}

pub struct FromTabularPipeline {
    args: FromTabularArgs,
    ctx: RunContext,
}

impl FromTabularPipeline {
    pub fn new(args: FromTabularArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(input = ?self.args.input))]
    pub fn run(&mut self) -> Result<()> {
        let mut reader = TextReader::open(&self.args.input)?;
        let mut writer = VcfWriter::create(&self.args.out)?;
        let progress = self.ctx.progress("from-tabular");
        write_vcf_from_tabular(&mut reader, &mut writer, &self.args.md, &self.ctx, &progress)?;
        writer.finish()?;
        progress.finish();
        Ok(())
    }
}
