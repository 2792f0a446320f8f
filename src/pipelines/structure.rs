//! # Structure Conversion
//!
//! VCF to Structure input, in the two-line layout (two rows per sample) or
//! the one-line layout (one row per sample, two columns per variant), and
//! the pivot from the first layout to the second.
//!
//! Tokens: `.` becomes the missing-data id (default `-9`), integer tokens
//! can be shifted by 100, and the imputed token is written as is in the
//! two-line layout. The one-line layout drops every variant where any sample
//! carries the imputed token.

use tracing::{debug, instrument};

use crate::config::{AlleleTransformation, PivotStructureArgs, StructureFormat, ToStructureArgs};
use crate::data::genotype::{Genotype, MISSING};
use crate::data::sample::SampleRegistry;
use crate::error::{PopVcfError, Result};
use crate::io::text::{TextReader, TextWriter};
use crate::io::vcf::{VcfLine, VcfReader};
use crate::utils::telemetry::{Progress, RunContext};

const SAMPLE_COLUMN: &str = "sample_id";
const SPECIES_COLUMN: &str = "species_id";

/// Token rewriting rules
#[derive(Clone, Debug)]
pub struct StructureOptions {
    pub format: StructureFormat,
    pub new_md_id: String,
    pub imputed_md_id: String,
    pub transformation: AlleleTransformation,
}

impl StructureOptions {
    fn translate(&self, token: &str) -> String {
        if token == MISSING {
            return self.new_md_id.clone();
        }
        if token == self.imputed_md_id {
            return token.to_string();
        }
        match (self.transformation, token.parse::<i64>()) {
            (AlleleTransformation::Add100, Ok(n)) => (n + 100).to_string(),
            _ => token.to_string(),
        }
    }
}

/// Genotypes of the whole file, variant-major
struct GenotypeMatrix {
    samples: Vec<String>,
    variant_ids: Vec<String>,
    genotypes: Vec<Vec<Genotype>>,
}

fn read_matrix(
    reader: &mut VcfReader,
    opts: &StructureOptions,
    ctx: &RunContext,
    progress: &Progress,
) -> Result<GenotypeMatrix> {
    let mut variant_ids = Vec::new();
    let mut genotypes = Vec::new();

    while let Some(line) = reader.next_line()? {
        if let VcfLine::Record(record) = line {
            progress.record_read();
            ctx.trace_record("to-structure", &record);
            let gts = record.genotypes()?;
            if opts.format == StructureFormat::OneLine && gts.iter().any(|gt| gt.has_token(&opts.imputed_md_id)) {
                debug!(variant = %record.variant_id(), "dropping variant with imputed calls");
                continue;
            }
            variant_ids.push(record.variant_id());
            genotypes.push(gts);
        }
    }

    Ok(GenotypeMatrix {
        samples: reader.samples().to_vec(),
        variant_ids,
        genotypes,
    })
}

/// Convert a VCF stream to Structure rows
pub fn write_structure(
    reader: &mut VcfReader,
    writer: &mut TextWriter,
    registry: &SampleRegistry,
    opts: &StructureOptions,
    ctx: &RunContext,
    progress: &Progress,
) -> Result<()> {
    let matrix = read_matrix(reader, opts, ctx, progress)?;
    registry.check_samples(&matrix.samples)?;

    let mut header = vec![SAMPLE_COLUMN.to_string(), SPECIES_COLUMN.to_string()];
    for vid in &matrix.variant_ids {
        header.push(vid.clone());
        if opts.format == StructureFormat::OneLine {
            header.push(vid.clone());
        }
    }
    writer.write_line(&header.join("\t"))?;

    for (s, sample_id) in matrix.samples.iter().enumerate() {
        let code = registry.get(sample_id)?.species.code().to_string();
        let prefix = [sample_id.clone(), code];
        match opts.format {
            StructureFormat::TwoLine => {
                let mut left: Vec<String> = prefix.to_vec();
                let mut right: Vec<String> = prefix.to_vec();
                for gts in &matrix.genotypes {
                    left.push(opts.translate(&gts[s].left));
                    right.push(opts.translate(&gts[s].right));
                }
                writer.write_line(&left.join("\t"))?;
                writer.write_line(&right.join("\t"))?;
            }
            StructureFormat::OneLine => {
                let mut row: Vec<String> = prefix.to_vec();
                for gts in &matrix.genotypes {
                    row.push(opts.translate(&gts[s].left));
                    row.push(opts.translate(&gts[s].right));
                }
                writer.write_line(&row.join("\t"))?;
            }
        }
        progress.record_written();
    }
    Ok(())
}

/// Rewrite a two-line Structure file in the one-line layout
pub fn pivot_structure(reader: &mut TextReader, writer: &mut TextWriter) -> Result<()> {
    let file = reader.display_name();
    let mut line = String::new();
    if !reader.read_line(&mut line)? {
        return Err(PopVcfError::format(&file, 0, "empty Structure file"));
    }
    let header: Vec<String> = line.split('\t').map(|s| s.to_string()).collect();
    if header.len() < 2 {
        return Err(PopVcfError::format(&file, 1, "header needs sample and species columns"));
    }
    let mut pivoted = header[..2].to_vec();
    for vid in &header[2..] {
        pivoted.push(vid.clone());
        pivoted.push(vid.clone());
    }
    writer.write_line(&pivoted.join("\t"))?;

    let mut first: Option<(Vec<String>, usize)> = None;
    while reader.read_line(&mut line)? {
        if line.is_empty() {
            continue;
        }
        let row_num = reader.line_num();
        let cells: Vec<String> = line.split('\t').map(|s| s.to_string()).collect();
        if cells.len() != header.len() {
            return Err(PopVcfError::format(
                &file,
                row_num,
                format!("{} columns, header has {}", cells.len(), header.len()),
            ));
        }
        match first.take() {
            None => first = Some((cells, row_num)),
            Some((left, _)) => {
                if left[0] != cells[0] || left[1] != cells[1] {
                    return Err(PopVcfError::format(
                        &file,
                        row_num,
                        format!("rows of {} and {} are not a pair", left[0], cells[0]),
                    ));
                }
                let mut row = left[..2].to_vec();
                for (l, r) in left[2..].iter().zip(&cells[2..]) {
                    row.push(l.clone());
                    row.push(r.clone());
                }
                writer.write_line(&row.join("\t"))?;
            }
        }
    }

    if let Some((left, row_num)) = first {
        return Err(PopVcfError::format(&file, row_num, format!("sample {} has a single row", left[0])));
    }
    Ok(())
}

pub struct StructurePipeline {
    args: ToStructureArgs,
    ctx: RunContext,
}

impl StructurePipeline {
    pub fn new(args: ToStructureArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(vcf = ?self.args.vcf, format = ?self.args.format))]
    pub fn run(&mut self) -> Result<()> {
        let species = self.args.species.species_ids()?;
        let registry = SampleRegistry::load(&self.args.species.samples, &species)?;
        let opts = StructureOptions {
            format: self.args.format,
            new_md_id: self.args.new_md_id.clone(),
            imputed_md_id: self.args.imd_id.clone(),
            transformation: self.args.transformation,
        };

        let mut reader = VcfReader::open(&self.args.vcf)?;
        let mut writer = TextWriter::create(&self.args.out)?;
        let progress = self.ctx.progress("to-structure");
        write_structure(&mut reader, &mut writer, &registry, &opts, &self.ctx, &progress)?;
        writer.finish()?;
        progress.finish();
        Ok(())
    }
}

pub struct PivotStructurePipeline {
    args: PivotStructureArgs,
}

impl PivotStructurePipeline {
    pub fn new(args: PivotStructureArgs) -> Self {
        Self { args }
    }

    #[instrument(skip_all, fields(input = ?self.args.input))]
    pub fn run(&mut self) -> Result<()> {
        let mut reader = TextReader::open(&self.args.input)?;
        let mut writer = TextWriter::create(&self.args.out)?;
        pivot_structure(&mut reader, &mut writer)?;
        writer.finish()
    }
}
