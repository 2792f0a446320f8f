//! # MACH Update
//!
//! Haplotype file: two rows per sample, `id HAPLO1 alleles` and
//! `id HAPLO2 alleles`, where `id` may carry a `family->` prefix and
//! `alleles` is either one string of bases or one token per marker. The
//! listing file names one marker per line (`chrom-pos`), either as the first
//! token or after a one-letter record type; a leading `SNP` header is
//! skipped. MACH may reorder samples, so calls are matched by sample id.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, instrument};

use super::{reindex, sorted_pair, translate_base, update_stream, CallSource, SampleCalls};
use crate::config::UpdateMachArgs;
use crate::data::record::VariantRecord;
use crate::error::{PopVcfError, Result};
use crate::io::text::TextReader;
use crate::io::vcf::{VcfReader, VcfWriter};
use crate::utils::telemetry::RunContext;

/// Marker id to column
pub fn load_listing(mut reader: TextReader) -> Result<HashMap<String, usize>> {
    let file = reader.display_name();
    let mut columns = HashMap::new();
    let mut line = String::new();
    let mut first = true;

    while reader.read_line(&mut line)? {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if first && tokens[0] == "SNP" {
            first = false;
            continue;
        }
        first = false;
        let marker = match tokens.as_slice() {
            [kind, marker, ..] if kind.len() == 1 => *marker,
            [marker, ..] => *marker,
            [] => continue,
        };
        let column = columns.len();
        if columns.insert(marker.to_string(), column).is_some() {
            return Err(PopVcfError::format(&file, reader.line_num(), format!("marker {} listed twice", marker)));
        }
    }
    Ok(columns)
}

/// Sample ids and their two haplotypes, in file order
pub fn load_haplotypes(mut reader: TextReader) -> Result<(Vec<String>, Vec<[Vec<String>; 2]>)> {
    let file = reader.display_name();
    let mut ids: Vec<String> = Vec::new();
    let mut haps: Vec<[Vec<String>; 2]> = Vec::new();
    let mut pending: Option<(String, Vec<String>)> = None;
    let mut line = String::new();

    while reader.read_line(&mut line)? {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let id = strip_family(tokens[0]).to_string();
        let allele_tokens = match tokens.get(1) {
            Some(tag) if tag.starts_with("HAPLO") => &tokens[2..],
            _ => &tokens[1..],
        };
        let alleles: Vec<String> = match allele_tokens {
            [one] => one.chars().map(|c| c.to_string()).collect(),
            many => many.iter().map(|s| s.to_string()).collect(),
        };

        match pending.take() {
            None => pending = Some((id, alleles)),
            Some((first_id, first)) => {
                if first_id != id {
                    return Err(PopVcfError::format(
                        &file,
                        reader.line_num(),
                        format!("haplotype rows of {} and {} are not paired", first_id, id),
                    ));
                }
                ids.push(id);
                haps.push([first, alleles]);
            }
        }
    }

    if let Some((id, _)) = pending {
        return Err(PopVcfError::format(&file, reader.line_num(), format!("sample {} has a single haplotype", id)));
    }
    Ok((ids, haps))
}

fn strip_family(id: &str) -> &str {
    id.rsplit_once("->").map(|(_, id)| id).unwrap_or(id)
}

/// [`CallSource`] over MACH haplotypes
pub struct MachCalls {
    columns: HashMap<String, usize>,
    ids: Vec<String>,
    haplotypes: Vec<[Vec<String>; 2]>,
    order: Vec<usize>,
}

impl MachCalls {
    pub fn load(haps: &Path, listing: &Path) -> Result<Self> {
        let columns = load_listing(TextReader::open(listing)?)?;
        let hap_reader = TextReader::open(haps)?;
        let hap_file = hap_reader.display_name();
        let (ids, haplotypes) = load_haplotypes(hap_reader)?;
        Self::from_parts(columns, ids, haplotypes, &hap_file)
    }

    pub fn from_parts(
        columns: HashMap<String, usize>,
        ids: Vec<String>,
        haplotypes: Vec<[Vec<String>; 2]>,
        hap_file: &str,
    ) -> Result<Self> {
        for (i, pair) in haplotypes.iter().enumerate() {
            for hap in pair {
                if hap.len() != columns.len() {
                    return Err(PopVcfError::format(
                        hap_file,
                        2 * i + 1,
                        format!(
                            "haplotype of {} has {} alleles, the listing has {} markers",
                            ids[i],
                            hap.len(),
                            columns.len()
                        ),
                    ));
                }
            }
        }
        debug!(n_samples = ids.len(), n_markers = columns.len(), "MACH haplotypes loaded");
        Ok(Self {
            columns,
            ids,
            haplotypes,
            order: Vec::new(),
        })
    }
}

impl CallSource for MachCalls {
    fn bind_samples(&mut self, vcf_samples: &[String]) -> Result<()> {
        self.order = reindex(&self.ids, vcf_samples)?;
        Ok(())
    }

    fn calls_for(&mut self, record: &VariantRecord) -> Result<Option<SampleCalls>> {
        let column = match self.columns.get(&record.variant_id()) {
            Some(&column) => column,
            None => return Ok(None),
        };
        record.require_biallelic()?;
        let alleles = record.alleles();
        let calls = self
            .order
            .iter()
            .map(|&ext| {
                let [first, second] = &self.haplotypes[ext];
                Some(sorted_pair(
                    translate_base(&first[column], &alleles),
                    translate_base(&second[column], &alleles),
                ))
            })
            .collect();
        Ok(Some(calls))
    }
}

pub struct MachUpdatePipeline {
    args: UpdateMachArgs,
    ctx: RunContext,
}

impl MachUpdatePipeline {
    pub fn new(args: UpdateMachArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(vcf = ?self.args.vcf, haps = ?self.args.haps))]
    pub fn run(&mut self) -> Result<()> {
        let mut source = MachCalls::load(&self.args.haps, &self.args.listing)?;
        let mut reader = VcfReader::open(&self.args.vcf)?;
        let mut writer = VcfWriter::create(&self.args.out)?;
        let progress = self.ctx.progress("update-mach");
        update_stream(&mut reader, &mut writer, &mut source, &self.ctx, &progress)?;
        writer.finish()?;
        progress.finish();
        Ok(())
    }
}
