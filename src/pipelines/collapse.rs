//! # Collapse Pipeline
//!
//! Streams a VCF through the [`Collapser`] and writes one record per group
//! plus a statistics row per group.

use tracing::{info, instrument};

use crate::config::CollapseArgs;
use crate::data::sample::SampleRegistry;
use crate::error::{PopVcfError, Result};
use crate::io::text::TextWriter;
use crate::io::vcf::{VcfLine, VcfReader, VcfWriter};
use crate::model::collapse::{AdultMask, CollapsedGroup, Collapser, STATS_HEADER};
use crate::utils::telemetry::{Progress, RunContext};

pub struct CollapsePipeline {
    args: CollapseArgs,
    ctx: RunContext,
}

impl CollapsePipeline {
    pub fn new(args: CollapseArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(vcf = ?self.args.vcf))]
    pub fn run(&mut self) -> Result<()> {
        let species = self.args.species.species_ids()?;
        let registry = SampleRegistry::load(&self.args.species.samples, &species)?;
        info!(n_samples = registry.len(), "collapsing adjacent records");

        let mut reader = VcfReader::open(&self.args.vcf)?;
        let mut writer = VcfWriter::create(&self.args.out)?;
        let mut stats = TextWriter::create(&self.args.stats)?;
        let progress = self.ctx.progress("collapse");

        collapse_stream(
            &mut reader,
            &mut writer,
            &mut stats,
            &registry,
            &self.args.imd_id,
            &self.ctx,
            &progress,
        )?;

        writer.finish()?;
        stats.finish()?;
        progress.finish();
        Ok(())
    }
}

/// Collapse `reader` into `writer`, one statistics row per group into `stats`
pub fn collapse_stream(
    reader: &mut VcfReader,
    writer: &mut VcfWriter,
    stats: &mut TextWriter,
    registry: &SampleRegistry,
    imputed_md_id: &str,
    ctx: &RunContext,
    progress: &Progress,
) -> Result<()> {
    stats.write_line(STATS_HEADER)?;
    let mut collapser: Option<Collapser> = None;

    let emit = |group: CollapsedGroup, writer: &mut VcfWriter, stats: &mut TextWriter| -> Result<()> {
        ctx.trace_record("collapse", &group.record);
        writer.write_record(&group.record)?;
        stats.write_line(&group.stats.to_line())?;
        progress.record_written();
        if group.stats.record_count > 1 {
            progress.record_changed();
        }
        Ok(())
    };

    while let Some(line) = reader.next_line()? {
        match line {
            VcfLine::Header(header) => {
                registry.check_samples(&header.samples)?;
                let adults = AdultMask::from_registry(registry, &header.samples)?;
                collapser = Some(Collapser::new(adults, imputed_md_id));
                writer.write_header(&header)?;
            }
            VcfLine::Record(record) => {
                progress.record_read();
                let collapser = collapser.as_mut().ok_or_else(|| {
                    PopVcfError::format(reader.display_name(), reader.record_num(), "record before header")
                })?;
                for group in collapser.push(record)? {
                    emit(group, writer, stats)?;
                }
            }
            meta => writer.write(&meta)?,
        }
    }

    if let Some(group) = collapser.as_mut().and_then(|c| c.finish()) {
        emit(group, writer, stats)?;
    }
    Ok(())
}
