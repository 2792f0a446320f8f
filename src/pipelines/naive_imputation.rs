//! # Naive Imputation Pipeline
//!
//! Streams a VCF through the most-frequent-genotype kernel on a rayon pool.
//!
//! The main thread reads variants into batches of `threads × 64`, the pool
//! maps each batch with an indexed parallel iterator (results come back in
//! input order) and the main thread writes them out. Metadata and header
//! lines flush the pending batch first, so output order never depends on the
//! thread count.

use rayon::prelude::*;
use tracing::{info, info_span, instrument};

use crate::config::ImputeNaiveArgs;
use crate::data::record::VariantRecord;
use crate::error::Result;
use crate::io::text::TextWriter;
use crate::io::vcf::{VcfLine, VcfReader, VcfWriter};
use crate::model::mfg::{impute_variant, SIDECAR_HEADER};
use crate::utils::telemetry::{Progress, RunContext};
use crate::utils::threading::{build_thread_pool, effective_threads};

/// Variants per worker in one batch
pub const RECORDS_PER_WORKER: usize = 64;

pub struct NaiveImputationPipeline {
    args: ImputeNaiveArgs,
    ctx: RunContext,
}

impl NaiveImputationPipeline {
    pub fn new(args: ImputeNaiveArgs, ctx: RunContext) -> Self {
        Self { args, ctx }
    }

    #[instrument(skip_all, fields(vcf = ?self.args.vcf, threads = self.args.threads))]
    pub fn run(&mut self) -> Result<()> {
        let n_threads = effective_threads(self.args.threads);
        info!(n_threads, "starting naive imputation");

        let mut reader = VcfReader::open(&self.args.vcf)?;
        let mut writer = VcfWriter::create(&self.args.out)?;
        let mut sidecar = TextWriter::create(&self.args.sidecar)?;
        let pool = build_thread_pool(n_threads)?;
        let progress = self.ctx.progress("impute-naive");

        let imputer = BatchImputer {
            pool: &pool,
            batch_size: n_threads * RECORDS_PER_WORKER,
            imputed_md_id: &self.args.imd_id,
            ctx: &self.ctx,
            progress: &progress,
        };
        imputer.run(&mut reader, &mut writer, &mut sidecar)?;

        writer.finish()?;
        sidecar.finish()?;
        progress.finish();
        Ok(())
    }
}

/// Batch loop shared by the pipeline and its tests
pub struct BatchImputer<'a> {
    pub pool: &'a rayon::ThreadPool,
    pub batch_size: usize,
    pub imputed_md_id: &'a str,
    pub ctx: &'a RunContext,
    pub progress: &'a Progress,
}

impl BatchImputer<'_> {
    pub fn run(&self, reader: &mut VcfReader, writer: &mut VcfWriter, sidecar: &mut TextWriter) -> Result<()> {
        sidecar.write_line(SIDECAR_HEADER)?;
        let mut batch: Vec<VariantRecord> = Vec::with_capacity(self.batch_size);

        while let Some(line) = reader.next_line()? {
            match line {
                VcfLine::Record(record) => {
                    self.progress.record_read();
                    batch.push(record);
                    if batch.len() >= self.batch_size {
                        self.flush(&mut batch, writer, sidecar)?;
                    }
                }
                other => {
                    self.flush(&mut batch, writer, sidecar)?;
                    writer.write(&other)?;
                }
            }
        }
        self.flush(&mut batch, writer, sidecar)
    }

    fn flush(&self, batch: &mut Vec<VariantRecord>, writer: &mut VcfWriter, sidecar: &mut TextWriter) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let records = std::mem::take(batch);
        let imd = self.imputed_md_id;
        let results = info_span!("impute_batch", n = records.len()).in_scope(|| {
            self.pool.install(|| {
                records
                    .into_par_iter()
                    .map(|record| impute_variant(record, imd))
                    .collect::<Result<Vec<_>>>()
            })
        })?;

        for (record, entry) in results {
            self.ctx.trace_record("impute-naive", &record);
            writer.write_record(&record)?;
            self.progress.record_written();
            if let Some(entry) = entry {
                sidecar.write_line(&entry.to_line())?;
                self.progress.record_changed();
            }
        }
        Ok(())
    }
}
