//! # popvcf: VCF Population-Genetics Toolbox
//!
//! ## Usage
//! ```bash
//! # Naive imputation on 8 workers
//! popvcf impute-naive --vcf in.vcf.gz --out imputed.vcf --sidecar imputed.csv --threads 8
//!
//! # Merge fastPHASE results back into the VCF
//! popvcf update-fastphase --vcf in.vcf --fastphase-dir fp/ --out updated.vcf
//!
//! # STRUCTURE input, one row per sample
//! popvcf to-structure --vcf in.vcf --samples samples.csv --sp1 Sp1 --sp2 Sp2 --hybrid Hyb \
//!     --format 2 --out structure.tsv
//! ```
//!
//! Progress counters are printed with `--verbose Y`; per-record dumps with
//! `--trace Y` plus `--tvi` or `--tsi`. `RUST_LOG` overrides both.

use std::time::Instant;

use tracing_subscriber::EnvFilter;

use popvcf::config::Config;
use popvcf::pipelines;
use popvcf::PopVcfError;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Diagnostics go to stderr; stdout stays free
fn init_logging(config: &Config) {
    let default_level = if config.trace.is_yes() {
        "trace"
    } else if config.verbose.is_yes() {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<(), PopVcfError> {
    let start = Instant::now();
    let config = Config::parse_and_validate()?;
    init_logging(&config);
    tracing::info!(threads = config.threads(), "popvcf v{}", env!("CARGO_PKG_VERSION"));

    pipelines::run(config)?;

    tracing::info!(elapsed_s = start.elapsed().as_secs_f64(), "completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use popvcf::{config, data, error, io, model, pipelines, utils};

    #[test]
    fn test_module_imports() {
        let _ = config::Config::parse_and_validate;
        let _ = error::PopVcfError::config("test");
        let _ = data::sample::SampleRegistry::load;
        let _ = io::vcf::VcfReader::open;
        let _ = model::mfg::impute_variant;
        let _ = utils::RunContext::quiet;
        let _ = pipelines::run;
    }
}
