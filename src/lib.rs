//! # popvcf Library
//!
//! Small population-genetics toolbox around VCF files: naive imputation,
//! merging of external phaser/imputer output, collapsing of adjacent
//! single-base records, conversion to STRUCTURE, fastPHASE and tabular
//! layouts, and sequence-id extraction.
//!
//! ## Modules
//! - `config`: CLI argument parsing and validation
//! - `data`: Variant records, genotypes and the sample registry
//! - `error`: Error types, error codes and result alias
//! - `io`: Plain/gzip text streams, VCF and FASTA
//! - `model`: Per-record algorithms (MFG imputation, collapsing, allele codes)
//! - `pipelines`: One streaming pipeline per tool
//! - `utils`: Thread pool and run telemetry

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod pipelines;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use data::{Genotype, SampleRegistry, VariantRecord};
pub use error::{PopVcfError, Result};
pub use io::vcf::{VcfReader, VcfWriter};
pub use utils::RunContext;
