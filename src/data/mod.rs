//! # Data Module
//!
//! In-memory representations: variant records, decoded genotypes and the
//! sample registry. Nothing here touches the filesystem except
//! [`SampleRegistry::load`].

pub mod genotype;
pub mod record;
pub mod sample;

// Re-export commonly used types
pub use genotype::{Genotype, Separator};
pub use record::VariantRecord;
pub use sample::{Sample, SampleRegistry, Species, SpeciesIds};
