//! # Model Module
//!
//! Per-record algorithms, independent of files and streams.
//!
//! - `mfg`: most-frequent-genotype imputation of one variant
//! - `collapse`: grouping and fusing of adjacent single-base records
//! - `allele_codes`: fastPHASE integer allele codes and site flags

pub mod allele_codes;
pub mod collapse;
pub mod mfg;
