//! # I/O Module
//!
//! File reading/writing boundaries: plain/gzip text streams, VCF and FASTA.

pub mod fasta;
pub mod text;
pub mod vcf;

pub use text::{TextReader, TextWriter};
pub use vcf::{VcfHeader, VcfLine, VcfReader, VcfWriter};
