//! # Configuration Logic
//!
//! ## Role
//! CLI argument parsing and validation. One subcommand per tool, each with
//! its own `Args` struct; trace and verbose switches are global.
//!
//! ## Validation
//! - `--tvi` and `--tsi` cannot both name ids
//! - species identifiers must be pairwise distinct
//! - the imputed token cannot be `.` or empty
//! - `--threads 0` means all cores; larger values are capped at the core count
//!
//! Every validation failure is a `P001` argument error.
//!
//! ## Example CLI
//! ```bash
//! popvcf --verbose Y impute-naive --vcf in.vcf.gz --out out.vcf.gz --sidecar imputed.csv --threads 8
//! popvcf to-structure --vcf in.vcf --samples samples.csv --sp1 AL --sp2 AP --format 2 --out out.str
//! ```

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::data::genotype::{DEFAULT_IMPUTED_MD_ID, MISSING};
use crate::data::sample::{SpeciesIds, NONE};
use crate::error::{PopVcfError, Result};
use crate::utils::telemetry::{RunContext, Watchlist};
use crate::utils::threading::effective_threads;

/// Y/N switch as written on the command line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum YesNo {
    #[value(name = "Y", alias = "y")]
    Yes,
    #[default]
    #[value(name = "N", alias = "n")]
    No,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        self == YesNo::Yes
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "popvcf", version, about = "VCF toolkit for population genetics")]
pub struct Config {
    /// Show progress counters on stderr
    #[arg(long, value_enum, default_value = "N", global = true)]
    pub verbose: YesNo,

    /// Dump per-record details for watched records
    #[arg(long, value_enum, default_value = "N", global = true)]
    pub trace: YesNo,

    /// Variant ids (`chrom-pos`, comma separated) to trace, or NONE
    #[arg(long, default_value = NONE, global = true)]
    pub tvi: String,

    /// Sequence ids (comma separated) to trace, or NONE
    #[arg(long, default_value = NONE, global = true)]
    pub tsi: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Impute missing genotypes with the most frequent genotype of each variant
    ImputeNaive(ImputeNaiveArgs),
    /// Fill missing genotypes from fastPHASE results
    UpdateFastphase(UpdateFastphaseArgs),
    /// Fill missing genotypes from MACH haplotypes
    UpdateMach(UpdateMachArgs),
    /// Fill missing genotypes from an R dosage matrix
    UpdateRmatrix(UpdateRmatrixArgs),
    /// Collapse adjacent single-base records into indels
    Collapse(CollapseArgs),
    /// Convert a VCF to Structure input
    ToStructure(ToStructureArgs),
    /// Convert a two-line Structure file to the one-line layout
    PivotStructure(PivotStructureArgs),
    /// Write one fastPHASE input file per sequence
    ToFastphase(ToFastphaseArgs),
    /// Convert a VCF to a sample-by-variant table of bases
    ToTabular(ToTabularArgs),
    /// Convert a table of bases back to a VCF
    FromTabular(FromTabularArgs),
    /// Keep only the sequences named in an id file
    ExtractIds(ExtractIdsArgs),
}

/// Sample file and the species identifiers it uses
#[derive(Args, Debug, Clone)]
pub struct SpeciesArgs {
    /// Sample file (`sample_id;species_id;mother_id`)
    #[arg(long)]
    pub samples: PathBuf,

    /// Identifier of the first species
    #[arg(long)]
    pub sp1: String,

    /// Identifier of the second species
    #[arg(long)]
    pub sp2: String,

    /// Identifier of the hybrids, or NONE
    #[arg(long, default_value = NONE)]
    pub hybrid: String,
}

impl SpeciesArgs {
    pub fn species_ids(&self) -> Result<SpeciesIds> {
        SpeciesIds::new(&self.sp1, &self.sp2, &self.hybrid)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ImputeNaiveArgs {
    #[arg(long)]
    pub vcf: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    /// Where to record the imputed variants
    #[arg(long)]
    pub sidecar: PathBuf,

    /// Worker threads (0 = all cores)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Token marking previously imputed calls
    #[arg(long = "imd-id", default_value = DEFAULT_IMPUTED_MD_ID)]
    pub imd_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateFastphaseArgs {
    #[arg(long)]
    pub vcf: PathBuf,

    /// Directory holding one fastPHASE result per sequence
    #[arg(long = "fastphase-dir")]
    pub fastphase_dir: PathBuf,

    /// Result file name after the sequence id
    #[arg(long, default_value = "_hapguess_switch.out")]
    pub suffix: String,

    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateMachArgs {
    #[arg(long)]
    pub vcf: PathBuf,

    /// MACH haplotype file
    #[arg(long)]
    pub haps: PathBuf,

    /// Marker listing, one variant id per line
    #[arg(long)]
    pub listing: PathBuf,

    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateRmatrixArgs {
    #[arg(long)]
    pub vcf: PathBuf,

    /// Dosage matrix: header of sample ids, one row per variant id
    #[arg(long)]
    pub matrix: PathBuf,

    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct CollapseArgs {
    #[arg(long)]
    pub vcf: PathBuf,

    #[command(flatten)]
    pub species: SpeciesArgs,

    #[arg(long = "imd-id", default_value = DEFAULT_IMPUTED_MD_ID)]
    pub imd_id: String,

    #[arg(long)]
    pub out: PathBuf,

    /// Per-group statistics file
    #[arg(long)]
    pub stats: PathBuf,
}

/// Structure row layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StructureFormat {
    /// Two rows per sample
    #[value(name = "1")]
    TwoLine,
    /// One row per sample, two columns per variant
    #[value(name = "2")]
    OneLine,
}

/// Optional rewrite of integer allele tokens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum AlleleTransformation {
    #[default]
    None,
    /// Add 100 to every integer token
    #[value(name = "add100")]
    Add100,
}

#[derive(Args, Debug, Clone)]
pub struct ToStructureArgs {
    #[arg(long)]
    pub vcf: PathBuf,

    #[command(flatten)]
    pub species: SpeciesArgs,

    #[arg(long, value_enum, default_value = "1")]
    pub format: StructureFormat,

    /// Token written for missing alleles
    #[arg(long = "new-md-id", default_value = "-9", allow_hyphen_values = true)]
    pub new_md_id: String,

    #[arg(long = "imd-id", default_value = DEFAULT_IMPUTED_MD_ID)]
    pub imd_id: String,

    #[arg(long, value_enum, default_value = "none")]
    pub transformation: AlleleTransformation,

    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct PivotStructureArgs {
    /// Two-line Structure file
    #[arg(long = "in")]
    pub input: PathBuf,

    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ToFastphaseArgs {
    #[arg(long)]
    pub vcf: PathBuf,

    /// Directory receiving `{seq_id}.fastphase.inp` files
    #[arg(long = "out-dir")]
    pub out_dir: PathBuf,

    #[arg(long = "imd-id", default_value = DEFAULT_IMPUTED_MD_ID)]
    pub imd_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct ToTabularArgs {
    #[arg(long)]
    pub vcf: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    /// Text written for missing or imputed alleles
    #[arg(long, default_value = "-", allow_hyphen_values = true)]
    pub md: String,

    #[arg(long = "imd-id", default_value = DEFAULT_IMPUTED_MD_ID)]
    pub imd_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct FromTabularArgs {
    #[arg(long = "in")]
    pub input: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    /// Text that marks a missing allele in the table
    #[arg(long, default_value = "-", allow_hyphen_values = true)]
    pub md: String,
}

/// Kind of file handled by the id extractor
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Vcf,
    Fasta,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractIdsArgs {
    #[arg(long = "in")]
    pub input: PathBuf,

    /// One id (or pattern) per line
    #[arg(long)]
    pub ids: PathBuf,

    /// Treat every line of the id file as a regular expression
    #[arg(long)]
    pub regex: bool,

    /// Override the kind guessed from the file extension
    #[arg(long, value_enum)]
    pub kind: Option<SourceKind>,

    #[arg(long)]
    pub out: PathBuf,
}

impl Config {
    /// Parse command line arguments and validate them
    pub fn parse_and_validate() -> Result<Self> {
        Self::parse_from_args(std::env::args_os())
    }

    /// Parse from an explicit argument list (first item is the program name)
    pub fn parse_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = match Self::try_parse_from(args) {
            Ok(config) => config,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
            Err(e) => return Err(PopVcfError::config(e.to_string().trim_end())),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tvi != NONE && self.tsi != NONE {
            return Err(PopVcfError::config("--tvi and --tsi cannot be used together"));
        }

        let imd_id = match &self.command {
            Command::ImputeNaive(a) => Some(&a.imd_id),
            Command::Collapse(a) => Some(&a.imd_id),
            Command::ToStructure(a) => Some(&a.imd_id),
            Command::ToFastphase(a) => Some(&a.imd_id),
            Command::ToTabular(a) => Some(&a.imd_id),
            _ => None,
        };
        if let Some(imd_id) = imd_id {
            if imd_id.is_empty() || imd_id == MISSING {
                return Err(PopVcfError::config(format!(
                    "invalid imputed missing-data token {:?}",
                    imd_id
                )));
            }
            check_latin1("--imd-id", imd_id)?;
        }

        // tokens copied into output files must survive the Latin-1 writer
        match &self.command {
            Command::ToStructure(a) => check_latin1("--new-md-id", &a.new_md_id)?,
            Command::ToTabular(a) => check_latin1("--md", &a.md)?,
            Command::FromTabular(a) => check_latin1("--md", &a.md)?,
            _ => {}
        }

        match &self.command {
            Command::Collapse(a) => a.species.species_ids().map(|_| ()),
            Command::ToStructure(a) => a.species.species_ids().map(|_| ()),
            Command::FromTabular(a) if a.md.is_empty() => {
                Err(PopVcfError::config("--md cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Verbose/trace switches and the watchlist for this run
    pub fn run_context(&self) -> RunContext {
        RunContext::new(
            self.verbose.is_yes(),
            self.trace.is_yes(),
            Watchlist::from_args(Some(&self.tsi), Some(&self.tvi)),
        )
    }

    /// Worker count of the naive imputer, capped at the core count
    pub fn threads(&self) -> usize {
        match &self.command {
            Command::ImputeNaive(a) => effective_threads(a.threads),
            _ => 1,
        }
    }
}

fn check_latin1(option: &str, value: &str) -> Result<()> {
    match value.chars().find(|&c| u32::from(c) > 0xFF) {
        Some(c) => Err(PopVcfError::config(format!(
            "{} {:?}: character {:?} cannot be written as Latin-1",
            option, value, c
        ))),
        None => Ok(()),
    }
}
