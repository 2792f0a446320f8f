//! # Pipeline Module
//!
//! One pipeline per command-line tool. Each owns its arguments and the run
//! context, opens its files and drives a streaming function that tests can
//! call on in-memory readers and writers.

pub mod collapse;
pub mod extract;
pub mod fastphase;
pub mod naive_imputation;
pub mod structure;
pub mod tabular;
pub mod update;

pub use collapse::CollapsePipeline;
pub use extract::ExtractPipeline;
pub use fastphase::FastphasePipeline;
pub use naive_imputation::NaiveImputationPipeline;
pub use structure::{PivotStructurePipeline, StructurePipeline};
pub use tabular::{FromTabularPipeline, ToTabularPipeline};
pub use update::{FastphaseUpdatePipeline, MachUpdatePipeline, RMatrixUpdatePipeline};

use crate::config::{Command, Config};
use crate::error::Result;

/// Run the tool selected on the command line
pub fn run(config: Config) -> Result<()> {
    let ctx = config.run_context();
    match config.command {
        Command::ImputeNaive(args) => NaiveImputationPipeline::new(args, ctx).run(),
        Command::UpdateFastphase(args) => FastphaseUpdatePipeline::new(args, ctx).run(),
        Command::UpdateMach(args) => MachUpdatePipeline::new(args, ctx).run(),
        Command::UpdateRmatrix(args) => RMatrixUpdatePipeline::new(args, ctx).run(),
        Command::Collapse(args) => CollapsePipeline::new(args, ctx).run(),
        Command::ToStructure(args) => StructurePipeline::new(args, ctx).run(),
        Command::PivotStructure(args) => PivotStructurePipeline::new(args).run(),
        Command::ToFastphase(args) => FastphasePipeline::new(args, ctx).run(),
        Command::ToTabular(args) => ToTabularPipeline::new(args, ctx).run(),
        Command::FromTabular(args) => FromTabularPipeline::new(args, ctx).run(),
        Command::ExtractIds(args) => ExtractPipeline::new(args, ctx).run(),
    }
}
