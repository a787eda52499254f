pub mod generate;
pub mod info;
pub mod preview;

use clap::ValueEnum;

use blendgen_core::pipeline::config::{Population, Split};
use blendgen_core::sample::SourceMode;
use blendgen_core::shift::ShiftPolicy;

#[derive(Clone, Copy, ValueEnum)]
pub enum SplitArg {
    Training,
    Validation,
    Test,
}

impl From<SplitArg> for Split {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Training => Split::Training,
            SplitArg::Validation => Split::Validation,
            SplitArg::Test => Split::Test,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PopulationArg {
    Isolated,
    Blended,
}

impl From<PopulationArg> for Population {
    fn from(arg: PopulationArg) -> Self {
        match arg {
            PopulationArg::Isolated => Population::Isolated,
            PopulationArg::Blended => Population::Blended,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Parametric,
    Real,
}

impl From<ModeArg> for SourceMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Parametric => SourceMode::Parametric,
            ModeArg::Real => SourceMode::Real,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ShiftPolicyArg {
    Noshift,
    Uniform,
    UniformBetaprime,
}

impl From<ShiftPolicyArg> for ShiftPolicy {
    fn from(arg: ShiftPolicyArg) -> Self {
        match arg {
            ShiftPolicyArg::Noshift => ShiftPolicy::NoShift,
            ShiftPolicyArg::Uniform => ShiftPolicy::Uniform,
            ShiftPolicyArg::UniformBetaprime => ShiftPolicy::UniformBetaPrime,
        }
    }
}
