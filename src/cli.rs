use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use pothole_severity::types::{ImageStrategy, Mode};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Backend {
    /// Replay detections recorded as JSON
    Replay,
    /// Decode with OpenCV and run ONNX models
    Opencv,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    AreaRatio,
    DistanceWeighted,
}

impl From<StrategyArg> for ImageStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::AreaRatio => ImageStrategy::AreaRatio,
            StrategyArg::DistanceWeighted => ImageStrategy::DistanceWeighted,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pothole-severity",
    about = "Score road damage severity from pothole detections",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// `image` or `video`
    pub mode: Mode,

    /// Image, video, or detection recording to analyze
    pub input: PathBuf,

    /// Annotated image (opencv image mode) or JSON report (replay)
    pub output: PathBuf,

    /// YAML configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Where detections come from
    #[arg(short = 'b', long = "backend", value_enum, default_value_t = Backend::Replay)]
    pub backend: Backend,

    /// Override the image scoring strategy from the configuration
    #[arg(long = "strategy", value_enum)]
    pub strategy: Option<StrategyArg>,
}
