// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Backend, CliArgs};
use pothole_severity::analysis::{ImageAnalyzer, VideoAnalyzer};
use pothole_severity::detection::{Recording, ReplayDetector, ReplaySource};
use pothole_severity::error::AnalysisError;
use pothole_severity::severity::strategy_from_config;
use pothole_severity::types::{Config, DetectionClass, Mode, SeverityReport};
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config = Config::load_or_default(args.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&level);

    let result = config
        .map_err(anyhow::Error::from)
        .and_then(|config| run(&args, config));

    match result {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("{:#}", e);
            let kind = e
                .downcast_ref::<AnalysisError>()
                .map_or("internal", AnalysisError::kind);
            println!(
                "{}",
                serde_json::json!({ "Error": format!("{:#}", e), "Kind": kind })
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("pothole_severity={},ort=warn", level)))
        .unwrap_or_else(|_| EnvFilter::new("pothole_severity=info,ort=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &CliArgs, mut config: Config) -> Result<SeverityReport> {
    if let Some(strategy) = args.strategy {
        config.image.strategy = strategy.into();
    }

    info!(
        "🕳️  Pothole severity: {:?} mode, {:?} backend, input {}",
        args.mode,
        args.backend,
        args.input.display()
    );

    match args.backend {
        Backend::Replay => run_replay(args, config),
        Backend::Opencv => run_opencv(args, config),
    }
}

fn run_replay(args: &CliArgs, config: Config) -> Result<SeverityReport> {
    let recording = Rc::new(Recording::load(&args.input)?);
    let road = ReplayDetector::new(Rc::clone(&recording), DetectionClass::Road);
    let potholes = ReplayDetector::new(Rc::clone(&recording), DetectionClass::Pothole);

    let report = match args.mode {
        Mode::Image => {
            let image = recording.blank_frame(1);
            let mut analyzer = ImageAnalyzer::new(
                road,
                potholes,
                strategy_from_config(&config),
                config.image.clone(),
            );
            info!("Image strategy: {}", analyzer.strategy_name());
            analyzer.analyze(&image).report
        }
        Mode::Video => {
            let mut source = ReplaySource::new(Rc::clone(&recording));
            let mut analyzer = VideoAnalyzer::new(potholes, road, config);
            analyzer.analyze(&mut source)?.report
        }
    };

    write_report(&report, &args.output)?;
    Ok(report)
}

fn write_report(report: &SeverityReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("✓ Report saved: {}", path.display());
    Ok(())
}

#[cfg(feature = "backend-opencv")]
fn run_opencv(args: &CliArgs, config: Config) -> Result<SeverityReport> {
    use pothole_severity::backend::{
        annotate_potholes, load_image, VideoFileSource, YoloSegDetector,
    };
    use pothole_severity::detection::{IouTracker, IouTrackerConfig};

    let road = YoloSegDetector::new(
        &config.model.road_model_path,
        &config.model,
        DetectionClass::Road,
    )?;
    let potholes = YoloSegDetector::new(
        &config.model.pothole_model_path,
        &config.model,
        DetectionClass::Pothole,
    )?;

    match args.mode {
        Mode::Image => {
            let image = load_image(&args.input)?;
            let annotate = config.image.annotate;
            let mut analyzer = ImageAnalyzer::new(
                road,
                potholes,
                strategy_from_config(&config),
                config.image.clone(),
            );
            info!("Image strategy: {}", analyzer.strategy_name());
            let analysis = analyzer.analyze(&image);

            let mut report = analysis.report;
            if annotate {
                annotate_potholes(&image, &analysis.potholes, &args.output)
                    .context("Failed to write annotated image")?;
                info!("✓ Annotated image saved: {}", args.output.display());
                report.output_image_path = Some(args.output.clone());
            }
            Ok(report)
        }
        Mode::Video => {
            let mut source = VideoFileSource::open(&args.input)?;
            let tracker = IouTracker::new(potholes, IouTrackerConfig::default());
            let mut analyzer = VideoAnalyzer::new(tracker, road, config);
            Ok(analyzer.analyze(&mut source)?.report)
        }
    }
}

#[cfg(not(feature = "backend-opencv"))]
fn run_opencv(_args: &CliArgs, _config: Config) -> Result<SeverityReport> {
    Err(AnalysisError::configuration(
        "this build has no OpenCV backend, rebuild with `--features backend-opencv`",
    )
    .into())
}
