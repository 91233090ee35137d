// src/analysis/mod.rs
//
// The two pipelines.
//
//   image: road detector + pothole detector → ScoringStrategy → SeverityReport
//   video: frame source → road width sampler ─┐
//          frame source → pothole tracker ────┴→ crossing tracker → accumulator

pub mod crossing_tracker;
pub mod image_analyzer;
pub mod metrics;
pub mod road_measurement;
pub mod video_analyzer;

pub use crossing_tracker::{CrossingTracker, TrackPhase};
pub use image_analyzer::{ImageAnalysis, ImageAnalyzer};
pub use metrics::{VideoMetrics, VideoStats};
pub use road_measurement::RoadWidthSampler;
pub use video_analyzer::{
    CrossingEvent, SeverityAccumulator, VideoAnalysis, VideoAnalyzer, VideoSession,
};
