// src/lib.rs
//
// Road damage severity from pothole detections.
//
//   detection (Detector / TrackingDetector / FrameSource seams)
//        │
//        ├── analysis::ImageAnalyzer ── severity::ScoringStrategy ──→ SeverityReport
//        └── analysis::VideoAnalyzer ── crossing tracker + EventScorer ──→ SeverityReport
//
// The replay backend in `detection` is always available. OpenCV decoding and
// ONNX Runtime inference live in `backend` behind the `backend-opencv` feature.

pub mod analysis;
pub mod detection;
pub mod error;
pub mod severity;
pub mod types;

mod config;

#[cfg(feature = "backend-opencv")]
pub mod backend;

pub use analysis::{ImageAnalysis, ImageAnalyzer, VideoAnalysis, VideoAnalyzer};
pub use error::{AnalysisError, Result};
pub use types::{
    Config, Detection, Frame, Mode, RoadMeasurement, SeverityReport, SeverityStatus,
};
