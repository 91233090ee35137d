// src/severity/mod.rs
//
// Pure severity heuristics shared by the image and video pipelines.
//
//   image: detections → ScoringStrategy (area ratio | distance weighted) → 0..=100
//   video: crossing box → EventScorer (width ratio | box area) → tier points

mod area_ratio;
mod distance_weighted;
mod event_points;

pub use area_ratio::{area_ratio_severity, summed_area, AreaRatioParams, AreaRatioStrategy};
pub use distance_weighted::{distance_weighted_severity, DistanceWeightedStrategy};
pub use event_points::{area_points, width_ratio_points, EventScorer};

use crate::types::{Config, Detection, ImageStrategy, SeverityReport};

/// Probability above which a mask pixel counts as occupied
pub const MASK_THRESHOLD: f32 = 0.5;

/// Upper bound of image-mode severity
pub const MAX_SEVERITY: u32 = 100;

/// Everything the detectors produced for one still image.
#[derive(Debug, Clone, Copy)]
pub struct ImageObservation<'a> {
    pub road: &'a [Detection],
    pub potholes: &'a [Detection],
    pub image_width: usize,
    pub image_height: usize,
}

/// A whole-image severity heuristic.
pub trait ScoringStrategy {
    fn name(&self) -> &'static str;

    /// Whether the strategy reads road detections. The image pipeline skips
    /// the road detector entirely when this is false.
    fn needs_road(&self) -> bool {
        true
    }

    /// Pothole confidence the strategy was tuned for, if it differs from
    /// the image-wide threshold.
    fn pothole_confidence(&self) -> Option<f32> {
        None
    }

    fn score(&self, observation: &ImageObservation<'_>) -> SeverityReport;
}

pub fn strategy_from_config(config: &Config) -> Box<dyn ScoringStrategy> {
    match config.image.strategy {
        ImageStrategy::AreaRatio => Box::new(AreaRatioStrategy::new(AreaRatioParams {
            area_max: config.scoring.area_max,
            density_max: config.scoring.density_max,
        })),
        ImageStrategy::DistanceWeighted => Box::new(DistanceWeightedStrategy::new(
            config.scoring.distance_weighted.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection() {
        let mut config = Config::default();
        assert_eq!(strategy_from_config(&config).name(), "area_ratio");

        config.image.strategy = ImageStrategy::DistanceWeighted;
        let strategy = strategy_from_config(&config);
        assert_eq!(strategy.name(), "distance_weighted");
        assert!(!strategy.needs_road());
    }
}
