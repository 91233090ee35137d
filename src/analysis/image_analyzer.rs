// src/analysis/image_analyzer.rs
//
// Still-image pipeline: road + pothole detection, then one pass of the
// selected scoring strategy. Stateless between calls.

use crate::detection::Detector;
use crate::severity::{ImageObservation, ScoringStrategy};
use crate::types::{Detection, DetectionClass, Frame, ImageConfig, SeverityReport};
use tracing::{debug, info, warn};

/// Result of one image plus the detections behind it, so annotation can run
/// as a separate step.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub report: SeverityReport,
    pub road: Vec<Detection>,
    pub potholes: Vec<Detection>,
}

pub struct ImageAnalyzer<R, P> {
    road_detector: R,
    pothole_detector: P,
    strategy: Box<dyn ScoringStrategy>,
    config: ImageConfig,
}

impl<R: Detector, P: Detector> ImageAnalyzer<R, P> {
    pub fn new(
        road_detector: R,
        pothole_detector: P,
        strategy: Box<dyn ScoringStrategy>,
        config: ImageConfig,
    ) -> Self {
        Self {
            road_detector,
            pothole_detector,
            strategy,
            config,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn analyze(&mut self, image: &Frame) -> ImageAnalysis {
        let road = if self.strategy.needs_road() {
            detect_or_empty(
                &mut self.road_detector,
                image,
                self.config.road_confidence,
                DetectionClass::Road,
            )
        } else {
            Vec::new()
        };
        let pothole_confidence = self
            .strategy
            .pothole_confidence()
            .unwrap_or(self.config.pothole_confidence);
        let potholes = detect_or_empty(
            &mut self.pothole_detector,
            image,
            pothole_confidence,
            DetectionClass::Pothole,
        );

        let report = self.strategy.score(&ImageObservation {
            road: &road,
            potholes: &potholes,
            image_width: image.width,
            image_height: image.height,
        });

        info!(
            "Image {}x{} [{}]: {} road regions, {} potholes → severity {} ({})",
            image.width,
            image.height,
            self.strategy.name(),
            road.len(),
            report.pothole_count,
            report.severity_score,
            report.status().as_str()
        );

        ImageAnalysis {
            report,
            road,
            potholes,
        }
    }
}

/// Detector failures count as "nothing found" rather than aborting.
fn detect_or_empty<D: Detector>(
    detector: &mut D,
    image: &Frame,
    confidence: f32,
    class: DetectionClass,
) -> Vec<Detection> {
    match detector.detect(image, confidence) {
        Ok(detections) => {
            debug!("{:?}: {} detections", class, detections.len());
            detections
        }
        Err(e) => {
            warn!("{:?} detection failed: {:#}", class, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::{AreaRatioParams, AreaRatioStrategy, DistanceWeightedStrategy};
    use crate::types::{BoundingBox, DistanceWeightedConfig};
    use anyhow::{anyhow, Result};

    struct Fixed(Vec<Detection>);

    impl Detector for Fixed {
        fn detect(&mut self, _frame: &Frame, confidence: f32) -> Result<Vec<Detection>> {
            Ok(self.0.iter().filter(|d| d.passes(confidence)).cloned().collect())
        }
    }

    struct Failing;

    impl Detector for Failing {
        fn detect(&mut self, _frame: &Frame, _confidence: f32) -> Result<Vec<Detection>> {
            Err(anyhow!("model not loaded"))
        }
    }

    /// Panics when called: the strategy must not need it.
    struct Untouchable;

    impl Detector for Untouchable {
        fn detect(&mut self, _frame: &Frame, _confidence: f32) -> Result<Vec<Detection>> {
            panic!("road detector should not run");
        }
    }

    fn image() -> Frame {
        Frame {
            data: vec![0; 100 * 100 * 3],
            width: 100,
            height: 100,
            index: 1,
        }
    }

    fn area_ratio() -> Box<dyn ScoringStrategy> {
        Box::new(AreaRatioStrategy::new(AreaRatioParams::default()))
    }

    fn full_road() -> Detection {
        Detection::from_box(BoundingBox::new(0.0, 0.0, 100.0, 100.0))
    }

    #[test]
    fn test_reference_image() {
        let potholes = vec![
            Detection::from_box(BoundingBox::new(0.0, 0.0, 25.0, 20.0)).with_confidence(0.9),
            Detection::from_box(BoundingBox::new(50.0, 50.0, 75.0, 70.0)).with_confidence(0.9),
            // below the 0.2 threshold
            Detection::from_box(BoundingBox::new(80.0, 80.0, 90.0, 90.0)).with_confidence(0.1),
        ];
        let mut analyzer = ImageAnalyzer::new(
            Fixed(vec![full_road()]),
            Fixed(potholes),
            area_ratio(),
            ImageConfig::default(),
        );

        let analysis = analyzer.analyze(&image());
        assert_eq!(analysis.report, SeverityReport::new(2, 77));
        assert_eq!(analysis.potholes.len(), 2);
    }

    #[test]
    fn test_no_potholes_with_road() {
        let mut analyzer = ImageAnalyzer::new(
            Fixed(vec![full_road()]),
            Fixed(vec![]),
            area_ratio(),
            ImageConfig::default(),
        );
        assert_eq!(analyzer.analyze(&image()).report, SeverityReport::new(0, 0));
    }

    #[test]
    fn test_failed_road_detection_is_degenerate_not_fatal() {
        let pothole = Detection::from_box(BoundingBox::new(0.0, 0.0, 50.0, 50.0));
        let mut analyzer = ImageAnalyzer::new(
            Failing,
            Fixed(vec![pothole]),
            area_ratio(),
            ImageConfig::default(),
        );
        assert_eq!(analyzer.analyze(&image()).report, SeverityReport::new(1, 0));
    }

    #[test]
    fn test_distance_weighted_skips_road_detector() {
        let pothole = Detection::from_box(BoundingBox::new(40.0, 40.0, 60.0, 60.0));
        let mut analyzer = ImageAnalyzer::new(
            Untouchable,
            Fixed(vec![pothole]),
            Box::new(DistanceWeightedStrategy::new(DistanceWeightedConfig::default())),
            ImageConfig::default(),
        );
        let analysis = analyzer.analyze(&image());
        assert_eq!(analysis.report, SeverityReport::new(1, 8));
        assert!(analysis.road.is_empty());
    }

    #[test]
    fn test_distance_weighted_uses_its_own_threshold() {
        let potholes = vec![
            Detection::from_box(BoundingBox::new(40.0, 40.0, 60.0, 60.0)).with_confidence(0.3),
            // passes the image-wide 0.2 but not the strategy's 0.25
            Detection::from_box(BoundingBox::new(0.0, 0.0, 10.0, 10.0)).with_confidence(0.22),
        ];
        let mut analyzer = ImageAnalyzer::new(
            Untouchable,
            Fixed(potholes.clone()),
            Box::new(DistanceWeightedStrategy::new(DistanceWeightedConfig::default())),
            ImageConfig::default(),
        );
        assert_eq!(analyzer.analyze(&image()).report, SeverityReport::new(1, 8));

        let mut analyzer = ImageAnalyzer::new(
            Fixed(vec![full_road()]),
            Fixed(potholes),
            area_ratio(),
            ImageConfig::default(),
        );
        assert_eq!(analyzer.analyze(&image()).report.pothole_count, 2);
    }
}
