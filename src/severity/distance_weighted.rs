use super::{ImageObservation, ScoringStrategy, MAX_SEVERITY};
use crate::types::{Detection, DistanceWeightedConfig, SeverityReport};
use tracing::debug;

/// Frame-normalized severity in `0..=100` from a perspective-weighted area.
pub fn distance_weighted_severity(
    weighted_area: f64,
    image_area: f64,
    pothole_count: u32,
    config: &DistanceWeightedConfig,
) -> u32 {
    if image_area <= 0.0 {
        return 0;
    }

    let ratio = weighted_area.max(0.0) / image_area;
    let count_score = if config.count_saturation == 0 {
        if pothole_count > 0 {
            1.0
        } else {
            0.0
        }
    } else {
        (pothole_count as f64 / config.count_saturation as f64).min(1.0)
    };

    let severity = (ratio * config.area_weight + count_score * config.count_weight)
        .min(MAX_SEVERITY as f64);
    severity.max(0.0) as u32
}

/// Box area scaled by `1 + (1 - center_y / image_height)`: boxes nearer the
/// top of the frame are farther away and weigh up to twice as much.
fn weighted_box_area(detection: &Detection, image_height: f64) -> f64 {
    let area = detection.bbox.area() as f64;
    if image_height <= 0.0 {
        return area;
    }
    let distance_weight = 1.0 + (1.0 - detection.bbox.center_y() as f64 / image_height);
    area * distance_weight
}

pub struct DistanceWeightedStrategy {
    config: DistanceWeightedConfig,
}

impl DistanceWeightedStrategy {
    pub fn new(config: DistanceWeightedConfig) -> Self {
        Self { config }
    }
}

impl ScoringStrategy for DistanceWeightedStrategy {
    fn name(&self) -> &'static str {
        "distance_weighted"
    }

    fn needs_road(&self) -> bool {
        false
    }

    fn pothole_confidence(&self) -> Option<f32> {
        Some(self.config.pothole_confidence)
    }

    fn score(&self, observation: &ImageObservation<'_>) -> SeverityReport {
        let image_height = observation.image_height as f64;
        let image_area = (observation.image_width * observation.image_height) as f64;
        let weighted_area: f64 = observation
            .potholes
            .iter()
            .map(|d| weighted_box_area(d, image_height))
            .sum();
        let pothole_count = observation.potholes.len() as u32;

        let severity =
            distance_weighted_severity(weighted_area, image_area, pothole_count, &self.config);
        debug!(
            "distance weighted: weighted_area={:.0}px image={:.0}px count={} → {}",
            weighted_area, image_area, pothole_count, severity
        );

        SeverityReport::new(pothole_count, severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn observe(potholes: &[Detection]) -> SeverityReport {
        DistanceWeightedStrategy::new(DistanceWeightedConfig::default()).score(&ImageObservation {
            road: &[],
            potholes,
            image_width: 100,
            image_height: 100,
        })
    }

    #[test]
    fn test_far_boxes_weigh_more() {
        let near = Detection::from_box(BoundingBox::new(0.0, 80.0, 10.0, 100.0));
        let far = Detection::from_box(BoundingBox::new(0.0, 0.0, 10.0, 20.0));
        assert!(weighted_box_area(&far, 100.0) > weighted_box_area(&near, 100.0));
        // center_y = 10 → weight 1.9
        assert!((weighted_box_area(&far, 100.0) - 380.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_box_score() {
        // 20x20 box centered at y=50 → weight 1.5 → 600 / 10000 = 0.06
        // 0.06*50 + 0.1*50 = 8
        let det = Detection::from_box(BoundingBox::new(40.0, 40.0, 60.0, 60.0));
        let report = observe(&[det]);
        assert_eq!(report.pothole_count, 1);
        assert_eq!(report.severity_score, 8);
    }

    #[test]
    fn test_saturates_at_max() {
        let potholes: Vec<_> = (0..20)
            .map(|_| Detection::from_box(BoundingBox::new(0.0, 0.0, 100.0, 100.0)))
            .collect();
        assert_eq!(observe(&potholes).severity_score, 100);
    }

    #[test]
    fn test_empty_image_area() {
        let config = DistanceWeightedConfig::default();
        assert_eq!(distance_weighted_severity(500.0, 0.0, 3, &config), 0);
    }

    #[test]
    fn test_no_potholes() {
        assert_eq!(observe(&[]), SeverityReport::new(0, 0));
    }
}
