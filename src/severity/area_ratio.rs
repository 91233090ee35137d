use super::{ImageObservation, ScoringStrategy, MASK_THRESHOLD, MAX_SEVERITY};
use crate::types::{Detection, RoadMeasurement, SeverityReport};
use tracing::debug;

/// Share of the score driven by pothole density
pub const DENSITY_WEIGHT: f64 = 0.4;
/// Share of the score driven by square-root-boosted area coverage
pub const AREA_WEIGHT: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaRatioParams {
    /// Pothole/road area ratio at which the area term saturates
    pub area_max: f64,
    /// Potholes per road pixel at which the density term saturates
    pub density_max: f64,
}

impl Default for AreaRatioParams {
    fn default() -> Self {
        Self {
            area_max: 0.25,
            density_max: 0.00015,
        }
    }
}

/// Road-normalized severity in `0..=100`.
///
/// Without road pixels there is nothing to normalize against, so the result
/// is 0 regardless of the pothole inputs. The square root on the area term
/// makes moderate coverage already score high.
pub fn area_ratio_severity(
    pothole_area: f64,
    road_area: f64,
    pothole_count: u32,
    params: &AreaRatioParams,
) -> u32 {
    if road_area <= 0.0 {
        return 0;
    }

    let area_ratio = pothole_area.max(0.0) / road_area;
    let area_score = (area_ratio / params.area_max).min(1.0);
    let boost = area_score.sqrt();

    let density = pothole_count as f64 / road_area;
    let density_score = (density / params.density_max).min(1.0);

    let severity = (100.0 * (DENSITY_WEIGHT * density_score + AREA_WEIGHT * boost)).floor();
    (severity.max(0.0) as u32).min(MAX_SEVERITY)
}

/// Sum of covered pixels over `detections`, binarizing masks at `threshold`.
pub fn summed_area(detections: &[Detection], threshold: f32) -> f64 {
    detections.iter().map(|d| d.covered_area(threshold)).sum()
}

pub struct AreaRatioStrategy {
    params: AreaRatioParams,
}

impl AreaRatioStrategy {
    pub fn new(params: AreaRatioParams) -> Self {
        Self { params }
    }
}

impl ScoringStrategy for AreaRatioStrategy {
    fn name(&self) -> &'static str {
        "area_ratio"
    }

    fn score(&self, observation: &ImageObservation<'_>) -> SeverityReport {
        let road_area = RoadMeasurement::area_of(observation.road, MASK_THRESHOLD).value();
        let pothole_area = summed_area(observation.potholes, MASK_THRESHOLD);
        let pothole_count = observation.potholes.len() as u32;

        let severity = area_ratio_severity(pothole_area, road_area, pothole_count, &self.params);
        debug!(
            "area ratio: road={:.0}px pothole={:.0}px count={} → {}",
            road_area, pothole_area, pothole_count, severity
        );

        SeverityReport::new(pothole_count, severity)
    }
}
