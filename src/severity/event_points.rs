use crate::types::{BoundingBox, EventBasis, EventTierConfig};

/// Tier award for a pothole width relative to the road width.
pub fn width_ratio_points(ratio: f32, tiers: &EventTierConfig) -> u32 {
    if ratio < tiers.small_ratio {
        tiers.small_points
    } else if ratio < tiers.medium_ratio {
        tiers.medium_points
    } else {
        tiers.large_points
    }
}

/// Tier award for a raw pothole box area in pixels.
pub fn area_points(area: f32, tiers: &EventTierConfig) -> u32 {
    if area < tiers.small_area {
        tiers.small_points
    } else if area < tiers.medium_area {
        tiers.medium_points
    } else {
        tiers.large_points
    }
}

/// Scores a single crossing event.
#[derive(Debug, Clone)]
pub struct EventScorer {
    basis: EventBasis,
    tiers: EventTierConfig,
}

impl EventScorer {
    pub fn new(basis: EventBasis, tiers: EventTierConfig) -> Self {
        Self { basis, tiers }
    }

    pub fn basis(&self) -> EventBasis {
        self.basis
    }

    /// Feature the tiers are applied to: width ratio or pixel area.
    pub fn measure(&self, bbox: &BoundingBox, road_width: f32) -> f32 {
        match self.basis {
            EventBasis::RoadWidthRatio => {
                if road_width > 0.0 {
                    bbox.width() / road_width
                } else {
                    f32::INFINITY
                }
            }
            EventBasis::BoxArea => bbox.area(),
        }
    }

    pub fn points(&self, measure: f32) -> u32 {
        match self.basis {
            EventBasis::RoadWidthRatio => width_ratio_points(measure, &self.tiers),
            EventBasis::BoxArea => area_points(measure, &self.tiers),
        }
    }
}
