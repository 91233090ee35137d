// src/analysis/road_measurement.rs
//
// Road surface measurement and the periodic refresh schedule used by the
// video pipeline. Measuring the road costs a full detector pass, so video
// mode samples it on frame 1 and every Nth frame and reuses the cached
// width in between.

use crate::types::{Detection, RoadMeasurement};
use tracing::{debug, info};

/// Caches the road width between scheduled refreshes.
#[derive(Debug, Clone)]
pub struct RoadWidthSampler {
    interval: u64,
    current_width: f32,
    refreshes: u64,
    misses: u64,
}

impl RoadWidthSampler {
    pub fn new(interval: u64, initial_width: f32) -> Self {
        Self {
            interval: interval.max(1),
            current_width: initial_width,
            refreshes: 0,
            misses: 0,
        }
    }

    /// Frame 1 and every `interval`-th frame after it.
    pub fn is_due(&self, frame_index: u64) -> bool {
        frame_index == 1 || frame_index % self.interval == 0
    }

    pub fn current_width(&self) -> f32 {
        self.current_width
    }

    /// Adopt a new width from `detections`. Returns false and keeps the
    /// cached width when no road was found.
    pub fn refresh(&mut self, frame_index: u64, detections: &[Detection]) -> bool {
        let measurement = RoadMeasurement::width_of(detections);
        if !measurement.is_empty() {
            let width = measurement.value() as f32;
            if (width - self.current_width).abs() > f32::EPSILON {
                debug!(
                    "Road width {:.0}px → {:.0}px at frame {}",
                    self.current_width, width, frame_index
                );
            }
            self.current_width = width;
            self.refreshes += 1;
            true
        } else {
            self.misses += 1;
            info!(
                "No road found at frame {}, keeping width {:.0}px",
                frame_index, self.current_width
            );
            false
        }
    }

    /// Count a refresh whose detector call failed.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn road(x1: f32, x2: f32) -> Detection {
        Detection::from_box(BoundingBox::new(x1, 300.0, x2, 720.0))
    }

    #[test]
    fn test_schedule() {
        let sampler = RoadWidthSampler::new(30, 1000.0);
        let due: Vec<u64> = (1..=95).filter(|&i| sampler.is_due(i)).collect();
        assert_eq!(due, vec![1, 30, 60, 90]);
    }

    #[test]
    fn test_interval_of_one_refreshes_every_frame() {
        let sampler = RoadWidthSampler::new(1, 1000.0);
        assert!((1..10).all(|i| sampler.is_due(i)));
    }

    #[test]
    fn test_refresh_takes_widest_box() {
        let mut sampler = RoadWidthSampler::new(30, 1000.0);
        assert!(sampler.refresh(1, &[road(0.0, 400.0), road(100.0, 900.0)]));
        assert_eq!(sampler.current_width(), 800.0);
        assert_eq!(sampler.refreshes(), 1);
    }

    #[test]
    fn test_miss_keeps_previous_width() {
        let mut sampler = RoadWidthSampler::new(30, 1000.0);
        sampler.refresh(1, &[road(0.0, 640.0)]);
        assert!(!sampler.refresh(30, &[]));
        assert_eq!(sampler.current_width(), 640.0);
        // a degenerate zero-width box is no road either
        assert!(!sampler.refresh(60, &[road(200.0, 200.0)]));
        assert_eq!(sampler.current_width(), 640.0);
        assert_eq!(sampler.misses(), 2);
    }
}
