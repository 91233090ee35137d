// src/analysis/metrics.rs
//
// Counters for one video run. Logged when the run ends and returned with
// the result.

use serde::Serialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct VideoMetrics {
    pub frames_processed: u64,
    pub frames_with_potholes: u64,
    pub detections_without_identity: u64,
    pub tracker_failures: u64,
    pub road_failures: u64,
    started_at: Instant,
}

impl VideoMetrics {
    pub fn new() -> Self {
        Self {
            frames_processed: 0,
            frames_with_potholes: 0,
            detections_without_identity: 0,
            tracker_failures: 0,
            road_failures: 0,
            started_at: Instant::now(),
        }
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.frames_processed as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(
        &self,
        road_refreshes: u64,
        road_refresh_misses: u64,
        identities_tracked: usize,
        identities_evicted: u64,
    ) -> VideoStats {
        VideoStats {
            frames_processed: self.frames_processed,
            frames_with_potholes: self.frames_with_potholes,
            detections_without_identity: self.detections_without_identity,
            tracker_failures: self.tracker_failures,
            road_failures: self.road_failures,
            road_refreshes,
            road_refresh_misses,
            identities_tracked,
            identities_evicted,
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for VideoMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoStats {
    pub frames_processed: u64,
    pub frames_with_potholes: u64,
    pub detections_without_identity: u64,
    pub tracker_failures: u64,
    pub road_failures: u64,
    pub road_refreshes: u64,
    pub road_refresh_misses: u64,
    pub identities_tracked: usize,
    pub identities_evicted: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}

impl VideoStats {
    pub fn log(&self) {
        info!("Processing complete in {:.2}s", self.elapsed_secs);
        info!("  Frames processed: {}", self.frames_processed);
        info!(
            "  Frames with potholes: {} ({:.1}%)",
            self.frames_with_potholes,
            100.0 * self.frames_with_potholes as f64 / self.frames_processed.max(1) as f64
        );
        info!(
            "  Road refreshes: {} ({} kept previous width)",
            self.road_refreshes, self.road_refresh_misses
        );
        info!(
            "  Identities tracked: {} ({} evicted)",
            self.identities_tracked, self.identities_evicted
        );
        if self.tracker_failures > 0 || self.road_failures > 0 {
            info!(
                "  Detector failures: tracker={} road={}",
                self.tracker_failures, self.road_failures
            );
        }
        info!("  Processing speed: {:.1} FPS", self.fps);
    }
}
