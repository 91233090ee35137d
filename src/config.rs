use crate::error::{AnalysisError, Result};
use crate::types::Config;
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| AnalysisError::input_unavailable(path, e.to_string()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| AnalysisError::configuration(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let video = &self.video;
        if video.road_check_interval == 0 {
            return Err(AnalysisError::configuration(
                "video.road_check_interval must be at least 1",
            ));
        }
        if !(video.line_position > 0.0 && video.line_position < 1.0) {
            return Err(AnalysisError::configuration(format!(
                "video.line_position must be inside (0, 1), got {}",
                video.line_position
            )));
        }
        if !(video.initial_road_width > 0.0) {
            return Err(AnalysisError::configuration(
                "video.initial_road_width must be positive",
            ));
        }
        if video.max_tracked_identities == Some(0) {
            return Err(AnalysisError::configuration(
                "video.max_tracked_identities must be at least 1 when set",
            ));
        }
        if let Some(limit) = video.max_duration_secs {
            if !(limit > 0.0) {
                return Err(AnalysisError::configuration(
                    "video.max_duration_secs must be positive when set",
                ));
            }
        }

        for (name, value) in [
            ("image.road_confidence", self.image.road_confidence),
            ("image.pothole_confidence", self.image.pothole_confidence),
            ("video.road_confidence", video.road_confidence),
            ("video.pothole_confidence", video.pothole_confidence),
            (
                "scoring.distance_weighted.pothole_confidence",
                self.scoring.distance_weighted.pothole_confidence,
            ),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(AnalysisError::configuration(format!(
                    "{} must be inside (0, 1], got {}",
                    name, value
                )));
            }
        }

        let scoring = &self.scoring;
        if !(scoring.area_max > 0.0) || !(scoring.density_max > 0.0) {
            return Err(AnalysisError::configuration(
                "scoring.area_max and scoring.density_max must be positive",
            ));
        }
        let tiers = &scoring.event_tiers;
        if tiers.small_ratio > tiers.medium_ratio || tiers.small_area > tiers.medium_area {
            return Err(AnalysisError::configuration(
                "scoring.event_tiers small bounds must not exceed medium bounds",
            ));
        }

        Ok(())
    }
}
