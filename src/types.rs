use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub image: ImageConfig,
    pub video: VideoConfig,
    pub scoring: ScoringConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStrategy {
    /// Pothole mask area normalized by road mask area
    AreaRatio,
    /// Box area weighted by vertical position, normalized by frame area
    DistanceWeighted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub strategy: ImageStrategy,
    pub road_confidence: f32,
    pub pothole_confidence: f32,
    /// Draw pothole boxes onto the output image when a backend supports it
    pub annotate: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            strategy: ImageStrategy::AreaRatio,
            road_confidence: 0.2,
            pothole_confidence: 0.2,
            annotate: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Reference line as a fraction of frame height (0 = top, 1 = bottom)
    pub line_position: f64,
    pub pothole_confidence: f32,
    pub road_confidence: f32,
    /// Re-measure the road on frame 1 and every Nth frame
    pub road_check_interval: u64,
    /// Road width used until the first successful measurement
    pub initial_road_width: f32,
    /// Reject videos longer than this before reading any frame
    pub max_duration_secs: Option<f64>,
    /// Upper bound on remembered track positions. `None` keeps every identity.
    pub max_tracked_identities: Option<usize>,
    pub progress_log_interval: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            line_position: 0.65,
            pothole_confidence: 0.2,
            road_confidence: 0.25,
            road_check_interval: 30,
            initial_road_width: 1000.0,
            max_duration_secs: Some(10.0),
            max_tracked_identities: None,
            progress_log_interval: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventBasis {
    /// Pothole box width divided by the sampled road width
    RoadWidthRatio,
    /// Raw pothole box area in pixels
    BoxArea,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTierConfig {
    pub small_ratio: f32,
    pub medium_ratio: f32,
    pub small_area: f32,
    pub medium_area: f32,
    pub small_points: u32,
    pub medium_points: u32,
    pub large_points: u32,
}

impl Default for EventTierConfig {
    fn default() -> Self {
        Self {
            small_ratio: 0.15,
            medium_ratio: 0.30,
            small_area: 3000.0,
            medium_area: 9000.0,
            small_points: 2,
            medium_points: 5,
            large_points: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceWeightedConfig {
    /// Pothole count at which the count term saturates
    pub count_saturation: u32,
    pub area_weight: f64,
    pub count_weight: f64,
    /// Pothole threshold for this strategy, overriding `image.pothole_confidence`
    pub pothole_confidence: f32,
}

impl Default for DistanceWeightedConfig {
    fn default() -> Self {
        Self {
            count_saturation: 10,
            area_weight: 50.0,
            count_weight: 50.0,
            pothole_confidence: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Fraction of road area considered maximally severe
    pub area_max: f64,
    /// Potholes per road pixel considered maximally severe
    pub density_max: f64,
    pub event_basis: EventBasis,
    pub event_tiers: EventTierConfig,
    pub distance_weighted: DistanceWeightedConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            area_max: 0.25,
            density_max: 0.00015,
            event_basis: EventBasis::RoadWidthRatio,
            event_tiers: EventTierConfig::default(),
            distance_weighted: DistanceWeightedConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub road_model_path: String,
    pub pothole_model_path: String,
    pub input_size: usize,
    pub num_classes: usize,
    pub intra_threads: usize,
    pub nms_iou_threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            road_model_path: "models/road.onnx".to_string(),
            pothole_model_path: "models/pothole.onnx".to_string(),
            input_size: 640,
            num_classes: 1,
            intra_threads: 4,
            nms_iou_threshold: 0.45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// MODES
// ============================================================================

/// Which pipeline a run goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Image,
    Video,
}

impl std::str::FromStr for Mode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            _ => Err(AnalysisError::InvalidMode(s.to_string())),
        }
    }
}

// ============================================================================
// FRAMES
// ============================================================================

/// One decoded image or video frame. `data` is packed RGB8, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// 1-based position in the source; images are frame 1
    pub index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub fps: f64,
    pub total_frames: u64,
    pub width: usize,
    pub height: usize,
}

impl VideoInfo {
    /// Reported duration in seconds, zero when the source has no usable frame rate.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }
}

// ============================================================================
// DETECTIONS
// ============================================================================

pub type TrackId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) * 0.5, (self.y1 + self.y2) * 0.5)
    }

    pub fn center_y(&self) -> f32 {
        (self.y1 + self.y2) * 0.5
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(b: [f32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Per-pixel occupancy probabilities aligned to the source frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl Mask {
    /// Number of pixels whose probability is strictly above `threshold`.
    pub fn occupied_pixels(&self, threshold: f32) -> u64 {
        self.values.iter().filter(|&&v| v > threshold).count() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionClass {
    Road,
    Pothole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Mask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<DetectionClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
}

impl Detection {
    pub fn from_box(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            mask: None,
            confidence: None,
            class: None,
            track_id: None,
        }
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_class(mut self, class: DetectionClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn with_track_id(mut self, track_id: TrackId) -> Self {
        self.track_id = Some(track_id);
        self
    }

    /// Covered pixels: the binarized mask when present, otherwise the box area.
    pub fn covered_area(&self, mask_threshold: f32) -> f64 {
        match &self.mask {
            Some(mask) => mask.occupied_pixels(mask_threshold) as f64,
            None => self.bbox.area() as f64,
        }
    }

    /// Detections without a confidence are treated as certain.
    pub fn passes(&self, threshold: f32) -> bool {
        self.confidence.map_or(true, |c| c >= threshold)
    }
}

/// Road surface aggregate over every road detection of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoadMeasurement {
    /// Summed occupied pixels (mask, or box when mask-less)
    Area(f64),
    /// Widest road bounding box
    Width(f32),
}

impl RoadMeasurement {
    pub fn area_of(detections: &[Detection], mask_threshold: f32) -> Self {
        Self::Area(
            detections
                .iter()
                .map(|d| d.covered_area(mask_threshold))
                .sum(),
        )
    }

    pub fn width_of(detections: &[Detection]) -> Self {
        Self::Width(
            detections
                .iter()
                .map(|d| d.bbox.width())
                .fold(0.0f32, f32::max),
        )
    }

    pub fn value(&self) -> f64 {
        match *self {
            Self::Area(area) => area,
            Self::Width(width) => width as f64,
        }
    }

    /// No road pixels, or only degenerate boxes
    pub fn is_empty(&self) -> bool {
        self.value() <= 0.0
    }
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityReport {
    #[serde(rename = "Pothole Count")]
    pub pothole_count: u32,
    #[serde(rename = "Severity Score")]
    pub severity_score: u32,
    #[serde(
        rename = "Output Image Path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_image_path: Option<PathBuf>,
}

impl SeverityReport {
    pub fn new(pothole_count: u32, severity_score: u32) -> Self {
        Self {
            pothole_count,
            severity_score,
            output_image_path: None,
        }
    }

    pub fn status(&self) -> SeverityStatus {
        SeverityStatus::from_score(self.severity_score)
    }
}

/// Coarse road condition label for a severity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityStatus {
    Good,
    Average,
    Bad,
    Critical,
}

impl SeverityStatus {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=19 => Self::Good,
            20..=59 => Self::Average,
            60..=89 => Self::Bad,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good condition",
            Self::Average => "average condition",
            Self::Bad => "bad condition",
            Self::Critical => "critical condition",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_geometry() {
        let b = BoundingBox::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(b.width(), 100.0);
        assert_eq!(b.height(), 50.0);
        assert_eq!(b.area(), 5000.0);
        assert_eq!(b.center(), (60.0, 45.0));
    }

    #[test]
    fn test_iou_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(50.0, 50.0, 150.0, 150.0);
        assert!((a.iou(&b) - 2500.0 / 17500.0).abs() < 0.01);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let b = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_mask_binarizes_strictly_above_threshold() {
        let mask = Mask {
            width: 2,
            height: 2,
            values: vec![0.5, 0.51, 0.9, 0.1],
        };
        assert_eq!(mask.occupied_pixels(0.5), 2);
    }

    #[test]
    fn test_covered_area_falls_back_to_box() {
        let det = Detection::from_box(BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(det.covered_area(0.5), 100.0);
    }

    #[test]
    fn test_video_duration() {
        let info = VideoInfo {
            fps: 30.0,
            total_frames: 360,
            width: 1280,
            height: 720,
        };
        assert!((info.duration_secs() - 12.0).abs() < 1e-9);

        let no_fps = VideoInfo { fps: 0.0, ..info };
        assert_eq!(no_fps.duration_secs(), 0.0);
    }

    #[test]
    fn test_report_serializes_with_display_keys() {
        let json = serde_json::to_string(&SeverityReport::new(3, 42)).unwrap();
        assert_eq!(json, r#"{"Pothole Count":3,"Severity Score":42}"#);
    }

    #[test]
    fn test_detection_deserializes_box_array() {
        let det: Detection =
            serde_json::from_str(r#"{"bbox":[1,2,3,4],"track_id":7}"#).unwrap();
        assert_eq!(det.bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(det.track_id, Some(7));
        assert!(det.mask.is_none());
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(SeverityStatus::from_score(0), SeverityStatus::Good);
        assert_eq!(SeverityStatus::from_score(20), SeverityStatus::Average);
        assert_eq!(SeverityStatus::from_score(89), SeverityStatus::Bad);
        assert_eq!(SeverityStatus::from_score(90), SeverityStatus::Critical);
    }

    #[test]
    fn test_road_area_uses_masks() {
        let det = Detection::from_box(BoundingBox::new(0.0, 300.0, 10.0, 720.0)).with_mask(Mask {
            width: 4,
            height: 1,
            values: vec![1.0, 0.6, 0.2, 0.0],
        });
        assert_eq!(RoadMeasurement::area_of(&[det], 0.5), RoadMeasurement::Area(2.0));
        assert!(RoadMeasurement::area_of(&[], 0.5).is_empty());
    }

    #[test]
    fn test_road_width_is_widest_box() {
        let roads = [
            Detection::from_box(BoundingBox::new(0.0, 300.0, 400.0, 720.0)),
            Detection::from_box(BoundingBox::new(100.0, 300.0, 900.0, 720.0)),
        ];
        assert_eq!(RoadMeasurement::width_of(&roads), RoadMeasurement::Width(800.0));
        assert!(RoadMeasurement::width_of(&[]).is_empty());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("image".parse::<Mode>().unwrap(), Mode::Image);
        assert_eq!("VIDEO".parse::<Mode>().unwrap(), Mode::Video);
        assert!(matches!(
            "audio".parse::<Mode>(),
            Err(AnalysisError::InvalidMode(m)) if m == "audio"
        ));
    }
}
