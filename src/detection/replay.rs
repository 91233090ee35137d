// src/detection/replay.rs
//
// Detector, tracker and frame source backed by a JSON recording of detector
// output. Lets both pipelines run without a model runtime, and is how the
// CLI works when built without the OpenCV backend.
//
// Replayed frames carry dimensions but no pixels.

use super::{Detector, FrameSource, TrackingDetector};
use crate::error::AnalysisError;
use crate::types::{Detection, DetectionClass, Frame, VideoInfo};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    #[serde(default)]
    pub road: Vec<Detection>,
    #[serde(default)]
    pub potholes: Vec<Detection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub fps: f64,
    #[serde(default)]
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| AnalysisError::input_unavailable(path, e.to_string()))?;
        let recording: Recording = serde_json::from_str(&contents)?;
        info!(
            "Loaded recording {}: {}x{} @ {:.1} FPS, {} frames",
            path.display(),
            recording.width,
            recording.height,
            recording.fps,
            recording.frames.len()
        );
        Ok(recording)
    }

    pub fn info(&self) -> VideoInfo {
        VideoInfo {
            fps: self.fps,
            total_frames: self.frames.len() as u64,
            width: self.width,
            height: self.height,
        }
    }

    /// Frame by 1-based index
    pub fn frame(&self, index: u64) -> Option<&RecordedFrame> {
        let idx = usize::try_from(index.checked_sub(1)?).ok()?;
        self.frames.get(idx)
    }

    /// Blank frame with this recording's dimensions
    pub fn blank_frame(&self, index: u64) -> Frame {
        Frame {
            data: Vec::new(),
            width: self.width,
            height: self.height,
            index,
        }
    }
}

pub struct ReplaySource {
    recording: Rc<Recording>,
    next_index: u64,
}

impl ReplaySource {
    pub fn new(recording: Rc<Recording>) -> Self {
        Self {
            recording,
            next_index: 1,
        }
    }
}

impl FrameSource for ReplaySource {
    fn info(&self) -> VideoInfo {
        self.recording.info()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.recording.frame(self.next_index).is_none() {
            return Ok(None);
        }
        let frame = self.recording.blank_frame(self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }
}

/// Replays one detection class of a recording.
pub struct ReplayDetector {
    recording: Rc<Recording>,
    class: DetectionClass,
}

impl ReplayDetector {
    pub fn new(recording: Rc<Recording>, class: DetectionClass) -> Self {
        Self { recording, class }
    }

    fn replay(&self, frame: &Frame, confidence: f32) -> Vec<Detection> {
        let Some(recorded) = self.recording.frame(frame.index) else {
            return Vec::new();
        };
        let source = match self.class {
            DetectionClass::Road => &recorded.road,
            DetectionClass::Pothole => &recorded.potholes,
        };
        let detections: Vec<Detection> = source
            .iter()
            .filter(|d| d.passes(confidence))
            .map(|d| d.clone().with_class(self.class))
            .collect();
        debug!(
            "Replayed {} {:?} detections for frame {}",
            detections.len(),
            self.class,
            frame.index
        );
        detections
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, frame: &Frame, confidence: f32) -> Result<Vec<Detection>> {
        Ok(self.replay(frame, confidence))
    }
}

/// Identities come from the recording, so `persist` has no effect.
impl TrackingDetector for ReplayDetector {
    fn track(&mut self, frame: &Frame, confidence: f32, _persist: bool) -> Result<Vec<Detection>> {
        Ok(self.replay(frame, confidence))
    }
}
