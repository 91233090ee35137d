// src/detection/mod.rs
//
// Seams to the detector collaborators. The pipelines only ever see these
// traits; model loading and inference live in the backends.

mod iou_tracker;
mod replay;

pub use iou_tracker::{IouTracker, IouTrackerConfig};
pub use replay::{RecordedFrame, Recording, ReplayDetector, ReplaySource};

use crate::types::{Detection, Frame, VideoInfo};
use anyhow::Result;

/// Runs a detection model on one image or frame.
pub trait Detector {
    fn detect(&mut self, frame: &Frame, confidence: f32) -> Result<Vec<Detection>>;
}

/// Runs a detection model plus a multi-object tracker. Every returned
/// detection should carry a `track_id` that stays stable across frames for
/// the same physical object while `persist` is set.
pub trait TrackingDetector {
    fn track(&mut self, frame: &Frame, confidence: f32, persist: bool) -> Result<Vec<Detection>>;
}

/// Sequential frame decoder for one video.
pub trait FrameSource {
    fn info(&self) -> VideoInfo;

    /// `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &Frame, confidence: f32) -> Result<Vec<Detection>> {
        (**self).detect(frame, confidence)
    }
}

impl<T: TrackingDetector + ?Sized> TrackingDetector for Box<T> {
    fn track(&mut self, frame: &Frame, confidence: f32, persist: bool) -> Result<Vec<Detection>> {
        (**self).track(frame, confidence, persist)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn info(&self) -> VideoInfo {
        (**self).info()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}
