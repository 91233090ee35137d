// src/detection/iou_tracker.rs
//
// Greedy IoU tracker that turns a plain per-frame detector into a
// TrackingDetector for backends without a native multi-object tracker.
//
//   - highest-IoU pairs are matched first, each track and detection once
//   - unmatched tracks coast for `max_coast_frames` before deletion
//   - unmatched detections open new tracks with fresh identities

use super::{Detector, TrackingDetector};
use crate::types::{BoundingBox, Detection, Frame, TrackId};
use anyhow::Result;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct IouTrackerConfig {
    /// Minimum IoU to match a detection to an existing track
    pub min_iou: f32,
    /// Frames a track survives without a detection before deletion
    pub max_coast_frames: u32,
}

impl Default for IouTrackerConfig {
    fn default() -> Self {
        Self {
            min_iou: 0.2,
            max_coast_frames: 15,
        }
    }
}

#[derive(Debug, Clone)]
struct TrackSlot {
    id: TrackId,
    bbox: BoundingBox,
    frames_since_hit: u32,
}

pub struct IouTracker<D> {
    detector: D,
    config: IouTrackerConfig,
    tracks: Vec<TrackSlot>,
    next_id: TrackId,
}

impl<D: Detector> IouTracker<D> {
    pub fn new(detector: D, config: IouTrackerConfig) -> Self {
        Self {
            detector,
            config,
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    pub fn active_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Assign identities to `detections`, updating the track table.
    pub fn associate(&mut self, detections: Vec<Detection>) -> Vec<Detection> {
        let mut matched_tracks = vec![false; self.tracks.len()];
        let mut assigned: Vec<Option<TrackId>> = vec![None; detections.len()];

        let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            for (di, det) in detections.iter().enumerate() {
                let score = track.bbox.iou(&det.bbox);
                if score >= self.config.min_iou {
                    pairs.push((ti, di, score));
                }
            }
        }
        pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

        for (ti, di, _) in pairs {
            if matched_tracks[ti] || assigned[di].is_some() {
                continue;
            }
            matched_tracks[ti] = true;
            let track = &mut self.tracks[ti];
            track.bbox = detections[di].bbox;
            track.frames_since_hit = 0;
            assigned[di] = Some(track.id);
        }

        for (track, matched) in self.tracks.iter_mut().zip(&matched_tracks) {
            if !matched {
                track.frames_since_hit += 1;
            }
        }
        let max_coast = self.config.max_coast_frames;
        let before = self.tracks.len();
        self.tracks.retain(|t| t.frames_since_hit <= max_coast);
        if self.tracks.len() < before {
            debug!("Dropped {} stale tracks", before - self.tracks.len());
        }

        detections
            .into_iter()
            .zip(assigned)
            .map(|(det, id)| {
                let id = match id {
                    Some(id) => id,
                    None => {
                        let id = self.next_id;
                        self.next_id += 1;
                        self.tracks.push(TrackSlot {
                            id,
                            bbox: det.bbox,
                            frames_since_hit: 0,
                        });
                        id
                    }
                };
                det.with_track_id(id)
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
    }
}

impl<D: Detector> TrackingDetector for IouTracker<D> {
    fn track(&mut self, frame: &Frame, confidence: f32, persist: bool) -> Result<Vec<Detection>> {
        if !persist {
            self.reset();
        }
        let detections = self.detector.detect(frame, confidence)?;
        Ok(self.associate(detections))
    }
}
