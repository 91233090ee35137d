// src/analysis/video_analyzer.rs
//
// Track-based event counter for video.
//
// Per frame:
//   1. refresh the cached road width on frame 1 and every Nth frame
//   2. pull tracked pothole boxes from the tracker collaborator
//   3. update each identity's last center and score first downward crossings
//
// Detector and tracker failures degrade to "no detections this frame".
// Only the duration guard aborts a run.

use super::crossing_tracker::CrossingTracker;
use super::metrics::{VideoMetrics, VideoStats};
use super::road_measurement::RoadWidthSampler;
use crate::detection::{Detector, FrameSource, TrackingDetector};
use crate::error::{AnalysisError, Result};
use crate::severity::EventScorer;
use crate::types::{Config, Detection, SeverityReport, TrackId, VideoConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossingEvent {
    pub track_id: TrackId,
    pub frame_index: u64,
    /// Width ratio or box area, depending on the event basis
    pub measure: f32,
    pub road_width: f32,
    pub points: u32,
}

/// Running video score. Only ever grows within a run.
#[derive(Debug, Clone, Default)]
pub struct SeverityAccumulator {
    total: u64,
    events: Vec<CrossingEvent>,
}

impl SeverityAccumulator {
    pub fn add(&mut self, event: CrossingEvent) {
        self.total += event.points as u64;
        self.events.push(event);
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn events(&self) -> &[CrossingEvent] {
        &self.events
    }
}

#[derive(Debug, Clone)]
pub struct VideoAnalysis {
    pub report: SeverityReport,
    pub events: Vec<CrossingEvent>,
    pub stats: VideoStats,
}

/// Mutable state of one video run. Owned by exactly one run and advanced
/// strictly in frame order.
pub struct VideoSession {
    config: VideoConfig,
    crossings: CrossingTracker,
    road: RoadWidthSampler,
    scorer: EventScorer,
    accumulator: SeverityAccumulator,
    metrics: VideoMetrics,
}

impl VideoSession {
    pub fn new(config: &Config) -> Self {
        let video = config.video.clone();
        Self {
            crossings: CrossingTracker::new(video.max_tracked_identities),
            road: RoadWidthSampler::new(video.road_check_interval, video.initial_road_width),
            scorer: EventScorer::new(
                config.scoring.event_basis,
                config.scoring.event_tiers.clone(),
            ),
            accumulator: SeverityAccumulator::default(),
            metrics: VideoMetrics::new(),
            config: video,
        }
    }

    pub fn road_refresh_due(&self, frame_index: u64) -> bool {
        self.road.is_due(frame_index)
    }

    pub fn update_road(&mut self, frame_index: u64, road: &[Detection]) {
        self.road.refresh(frame_index, road);
    }

    pub fn record_road_failure(&mut self) {
        self.road.record_miss();
        self.metrics.road_failures += 1;
    }

    pub fn record_tracker_failure(&mut self) {
        self.metrics.tracker_failures += 1;
    }

    pub fn road_width(&self) -> f32 {
        self.road.current_width()
    }

    /// Reference line row for a frame of `frame_height` pixels.
    pub fn line_y(&self, frame_height: usize) -> f32 {
        (frame_height as f64 * self.config.line_position).floor() as f32
    }

    /// Advance identity state with one frame of tracked detections and
    /// return the crossing events it produced.
    pub fn process_detections(
        &mut self,
        frame_index: u64,
        frame_height: usize,
        detections: &[Detection],
    ) -> Vec<CrossingEvent> {
        self.metrics.frames_processed += 1;
        if !detections.is_empty() {
            self.metrics.frames_with_potholes += 1;
        }

        let line_y = self.line_y(frame_height);
        let mut events = Vec::new();

        for det in detections {
            let Some(track_id) = det.track_id else {
                self.metrics.detections_without_identity += 1;
                continue;
            };
            let center_y = det.bbox.center_y().floor();

            if !self.crossings.observe(track_id, center_y, line_y, frame_index) {
                continue;
            }

            let road_width = self.road.current_width();
            let measure = self.scorer.measure(&det.bbox, road_width);
            let points = self.scorer.points(measure);
            let event = CrossingEvent {
                track_id,
                frame_index,
                measure,
                road_width,
                points,
            };
            info!(
                " -> Pothole ID {} crossed at frame {} | measure: {:.2} | pts: {}",
                track_id, frame_index, measure, points
            );
            self.accumulator.add(event);
            events.push(event);
        }

        events
    }

    pub fn report(&self) -> SeverityReport {
        SeverityReport::new(
            self.crossings.counted() as u32,
            u32::try_from(self.accumulator.total()).unwrap_or(u32::MAX),
        )
    }

    pub fn finish(self) -> VideoAnalysis {
        let stats = self.metrics.summary(
            self.road.refreshes(),
            self.road.misses(),
            self.crossings.tracked(),
            self.crossings.evicted(),
        );
        VideoAnalysis {
            report: self.report(),
            events: self.accumulator.events().to_vec(),
            stats,
        }
    }
}

/// Video pipeline over an injected tracker and road detector.
pub struct VideoAnalyzer<T, R> {
    tracker: T,
    road_detector: R,
    config: Config,
}

impl<T: TrackingDetector, R: Detector> VideoAnalyzer<T, R> {
    pub fn new(tracker: T, road_detector: R, config: Config) -> Self {
        Self {
            tracker,
            road_detector,
            config,
        }
    }

    pub fn analyze<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<VideoAnalysis> {
        let info = source.info();
        let duration = info.duration_secs();
        info!(
            "Video: {}x{} @ {:.1} FPS, {} frames, {:.2}s",
            info.width, info.height, info.fps, info.total_frames, duration
        );

        if let Some(limit) = self.config.video.max_duration_secs {
            if duration > limit {
                warn!(
                    "Video duration {:.2}s exceeds the {:.2}s limit",
                    duration, limit
                );
                return Err(AnalysisError::DurationExceeded {
                    duration_secs: duration,
                    limit_secs: limit,
                });
            }
        }

        let video = self.config.video.clone();
        let mut session = VideoSession::new(&self.config);
        let mut frame_count: u64 = 0;

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!("Frame read failed after {} frames: {:#}", frame_count, e);
                    break;
                }
            };
            frame_count += 1;

            if session.road_refresh_due(frame_count) {
                match self.road_detector.detect(&frame, video.road_confidence) {
                    Ok(road) => session.update_road(frame_count, &road),
                    Err(e) => {
                        warn!("Road detection failed at frame {}: {:#}", frame_count, e);
                        session.record_road_failure();
                    }
                }
            }

            let tracked = match self.tracker.track(&frame, video.pothole_confidence, true) {
                Ok(tracked) => tracked,
                Err(e) => {
                    warn!("Pothole tracking failed at frame {}: {:#}", frame_count, e);
                    session.record_tracker_failure();
                    Vec::new()
                }
            };
            debug!("Frame {}: {} tracked potholes", frame_count, tracked.len());

            session.process_detections(frame_count, frame.height, &tracked);

            if video.progress_log_interval > 0 && frame_count % video.progress_log_interval == 0 {
                info!(
                    "Processed {}/{} frames | road width {:.0}px",
                    frame_count,
                    info.total_frames,
                    session.road_width()
                );
            }
        }

        let analysis = session.finish();
        analysis.stats.log();
        info!(
            "Pothole count: {} | severity score: {} ({})",
            analysis.report.pothole_count,
            analysis.report.severity_score,
            analysis.report.status().as_str()
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, EventBasis, Frame, VideoInfo};
    use anyhow::anyhow;

    const HEIGHT: usize = 720; // line at floor(720 * 0.65) = 468

    fn tracked(id: TrackId, x1: f32, x2: f32, cy: f32) -> Detection {
        Detection::from_box(BoundingBox::new(x1, cy - 20.0, x2, cy + 20.0)).with_track_id(id)
    }

    fn road(width: f32) -> Detection {
        Detection::from_box(BoundingBox::new(0.0, 300.0, width, 720.0))
    }

    #[test]
    fn test_single_crossing_scores_small_tier() {
        let mut session = VideoSession::new(&Config::default());
        session.process_detections(1, HEIGHT, &[tracked(1, 100.0, 200.0, 400.0)]);
        let events = session.process_detections(2, HEIGHT, &[tracked(1, 100.0, 200.0, 470.0)]);

        assert_eq!(events.len(), 1);
        assert!((events[0].measure - 0.1).abs() < 1e-6);
        assert_eq!(session.report(), SeverityReport::new(1, 2));
    }

    #[test]
    fn test_uses_refreshed_road_width() {
        let mut session = VideoSession::new(&Config::default());
        session.update_road(1, &[road(400.0)]);
        session.process_detections(1, HEIGHT, &[tracked(1, 0.0, 100.0, 400.0)]);
        let events = session.process_detections(2, HEIGHT, &[tracked(1, 0.0, 100.0, 470.0)]);
        // 100 / 400 = 0.25 → medium
        assert_eq!(events[0].points, 5);
        assert_eq!(events[0].road_width, 400.0);
    }

    #[test]
    fn test_repeat_crossings_do_not_accumulate() {
        let mut session = VideoSession::new(&Config::default());
        for (frame, cy) in [(1, 400.0), (2, 470.0), (3, 400.0), (4, 470.0), (5, 500.0)] {
            session.process_detections(frame, HEIGHT, &[tracked(7, 0.0, 500.0, cy)]);
        }
        assert_eq!(session.report(), SeverityReport::new(1, 15));
    }

    #[test]
    fn test_detections_without_identity_are_ignored() {
        let mut session = VideoSession::new(&Config::default());
        let anonymous = Detection::from_box(BoundingBox::new(0.0, 380.0, 100.0, 420.0));
        session.process_detections(1, HEIGHT, &[anonymous.clone()]);
        session.process_detections(2, HEIGHT, &[anonymous]);
        let analysis = session.finish();
        assert_eq!(analysis.report, SeverityReport::new(0, 0));
        assert_eq!(analysis.stats.detections_without_identity, 2);
    }

    #[test]
    fn test_box_area_basis() {
        let mut config = Config::default();
        config.scoring.event_basis = EventBasis::BoxArea;
        let mut session = VideoSession::new(&config);
        // 100 x 40 = 4000px² → medium
        session.process_detections(1, HEIGHT, &[tracked(1, 0.0, 100.0, 400.0)]);
        session.process_detections(2, HEIGHT, &[tracked(1, 0.0, 100.0, 470.0)]);
        assert_eq!(session.report().severity_score, 5);
    }

    // ------------------------------------------------------------------
    // Full analyzer over scripted collaborators
    // ------------------------------------------------------------------

    struct ScriptedSource {
        info: VideoInfo,
        remaining: u64,
        next_index: u64,
        reads: u64,
        fail_on_read: Option<u64>,
    }

    impl ScriptedSource {
        fn new(fps: f64, total_frames: u64) -> Self {
            Self {
                info: VideoInfo {
                    fps,
                    total_frames,
                    width: 1280,
                    height: HEIGHT,
                },
                remaining: total_frames,
                next_index: 1,
                reads: 0,
                fail_on_read: None,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn info(&self) -> VideoInfo {
            self.info
        }

        fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
            self.reads += 1;
            if self.fail_on_read == Some(self.reads) {
                return Err(anyhow!("corrupt packet"));
            }
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            let frame = Frame {
                data: Vec::new(),
                width: self.info.width,
                height: self.info.height,
                index: self.next_index,
            };
            self.next_index += 1;
            Ok(Some(frame))
        }
    }

    /// One pothole moving down 10px per frame from y=420.
    struct DescendingPothole {
        fail_on: Option<u64>,
    }

    impl TrackingDetector for DescendingPothole {
        fn track(
            &mut self,
            frame: &Frame,
            _confidence: f32,
            _persist: bool,
        ) -> anyhow::Result<Vec<Detection>> {
            if self.fail_on == Some(frame.index) {
                return Err(anyhow!("inference failed"));
            }
            let cy = 420.0 + 10.0 * (frame.index as f32 - 1.0);
            Ok(vec![tracked(3, 0.0, 350.0, cy)])
        }
    }

    /// Road width by frame index; `None` means no road found.
    struct ScriptedRoad {
        widths: Vec<(u64, Option<f32>)>,
        calls: Vec<u64>,
    }

    impl Detector for ScriptedRoad {
        fn detect(&mut self, frame: &Frame, _confidence: f32) -> anyhow::Result<Vec<Detection>> {
            self.calls.push(frame.index);
            match self.widths.iter().find(|(i, _)| *i == frame.index) {
                Some((_, Some(w))) => Ok(vec![road(*w)]),
                Some((_, None)) => Ok(Vec::new()),
                None => Err(anyhow!("no road model output")),
            }
        }
    }

    #[test]
    fn test_duration_guard_fails_before_reading() {
        let mut source = ScriptedSource::new(30.0, 360); // 12s
        let mut analyzer = VideoAnalyzer::new(
            DescendingPothole { fail_on: None },
            ScriptedRoad {
                widths: vec![],
                calls: vec![],
            },
            Config::default(),
        );

        let err = analyzer.analyze(&mut source).unwrap_err();
        assert!(matches!(err, AnalysisError::DurationExceeded { .. }));
        assert_eq!(source.reads, 0);
    }

    #[test]
    fn test_duration_guard_can_be_disabled() {
        let mut config = Config::default();
        config.video.max_duration_secs = None;
        let mut source = ScriptedSource::new(30.0, 360);
        let mut analyzer = VideoAnalyzer::new(
            DescendingPothole { fail_on: None },
            ScriptedRoad {
                widths: vec![(1, Some(1000.0))],
                calls: vec![],
            },
            config,
        );
        assert!(analyzer.analyze(&mut source).is_ok());
    }

    #[test]
    fn test_road_refresh_schedule_and_retention() {
        let mut source = ScriptedSource::new(30.0, 60);
        let mut analyzer = VideoAnalyzer::new(
            DescendingPothole { fail_on: None },
            ScriptedRoad {
                widths: vec![(1, Some(1000.0)), (30, None)],
                calls: vec![],
            },
            Config::default(),
        );

        let analysis = analyzer.analyze(&mut source).unwrap();
        // frame 60 has no scripted output and errors: width is retained
        assert_eq!(analyzer.road_detector.calls, vec![1, 30, 60]);
        assert_eq!(analysis.stats.road_refreshes, 1);
        assert_eq!(analysis.stats.road_refresh_misses, 2);
        assert_eq!(analysis.stats.road_failures, 1);

        // crosses 468 between frame 5 (460) and 6 (470): 350/1000 → large
        assert_eq!(analysis.events.len(), 1);
        assert_eq!(analysis.events[0].frame_index, 6);
        assert_eq!(analysis.report, SeverityReport::new(1, 15));
    }

    #[test]
    fn test_tracker_failure_skips_frame_only() {
        let mut source = ScriptedSource::new(30.0, 10);
        let mut analyzer = VideoAnalyzer::new(
            DescendingPothole { fail_on: Some(6) },
            ScriptedRoad {
                widths: vec![(1, Some(1000.0))],
                calls: vec![],
            },
            Config::default(),
        );

        let analysis = analyzer.analyze(&mut source).unwrap();
        // frame 6 lost; the crossing is seen on frame 7 (460 → 480)
        assert_eq!(analysis.stats.tracker_failures, 1);
        assert_eq!(analysis.stats.frames_processed, 10);
        assert_eq!(analysis.events[0].frame_index, 7);
        assert_eq!(analysis.report.pothole_count, 1);
    }

    #[test]
    fn test_read_failure_ends_stream_with_partial_result() {
        let mut source = ScriptedSource::new(30.0, 10);
        source.fail_on_read = Some(7);
        let mut analyzer = VideoAnalyzer::new(
            DescendingPothole { fail_on: None },
            ScriptedRoad {
                widths: vec![(1, Some(1000.0))],
                calls: vec![],
            },
            Config::default(),
        );

        let analysis = analyzer.analyze(&mut source).unwrap();
        // frames 1..=6 decoded, crossing on frame 6 (460 → 470) kept
        assert_eq!(source.reads, 7);
        assert_eq!(analysis.stats.frames_processed, 6);
        assert_eq!(analysis.events.len(), 1);
        assert_eq!(analysis.report, SeverityReport::new(1, 15));
    }
}
