// src/analysis/crossing_tracker.rs
//
// Per-identity line-crossing state for the video pipeline.
//
//   Unseen ──first sighting──▶ Seen(last_y) ──downward crossing──▶ Counted
//
// A crossing is `previous_y < line_y && current_y >= line_y`. Counted is
// terminal: later crossings in either direction never score again.

use crate::types::TrackId;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackPhase {
    Unseen,
    Seen { last_y: f32 },
    Counted,
}

#[derive(Debug, Clone, Copy)]
struct LastSeen {
    center_y: f32,
    frame_index: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CrossingTracker {
    last_positions: HashMap<TrackId, LastSeen>,
    counted: HashSet<TrackId>,
    /// `None` remembers every identity for the lifetime of the run
    max_identities: Option<usize>,
    evicted: u64,
}

impl CrossingTracker {
    pub fn new(max_identities: Option<usize>) -> Self {
        Self {
            max_identities,
            ..Self::default()
        }
    }

    /// Record `track_id` at `center_y` and report whether this observation
    /// is the identity's first downward crossing of `line_y`.
    pub fn observe(&mut self, track_id: TrackId, center_y: f32, line_y: f32, frame_index: u64) -> bool {
        let newly_counted = match self.phase(track_id) {
            TrackPhase::Seen { last_y } => last_y < line_y && center_y >= line_y,
            TrackPhase::Unseen | TrackPhase::Counted => false,
        };
        if newly_counted {
            self.counted.insert(track_id);
        }

        if !self.last_positions.contains_key(&track_id) {
            self.make_room();
        }
        self.last_positions.insert(
            track_id,
            LastSeen {
                center_y,
                frame_index,
            },
        );

        newly_counted
    }

    pub fn phase(&self, track_id: TrackId) -> TrackPhase {
        if self.counted.contains(&track_id) {
            TrackPhase::Counted
        } else if let Some(seen) = self.last_positions.get(&track_id) {
            TrackPhase::Seen {
                last_y: seen.center_y,
            }
        } else {
            TrackPhase::Unseen
        }
    }

    pub fn counted(&self) -> usize {
        self.counted.len()
    }

    pub fn tracked(&self) -> usize {
        self.last_positions.len()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Evict least-recently-seen identities until a new one fits, preferring
    /// identities that have not been counted yet. Evicted counted identities
    /// stay in the counted set.
    fn make_room(&mut self) {
        let Some(capacity) = self.max_identities else {
            return;
        };

        while self.last_positions.len() >= capacity.max(1) {
            let victim = self
                .last_positions
                .iter()
                .filter(|(id, _)| !self.counted.contains(*id))
                .min_by_key(|(_, seen)| seen.frame_index)
                .or_else(|| {
                    self.last_positions
                        .iter()
                        .min_by_key(|(_, seen)| seen.frame_index)
                })
                .map(|(id, _)| *id);

            match victim {
                Some(id) => {
                    self.last_positions.remove(&id);
                    self.evicted += 1;
                    debug!("Evicted track {} from position history", id);
                }
                None => break,
            }
        }
    }
}
