use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::FRAME_TIME_WINDOW;

/// Samples compared by the confidence trend.
const TREND_WINDOW: usize = 3;
/// Change in confidence that counts as a trend rather than noise.
const TREND_DELTA: f64 = 0.1;

/// Fixed-capacity FIFO: pushing at capacity evicts the oldest entry.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn with_items(capacity: usize, items: impl IntoIterator<Item = T>) -> Self {
        let mut history = Self::new(capacity);
        for item in items {
            history.push(item);
        }
        history
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn last(&self) -> Option<T> {
        self.items.back().copied()
    }

    /// Entry `n` places back from the newest (`0` is the newest).
    pub fn nth_back(&self, n: usize) -> Option<T> {
        self.items.iter().rev().nth(n).copied()
    }

    /// Up to `n` newest entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = T> + '_ {
        self.items.iter().skip(self.items.len().saturating_sub(n)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.items.iter().copied()
    }
}

/// Direction of the most recent confidence samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTrend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl ConfidenceTrend {
    /// Compares the first and last of the three newest samples against ±0.1.
    pub fn from_history(confidences: &BoundedHistory<f64>) -> Self {
        if confidences.len() < TREND_WINDOW {
            return ConfidenceTrend::InsufficientData;
        }
        let recent: Vec<f64> = confidences.recent(TREND_WINDOW).collect();
        let (first, last) = (recent[0], recent[TREND_WINDOW - 1]);
        if last > first + TREND_DELTA {
            ConfidenceTrend::Improving
        } else if last < first - TREND_DELTA {
            ConfidenceTrend::Declining
        } else {
            ConfidenceTrend::Stable
        }
    }
}

/// Raw per-session counters behind `TrackingStats`.
#[derive(Clone, Debug)]
pub struct Stats {
    pub total_frames: u64,
    pub processed_frames: u64,
    pub skipped_frames: u64,
    pub successful_frames: u64,
    pub frame_time_samples: BoundedHistory<Duration>,
    pub confidence_sum: f64,
    pub confidence_samples: u64,
    pub min_confidence: f64,
    pub max_confidence: f64,
}

impl Stats {
    /// Folds one processed frame's confidence into the running summary.
    pub fn record_confidence(&mut self, confidence: f64) {
        if self.confidence_samples == 0 {
            self.min_confidence = confidence;
            self.max_confidence = confidence;
        } else {
            self.min_confidence = self.min_confidence.min(confidence);
            self.max_confidence = self.max_confidence.max(confidence);
        }
        self.confidence_sum += confidence;
        self.confidence_samples += 1;
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_frames: 0,
            processed_frames: 0,
            skipped_frames: 0,
            successful_frames: 0,
            frame_time_samples: BoundedHistory::new(FRAME_TIME_WINDOW),
            confidence_sum: 0.0,
            confidence_samples: 0,
            min_confidence: 0.0,
            max_confidence: 0.0,
        }
    }
}

/// Mutable per-session state owned by the engine.
///
/// Created by `initialize`, mutated only by `track`, replaced wholesale on
/// the next `initialize`.
#[derive(Clone, Debug)]
pub struct TrackState {
    pub current_box: BoundingBox,
    pub history: BoundedHistory<BoundingBox>,
    pub confidence_history: BoundedHistory<f64>,
    pub frame_counter: u64,
    pub last_processed_frame_index: Option<u64>,
    pub consecutive_lost_count: u32,
    pub frame_size: (u32, u32),
    pub stats: Stats,
}

impl TrackState {
    /// Fresh state seeded with the user's box at the given confidence.
    pub fn seeded(
        bbox: BoundingBox,
        seed_confidence: f64,
        max_history: usize,
        frame_size: (u32, u32),
    ) -> Self {
        Self {
            current_box: bbox,
            history: BoundedHistory::with_items(max_history, [bbox]),
            confidence_history: BoundedHistory::with_items(max_history, [seed_confidence]),
            frame_counter: 0,
            last_processed_frame_index: None,
            consecutive_lost_count: 0,
            frame_size,
            stats: Stats::default(),
        }
    }

    pub fn record(&mut self, bbox: BoundingBox, confidence: f64) {
        self.history.push(bbox);
        self.confidence_history.push(confidence);
    }
}
