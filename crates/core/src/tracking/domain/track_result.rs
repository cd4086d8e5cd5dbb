use std::time::Duration;

use serde::Serialize;

use crate::shared::bounding_box::BoundingBox;
use crate::tracking::domain::track_state::ConfidenceTrend;

/// Cascade tier that produced a frame's box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    Detector,
    Template,
    /// Loss-recovery extrapolation after every tier failed.
    Prediction,
    /// Skipped frame answered by extrapolation.
    Interpolation,
}

/// Engine lifecycle as seen by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Initialized,
    Tracking,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrackInfo {
    /// 0-based count of `track()` calls in this session.
    pub frame_number: u64,
    pub skipped: bool,
    pub lost_frames: u32,
    pub confidence_trend: ConfidenceTrend,
    pub source: TrackSource,
    /// Processing time before any throttling sleep.
    #[serde(rename = "processing_time_ms", serialize_with = "serialize_millis")]
    pub processing_time: Duration,
}

/// Outcome of one `track()` call.
///
/// `success == false` is a soft failure: `bbox` still holds a usable
/// position estimate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrackResult {
    pub success: bool,
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub info: TrackInfo,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}
