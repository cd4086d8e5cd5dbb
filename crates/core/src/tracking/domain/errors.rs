use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;

/// Session-setup failures surfaced by `TrackingEngine::initialize`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InitError {
    #[error("invalid seed box {bbox:?} for {frame_w}x{frame_h} frame")]
    InvalidBox {
        bbox: BoundingBox,
        frame_w: u32,
        frame_h: u32,
    },
    #[error("no tracking backend could be initialized: detector unavailable or failed and template extraction was empty")]
    NoBackend,
}

/// Hard per-call failure of `TrackingEngine::track`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TrackError {
    #[error("track() called before a successful initialize()")]
    NotInitialized,
}

/// Soft failure of one cascade tier on a processed frame.
///
/// Never leaves the engine as an error; it carries the confidence that
/// the engine reports alongside the last known position.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackingFailure {
    #[error("detector failed: {0}")]
    Detector(String),
    #[error("detector box {0:?} rejected by bounds check")]
    RejectedBox(BoundingBox),
    #[error("no template available")]
    NoTemplate,
    #[error("search region smaller than template")]
    SearchRegionTooSmall,
    #[error("best template score {0:.3} below threshold")]
    LowScore(f64),
}

impl TrackingFailure {
    /// Confidence to report for a frame that failed at this tier.
    pub fn confidence(&self) -> f64 {
        match self {
            TrackingFailure::Detector(_) | TrackingFailure::RejectedBox(_) => 0.2,
            TrackingFailure::NoTemplate => 0.0,
            TrackingFailure::SearchRegionTooSmall => 0.1,
            TrackingFailure::LowScore(score) => score.clamp(0.0, 1.0),
        }
    }
}

/// Rejected engine configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("skip_interval must be >= 1")]
    SkipInterval,
    #[error("target_fps must be > 0, got {0}")]
    TargetFps(f64),
    #[error("confidence_threshold must be in (0, 1), got {0}")]
    ConfidenceThreshold(f64),
    #[error("template_size must be non-zero, got {0}x{1}")]
    TemplateSize(u32, u32),
    #[error("max_history must be >= 2, got {0}")]
    MaxHistory(usize),
    #[error("scales must be non-empty and positive")]
    Scales,
    #[error("{name} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::detector(TrackingFailure::Detector("occluded".into()), 0.2)]
    #[case::rejected(TrackingFailure::RejectedBox(BoundingBox::new(0.0, 0.0, 0.0, 0.0)), 0.2)]
    #[case::no_template(TrackingFailure::NoTemplate, 0.0)]
    #[case::too_small(TrackingFailure::SearchRegionTooSmall, 0.1)]
    #[case::low_score(TrackingFailure::LowScore(0.27), 0.27)]
    #[case::negative_score(TrackingFailure::LowScore(-0.4), 0.0)]
    fn test_failure_confidence(#[case] failure: TrackingFailure, #[case] expected: f64) {
        assert_relative_eq!(failure.confidence(), expected);
    }

    #[test]
    fn test_invalid_box_message_names_frame() {
        let err = InitError::InvalidBox {
            bbox: BoundingBox::new(700.0, 10.0, 50.0, 50.0),
            frame_w: 640,
            frame_h: 480,
        };
        assert!(err.to_string().contains("640x480"));
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::OutOfRange {
            name: "search_margin",
            value: 9.0,
            min: 0.0,
            max: 4.0,
        };
        assert_eq!(err.to_string(), "search_margin must be in [0, 4], got 9");
    }
}
