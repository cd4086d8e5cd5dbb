use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MAX_HISTORY, DEFAULT_MAX_LOST_FRAMES, DEFAULT_SCALES,
    DEFAULT_SKIP_INTERVAL, DEFAULT_TARGET_FPS, DEFAULT_TEMPLATE_SIZE,
};
use crate::tracking::domain::errors::ConfigError;

/// Constructor-time tracking parameters, immutable for an engine's lifetime.
///
/// Deserializes from JSON with every field optional; missing fields take the
/// [`Default`] values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Run full tracking every Nth frame; 1 processes every frame.
    pub skip_interval: usize,
    /// Pacing target for processed frames.
    pub target_fps: f64,
    /// Minimum template score accepted as a successful match.
    pub confidence_threshold: f64,
    /// Stored template resolution (width, height).
    pub template_size: (u32, u32),
    pub max_history: usize,
    /// Search padding around the last box, as a fraction of `max(w, h)`.
    pub search_margin: f64,
    /// Template scale factors tried per processed frame.
    pub scales: Vec<f64>,
    /// Match score required before the template adapts.
    pub template_update_threshold: f64,
    /// Mean of recent confidences also required before the template adapts.
    pub template_history_threshold: f64,
    /// Upper bound on the template EMA blend factor.
    pub template_learning_rate: f64,
    /// Per-axis displacement cap (px) when predicting through a lost frame.
    pub max_recovery_step: f64,
    /// Pixels a detector box may overhang the frame before it is rejected.
    pub boundary_tolerance: f64,
    /// Detector boxes at or below this width/height are rejected.
    pub min_box_size: f64,
    /// Consecutive failures before the engine reports `Lost`.
    pub max_lost_frames: u32,
    /// Sleep after fast processed frames to hold `target_fps`.
    pub throttle: bool,
}

/// Presets for the three speed/accuracy trade-offs the tracker ships with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerProfile {
    /// Every frame, wide search, three scales.
    Quality,
    /// Every other frame at 60 fps with a tighter search.
    Balanced,
    /// Every third frame at 90 fps, single scale, narrow search.
    Speed,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            skip_interval: DEFAULT_SKIP_INTERVAL,
            target_fps: DEFAULT_TARGET_FPS,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            template_size: DEFAULT_TEMPLATE_SIZE,
            max_history: DEFAULT_MAX_HISTORY,
            search_margin: 1.0,
            scales: DEFAULT_SCALES.to_vec(),
            template_update_threshold: 0.7,
            template_history_threshold: 0.6,
            template_learning_rate: 0.1,
            max_recovery_step: 20.0,
            boundary_tolerance: 0.0,
            min_box_size: 5.0,
            max_lost_frames: DEFAULT_MAX_LOST_FRAMES,
            throttle: true,
        }
    }
}

impl TrackerConfig {
    pub fn preset(profile: TrackerProfile) -> Self {
        match profile {
            TrackerProfile::Quality => Self::default(),
            TrackerProfile::Balanced => Self {
                skip_interval: 2,
                target_fps: 60.0,
                template_size: (127, 127),
                max_history: 5,
                search_margin: 0.5,
                min_box_size: 10.0,
                ..Self::default()
            },
            TrackerProfile::Speed => Self {
                skip_interval: 3,
                target_fps: 90.0,
                confidence_threshold: 0.3,
                search_margin: 0.25,
                scales: vec![1.0],
                template_update_threshold: 0.5,
                template_history_threshold: 0.0,
                template_learning_rate: 0.05,
                min_box_size: 10.0,
                ..Self::default()
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.skip_interval < 1 {
            return Err(ConfigError::SkipInterval);
        }
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(ConfigError::TargetFps(self.target_fps));
        }
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold < 1.0) {
            return Err(ConfigError::ConfidenceThreshold(self.confidence_threshold));
        }
        let (tw, th) = self.template_size;
        if tw == 0 || th == 0 {
            return Err(ConfigError::TemplateSize(tw, th));
        }
        if self.max_history < 2 {
            return Err(ConfigError::MaxHistory(self.max_history));
        }
        if self.scales.is_empty() || self.scales.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ConfigError::Scales);
        }
        check_range("search_margin", self.search_margin, 0.0, 4.0)?;
        check_range("template_update_threshold", self.template_update_threshold, 0.0, 1.0)?;
        check_range("template_history_threshold", self.template_history_threshold, 0.0, 1.0)?;
        check_range("template_learning_rate", self.template_learning_rate, 0.0, 1.0)?;
        check_range("max_recovery_step", self.max_recovery_step, 0.0, f64::MAX)?;
        check_range("boundary_tolerance", self.boundary_tolerance, 0.0, f64::MAX)?;
        check_range("min_box_size", self.min_box_size, 0.0, f64::MAX)?;
        Ok(())
    }

    /// Wall-clock budget per processed frame implied by `target_fps`.
    ///
    /// Saturates at `Duration::MAX` for rates too low to represent.
    pub fn target_frame_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.target_fps).unwrap_or(Duration::MAX)
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_default_is_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case::quality(TrackerProfile::Quality)]
    #[case::balanced(TrackerProfile::Balanced)]
    #[case::speed(TrackerProfile::Speed)]
    fn test_presets_are_valid(#[case] profile: TrackerProfile) {
        assert!(TrackerConfig::preset(profile).validate().is_ok());
    }

    #[test]
    fn test_speed_preset_skips_and_uses_single_scale() {
        let config = TrackerConfig::preset(TrackerProfile::Speed);
        assert_eq!(config.skip_interval, 3);
        assert_eq!(config.scales, vec![1.0]);
    }

    #[test]
    fn test_skip_interval_zero_rejected() {
        let config = TrackerConfig {
            skip_interval: 0,
            ..TrackerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SkipInterval));
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::one(1.0)]
    #[case::negative(-0.2)]
    fn test_confidence_threshold_bounds(#[case] threshold: f64) {
        let config = TrackerConfig {
            confidence_threshold: threshold,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConfidenceThreshold(_))
        ));
    }

    #[test]
    fn test_target_fps_must_be_positive() {
        let config = TrackerConfig {
            target_fps: 0.0,
            ..TrackerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::TargetFps(_))));
    }

    #[test]
    fn test_max_history_below_two_rejected() {
        let config = TrackerConfig {
            max_history: 1,
            ..TrackerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MaxHistory(1)));
    }

    #[test]
    fn test_empty_scales_rejected() {
        let config = TrackerConfig {
            scales: vec![],
            ..TrackerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Scales));
    }

    #[test]
    fn test_zero_template_size_rejected() {
        let config = TrackerConfig {
            template_size: (0, 64),
            ..TrackerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TemplateSize(0, 64)));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let config = TrackerConfig {
            boundary_tolerance: -1.0,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                name: "boundary_tolerance",
                ..
            })
        ));
    }

    #[test]
    fn test_target_frame_interval() {
        let config = TrackerConfig {
            target_fps: 50.0,
            ..TrackerConfig::default()
        };
        assert_relative_eq!(config.target_frame_interval().as_secs_f64(), 0.02);
    }

    #[test]
    fn test_tiny_target_fps_saturates_interval() {
        let config = TrackerConfig {
            target_fps: 1e-30,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.target_frame_interval(), Duration::MAX);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"skip_interval": 4, "throttle": false}"#).unwrap();
        assert_eq!(config.skip_interval, 4);
        assert!(!config.throttle);
        assert_eq!(config.template_size, DEFAULT_TEMPLATE_SIZE);
    }

    #[test]
    fn test_profile_deserializes_lowercase() {
        let profile: TrackerProfile = serde_json::from_str(r#""balanced""#).unwrap();
        assert_eq!(profile, TrackerProfile::Balanced);
    }
}
