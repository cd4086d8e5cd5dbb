use std::time::Instant;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::SEED_CONFIDENCE;
use crate::shared::frame::Frame;
use crate::tracking::domain::detector::{Detection, Detector};
use crate::tracking::domain::errors::{ConfigError, InitError, TrackError, TrackingFailure};
use crate::tracking::domain::frame_scheduler::FrameScheduler;
use crate::tracking::domain::motion_predictor::MotionPredictor;
use crate::tracking::domain::track_result::{EngineState, TrackInfo, TrackResult, TrackSource};
use crate::tracking::domain::track_state::{BoundedHistory, ConfidenceTrend, TrackState};
use crate::tracking::domain::tracker_config::{TrackerConfig, TrackerProfile};
use crate::tracking::domain::tracking_stats::TrackingStats;
use crate::tracking::infrastructure::template_matcher::TemplateMatcher;

/// Single-target tracking session.
///
/// Each processed frame runs the cascade detector → template match →
/// motion prediction; skipped frames are interpolated. A failed frame never
/// moves the last accepted position, so the template search stays anchored
/// where the target was last seen.
pub struct TrackingEngine {
    config: TrackerConfig,
    detector: Option<Box<dyn Detector>>,
    detector_ready: bool,
    matcher: TemplateMatcher,
    predictor: MotionPredictor,
    scheduler: FrameScheduler,
    state: Option<TrackState>,
}

impl TrackingEngine {
    pub fn new(
        config: TrackerConfig,
        detector: Option<Box<dyn Detector>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            matcher: TemplateMatcher::new(&config),
            predictor: MotionPredictor::new(config.max_recovery_step),
            scheduler: FrameScheduler::new(
                config.skip_interval,
                config.target_frame_interval(),
                config.throttle,
            ),
            config,
            detector,
            detector_ready: false,
            state: None,
        })
    }

    pub fn with_profile(
        profile: TrackerProfile,
        detector: Option<Box<dyn Detector>>,
    ) -> Result<Self, ConfigError> {
        Self::new(TrackerConfig::preset(profile), detector)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Starts a new session on `frame` with the user-selected `bbox`.
    ///
    /// Discards any previous session. The template is extracted even when
    /// the detector initializes, so matching is available as a fallback.
    pub fn initialize(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<(), InitError> {
        let (frame_w, frame_h) = (frame.width(), frame.height());
        if !bbox.is_valid() || !bbox.fits_within(frame_w, frame_h) {
            return Err(InitError::InvalidBox {
                bbox,
                frame_w,
                frame_h,
            });
        }

        self.reset();

        if let Some(detector) = self.detector.as_mut() {
            match detector.initialize(frame, &bbox) {
                Ok(()) => self.detector_ready = true,
                Err(e) => log::warn!(
                    "{} failed to initialize, falling back to template matching: {e}",
                    detector.name()
                ),
            }
        }
        if !self.matcher.extract(frame, &bbox) {
            log::warn!("Template extraction failed for {:?}", bbox);
        }
        if !self.detector_ready && !self.matcher.has_template() {
            return Err(InitError::NoBackend);
        }

        self.state = Some(TrackState::seeded(
            bbox,
            SEED_CONFIDENCE,
            self.config.max_history,
            (frame_w, frame_h),
        ));
        log::info!(
            "Tracking initialized at [{:.1}, {:.1}, {:.1}, {:.1}] on {}x{} frame (detector: {}, skip interval: {})",
            bbox.x,
            bbox.y,
            bbox.w,
            bbox.h,
            frame_w,
            frame_h,
            self.detector_ready,
            self.config.skip_interval
        );
        Ok(())
    }

    /// Tracks the target into the next frame of the sequence.
    pub fn track(&mut self, frame: &Frame) -> Result<TrackResult, TrackError> {
        let started = Instant::now();
        let state = self.state.as_mut().ok_or(TrackError::NotInitialized)?;
        let frame_number = state.frame_counter;
        state.frame_counter += 1;
        state.stats.total_frames += 1;
        let (frame_w, frame_h) = state.frame_size;

        if !self
            .scheduler
            .decide(frame_number, state.last_processed_frame_index)
        {
            state.stats.skipped_frames += 1;
            let predicted =
                self.predictor
                    .predict(&state.history, &state.confidence_history, state.current_box);
            let bbox = predicted.bbox.clamp_to(frame_w, frame_h);
            log::debug!("Frame {frame_number}: skipped, interpolated to {:?}", bbox);
            return Ok(TrackResult {
                success: true,
                bbox,
                confidence: predicted.confidence,
                info: TrackInfo {
                    frame_number,
                    skipped: true,
                    lost_frames: state.consecutive_lost_count,
                    confidence_trend: ConfidenceTrend::from_history(&state.confidence_history),
                    source: TrackSource::Interpolation,
                    processing_time: started.elapsed(),
                },
            });
        }

        state.last_processed_frame_index = Some(frame_number);
        state.stats.processed_frames += 1;

        let detected = match self.detector.as_mut() {
            Some(detector) if self.detector_ready => Some(locate_with_detector(
                detector.as_mut(),
                frame,
                &self.config,
                (frame_w, frame_h),
            )),
            _ => None,
        };
        let outcome = match detected {
            Some(Ok(detection)) => Ok((detection.bbox, detection.confidence, TrackSource::Detector)),
            other => {
                if let Some(Err(failure)) = other {
                    log::debug!("Frame {frame_number}: {failure}, trying template");
                }
                self.matcher
                    .locate(frame, &state.current_box)
                    .map(|found| {
                        if self
                            .matcher
                            .maybe_update(frame, &found, &state.confidence_history)
                        {
                            log::debug!("Frame {frame_number}: template updated");
                        }
                        (
                            found.bbox.clamp_to(frame_w, frame_h),
                            found.score,
                            TrackSource::Template,
                        )
                    })
            }
        };

        let (success, bbox, confidence, source) = match outcome {
            Ok((bbox, confidence, source)) => {
                state.current_box = bbox;
                state.consecutive_lost_count = 0;
                state.stats.successful_frames += 1;
                (true, bbox, confidence, source)
            }
            Err(failure) => {
                let recovery = self
                    .predictor
                    .predict_recovery(&state.history, state.current_box);
                state.consecutive_lost_count += 1;
                log::debug!("Frame {frame_number}: {failure}, predicting position");
                if state.consecutive_lost_count == self.config.max_lost_frames {
                    log::warn!(
                        "Target lost for {} consecutive frames, holding last position",
                        state.consecutive_lost_count
                    );
                }
                (
                    false,
                    recovery.bbox.clamp_to(frame_w, frame_h),
                    failure.confidence().min(recovery.confidence),
                    TrackSource::Prediction,
                )
            }
        };

        state.record(bbox, confidence);
        state.stats.record_confidence(confidence);
        let processing_time = started.elapsed();
        state.stats.frame_time_samples.push(processing_time);

        let info = TrackInfo {
            frame_number,
            skipped: false,
            lost_frames: state.consecutive_lost_count,
            confidence_trend: ConfidenceTrend::from_history(&state.confidence_history),
            source,
            processing_time,
        };
        self.scheduler.throttle(processing_time);

        Ok(TrackResult {
            success,
            bbox,
            confidence,
            info,
        })
    }

    /// Snapshot of the session's statistics; zeros before `initialize`.
    pub fn get_stats(&self) -> TrackingStats {
        self.state
            .as_ref()
            .map(|s| TrackingStats::from_stats(&s.stats, self.scheduler.skip_interval()))
            .unwrap_or_default()
    }

    /// Ends the session. The next `track` fails until `initialize`.
    pub fn reset(&mut self) {
        self.state = None;
        self.detector_ready = false;
        self.matcher.clear();
    }

    pub fn state(&self) -> EngineState {
        match &self.state {
            None => EngineState::Uninitialized,
            Some(s) if s.consecutive_lost_count >= self.config.max_lost_frames => EngineState::Lost,
            Some(s) if s.stats.total_frames == 0 => EngineState::Initialized,
            Some(_) => EngineState::Tracking,
        }
    }

    /// Last accepted position.
    pub fn current_box(&self) -> Option<BoundingBox> {
        self.state.as_ref().map(|s| s.current_box)
    }

    pub fn history(&self) -> Option<&BoundedHistory<BoundingBox>> {
        self.state.as_ref().map(|s| &s.history)
    }

    pub fn confidence_history(&self) -> Option<&BoundedHistory<f64>> {
        self.state.as_ref().map(|s| &s.confidence_history)
    }

    pub fn has_detector(&self) -> bool {
        self.detector_ready
    }
}

fn locate_with_detector(
    detector: &mut dyn Detector,
    frame: &Frame,
    config: &TrackerConfig,
    (frame_w, frame_h): (u32, u32),
) -> Result<Detection, TrackingFailure> {
    let detection = detector
        .locate(frame)
        .map_err(|e| TrackingFailure::Detector(e.to_string()))?;
    if !detection_in_bounds(&detection.bbox, config, frame_w, frame_h) {
        return Err(TrackingFailure::RejectedBox(detection.bbox));
    }
    Ok(Detection {
        bbox: detection.bbox.clamp_to(frame_w, frame_h),
        confidence: if detection.confidence.is_finite() {
            detection.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        },
    })
}

/// Rejects degenerate, oversize or out-of-frame detector boxes.
fn detection_in_bounds(bbox: &BoundingBox, config: &TrackerConfig, frame_w: u32, frame_h: u32) -> bool {
    let (fw, fh) = (frame_w as f64, frame_h as f64);
    let tol = config.boundary_tolerance;
    bbox.is_valid()
        && bbox.w > config.min_box_size
        && bbox.h > config.min_box_size
        && bbox.w <= fw
        && bbox.h <= fh
        && bbox.x >= -tol
        && bbox.y >= -tol
        && bbox.x + bbox.w <= fw + tol
        && bbox.y + bbox.h <= fh + tol
}
