use crate::shared::bounding_box::BoundingBox;
use crate::tracking::domain::track_state::BoundedHistory;

/// Confidence when there is not enough history to extrapolate.
pub const INSUFFICIENT_HISTORY_CONFIDENCE: f64 = 0.3;
/// Ceiling on confidence for an interpolated (skipped) frame.
pub const MAX_INTERPOLATION_CONFIDENCE: f64 = 0.5;
/// Confidence reported for a loss-recovery prediction.
pub const RECOVERY_CONFIDENCE: f64 = 0.25;

const CONFIDENCE_WINDOW: usize = 3;

/// Box and confidence produced by extrapolation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// Constant-velocity extrapolation from the two newest history entries.
///
/// Used for skipped frames (interpolation) and for frames where every
/// cascade tier failed (recovery, with a per-axis step cap).
#[derive(Clone, Copy, Debug)]
pub struct MotionPredictor {
    max_recovery_step: f64,
}

impl MotionPredictor {
    pub fn new(max_recovery_step: f64) -> Self {
        Self {
            max_recovery_step: max_recovery_step.max(0.0),
        }
    }

    /// Interpolation for a skipped frame.
    pub fn predict(
        &self,
        history: &BoundedHistory<BoundingBox>,
        confidence_history: &BoundedHistory<f64>,
        current_box: BoundingBox,
    ) -> Prediction {
        let Some((last, dx, dy)) = velocity(history) else {
            return Prediction {
                bbox: current_box,
                confidence: INSUFFICIENT_HISTORY_CONFIDENCE,
            };
        };
        let confidence = if confidence_history.is_empty() {
            INSUFFICIENT_HISTORY_CONFIDENCE
        } else {
            let n = confidence_history.len().min(CONFIDENCE_WINDOW);
            let mean = confidence_history.recent(CONFIDENCE_WINDOW).sum::<f64>() / n as f64;
            mean.min(MAX_INTERPOLATION_CONFIDENCE)
        };
        Prediction {
            bbox: last.translate(dx, dy),
            confidence,
        }
    }

    /// Prediction for a frame where detection and matching both failed.
    ///
    /// Displacement is clamped to `±max_recovery_step` on each axis.
    pub fn predict_recovery(
        &self,
        history: &BoundedHistory<BoundingBox>,
        current_box: BoundingBox,
    ) -> Prediction {
        let bbox = match velocity(history) {
            Some((last, dx, dy)) => {
                let step = self.max_recovery_step;
                last.translate(dx.clamp(-step, step), dy.clamp(-step, step))
            }
            None => current_box,
        };
        Prediction {
            bbox,
            confidence: RECOVERY_CONFIDENCE,
        }
    }
}

fn velocity(history: &BoundedHistory<BoundingBox>) -> Option<(BoundingBox, f64, f64)> {
    let last = history.nth_back(0)?;
    let prev = history.nth_back(1)?;
    Some((last, last.x - prev.x, last.y - prev.y))
}
