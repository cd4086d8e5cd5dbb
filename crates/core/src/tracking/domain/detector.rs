use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// One candidate target position reported by a [`Detector`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// Domain interface for a learned single-target tracker (e.g. a Siamese
/// network) used as the first cascade tier.
///
/// Implementations convert their native box layout into [`BoundingBox`]
/// before returning; the engine never sees raw network output. Results are
/// best-effort and are bounds-checked by the engine before use.
pub trait Detector: Send {
    /// Seeds the detector with the target appearance. Called once per session.
    fn initialize(
        &mut self,
        frame: &Frame,
        bbox: &BoundingBox,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Locates the target in a new frame.
    fn locate(&mut self, frame: &Frame) -> Result<Detection, Box<dyn std::error::Error>>;

    /// Short label used in logs.
    fn name(&self) -> &str {
        "detector"
    }
}
