use std::path::Path;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Tracked box to draw over a written frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Annotation {
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// Writes a single frame to an image file.
pub trait ImageWriter: Send {
    /// Writes a frame to the given path, drawing the annotation if given.
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        annotation: Option<&Annotation>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
