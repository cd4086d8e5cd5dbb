use std::path::PathBuf;

/// Describes a frame sequence opened by a [`FrameReader`](crate::video::domain::frame_reader::FrameReader).
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceMetadata {
    pub width: u32,
    pub height: u32,
    /// Nominal playback rate; 0 when the source carries no timing.
    pub fps: f64,
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let meta = SequenceMetadata {
            width: 640,
            height: 480,
            fps: 30.0,
            total_frames: 120,
            source_path: Some(PathBuf::from("/tmp/frames")),
        };
        assert_eq!(meta.width, 640);
        assert_eq!(meta.height, 480);
        assert_eq!(meta.total_frames, 120);
        assert_eq!(meta.source_path, Some(PathBuf::from("/tmp/frames")));
    }

    #[test]
    fn test_image_sequence_has_no_timing() {
        let meta = SequenceMetadata {
            width: 320,
            height: 240,
            fps: 0.0,
            total_frames: 3,
            source_path: None,
        };
        assert_eq!(meta.fps, 0.0);
        assert_eq!(meta.clone(), meta);
    }
}
