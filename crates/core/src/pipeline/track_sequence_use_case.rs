use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::SEED_CONFIDENCE;
use crate::shared::sequence_metadata::SequenceMetadata;
use crate::tracking::domain::track_result::TrackResult;
use crate::tracking::domain::tracking_stats::TrackingStats;
use crate::tracking::tracking_engine::TrackingEngine;
use crate::video::domain::frame_reader::FrameReader;
use crate::video::domain::image_writer::{Annotation, ImageWriter};

/// Receives each tracked frame's index and result; an error aborts the run.
pub type ResultSink<'a> =
    dyn FnMut(usize, &TrackResult) -> Result<(), Box<dyn std::error::Error>> + 'a;

/// Outcome of one sequence run.
#[derive(Clone, Debug)]
pub struct SequenceReport {
    pub metadata: SequenceMetadata,
    /// Frames passed to `track()` (the seed frame is not counted).
    pub frames_tracked: usize,
    pub stats: TrackingStats,
    pub cancelled: bool,
}

/// Tracks one target through a frame sequence: read → initialize on the
/// first frame → track every following frame → optionally write annotated
/// frames.
pub struct TrackSequenceUseCase {
    reader: Box<dyn FrameReader>,
    engine: TrackingEngine,
    logger: Box<dyn PipelineLogger>,
    annotations: Option<(Box<dyn ImageWriter>, PathBuf)>,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
}

impl TrackSequenceUseCase {
    pub fn new(
        reader: Box<dyn FrameReader>,
        engine: TrackingEngine,
        logger: Box<dyn PipelineLogger>,
        on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    ) -> Self {
        Self {
            reader,
            engine,
            logger,
            annotations: None,
            on_progress,
        }
    }

    /// Also write every frame with its box drawn into `output_dir`.
    pub fn with_annotations(mut self, writer: Box<dyn ImageWriter>, output_dir: PathBuf) -> Self {
        self.annotations = Some((writer, output_dir));
        self
    }

    pub fn engine(&self) -> &TrackingEngine {
        &self.engine
    }

    /// Runs the sequence at `input_path`, seeding the tracker with `bbox`
    /// on the first frame.
    ///
    /// Stops early, with `cancelled` set, when the progress callback
    /// returns false.
    pub fn execute(
        &mut self,
        input_path: &Path,
        bbox: BoundingBox,
        on_result: &mut ResultSink<'_>,
    ) -> Result<SequenceReport, Box<dyn std::error::Error>> {
        let metadata = self.reader.open(input_path)?;
        let total = metadata.total_frames;
        self.logger.info(&format!(
            "Tracking {} frames ({}x{}) from {}",
            total,
            metadata.width,
            metadata.height,
            input_path.display()
        ));

        let outcome = self.track_frames(bbox, total, on_result);
        self.reader.close();
        let (frames_tracked, cancelled) = outcome?;

        if cancelled {
            self.logger.info("Tracking cancelled");
        }
        self.logger.summary();

        Ok(SequenceReport {
            metadata,
            frames_tracked,
            stats: self.engine.get_stats(),
            cancelled,
        })
    }
    /// Drives the reader to the end (or cancellation). Returns the number of
    /// tracked frames and whether the progress callback cancelled the run.
    fn track_frames(
        &mut self,
        bbox: BoundingBox,
        total: usize,
        on_result: &mut ResultSink<'_>,
    ) -> Result<(usize, bool), Box<dyn std::error::Error>> {
        let mut frames_tracked = 0;
        let mut read_start = Instant::now();

        for frame in self.reader.frames() {
            let frame = frame?;
            self.logger
                .timing("read", read_start.elapsed().as_secs_f64() * 1000.0);
            let index = frame.index();

            let annotation = if index == 0 {
                self.engine.initialize(&frame, bbox)?;
                Annotation {
                    bbox,
                    confidence: SEED_CONFIDENCE,
                }
            } else {
                let track_start = Instant::now();
                let result = self.engine.track(&frame)?;
                self.logger
                    .timing("track", track_start.elapsed().as_secs_f64() * 1000.0);
                self.logger.metric("confidence", result.confidence);
                frames_tracked += 1;
                on_result(index, &result)?;
                Annotation {
                    bbox: result.bbox,
                    confidence: result.confidence,
                }
            };

            if let Some((writer, dir)) = &self.annotations {
                let write_start = Instant::now();
                writer.write(
                    &dir.join(format!("frame_{index:06}.png")),
                    &frame,
                    Some(&annotation),
                )?;
                self.logger
                    .timing("write", write_start.elapsed().as_secs_f64() * 1000.0);
            }

            self.logger.progress(index + 1, total);
            if let Some(ref cb) = self.on_progress {
                if !cb(index + 1, total) {
                    return Ok((frames_tracked, true));
                }
            }
            read_start = Instant::now();
        }
        Ok((frames_tracked, false))
    }
}
