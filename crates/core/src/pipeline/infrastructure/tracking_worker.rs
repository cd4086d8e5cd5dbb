use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::track_sequence_use_case::{SequenceReport, TrackSequenceUseCase};
use crate::shared::bounding_box::BoundingBox;
use crate::tracking::domain::detector::Detector;
use crate::tracking::domain::track_result::TrackResult;
use crate::tracking::domain::tracker_config::TrackerConfig;
use crate::tracking::tracking_engine::TrackingEngine;
use crate::video::domain::frame_reader::FrameReader;
use crate::video::domain::image_writer::ImageWriter;

pub enum TrackingMessage {
    Frame { index: usize, result: TrackResult },
    Complete(SequenceReport),
    Error(String),
    Cancelled,
}

pub struct TrackingParams {
    pub input_path: PathBuf,
    pub bbox: BoundingBox,
    pub config: TrackerConfig,
    pub detector: Option<Box<dyn Detector>>,
    pub reader: Box<dyn FrameReader>,
    pub logger: Box<dyn PipelineLogger>,
    pub annotations: Option<(Box<dyn ImageWriter>, PathBuf)>,
}

/// Runs one tracking session on a dedicated thread.
///
/// Results stream back over the returned channel; setting the flag stops
/// the session before the next frame.
pub fn spawn(params: TrackingParams) -> (Receiver<TrackingMessage>, Arc<AtomicBool>) {
    let (tx, rx) = crossbeam_channel::unbounded::<TrackingMessage>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = cancelled.clone();

    thread::spawn(move || match run_tracking(&tx, &cancelled_clone, params) {
        Ok(report) if report.cancelled => {
            let _ = tx.send(TrackingMessage::Cancelled);
        }
        Ok(report) => {
            let _ = tx.send(TrackingMessage::Complete(report));
        }
        Err(e) => {
            let _ = tx.send(TrackingMessage::Error(e.to_string()));
        }
    });

    (rx, cancelled)
}

fn run_tracking(
    tx: &Sender<TrackingMessage>,
    cancelled: &Arc<AtomicBool>,
    params: TrackingParams,
) -> Result<SequenceReport, Box<dyn std::error::Error>> {
    let engine = TrackingEngine::new(params.config, params.detector)?;

    let cancelled_progress = cancelled.clone();
    let progress: Box<dyn Fn(usize, usize) -> bool + Send> =
        Box::new(move |_, _| !cancelled_progress.load(Ordering::Relaxed));

    let mut use_case =
        TrackSequenceUseCase::new(params.reader, engine, params.logger, Some(progress));
    if let Some((writer, dir)) = params.annotations {
        use_case = use_case.with_annotations(writer, dir);
    }

    use_case.execute(&params.input_path, params.bbox, &mut |index, result| {
        tx.send(TrackingMessage::Frame {
            index,
            result: *result,
        })
        .map_err(|e| e.to_string().into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::Frame;
    use crate::shared::sequence_metadata::SequenceMetadata;
    use crate::tracking::domain::track_result::TrackSource;
    use std::path::Path;
    use std::time::Duration;

    struct StubReader {
        frames: Vec<Frame>,
    }

    impl FrameReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<SequenceMetadata, Box<dyn std::error::Error>> {
            Ok(SequenceMetadata {
                width: 40,
                height: 40,
                fps: 0.0,
                total_frames: self.frames.len(),
                source_path: None,
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frames.drain(..).map(Ok))
        }

        fn close(&mut self) {}
    }

    fn textured_frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| {
                let mut data = vec![60u8; 40 * 40];
                for y in 0..10 {
                    for x in 0..10 {
                        data[(12 + y) * 40 + 12 + x] = ((x * 37 + y * 91) % 180) as u8 + 40;
                    }
                }
                Frame::new(data, 40, 40, 1, i)
            })
            .collect()
    }

    fn params(frame_count: usize, config: TrackerConfig) -> TrackingParams {
        TrackingParams {
            input_path: PathBuf::from("frames"),
            bbox: BoundingBox::new(12.0, 12.0, 10.0, 10.0),
            config,
            detector: None,
            reader: Box::new(StubReader {
                frames: textured_frames(frame_count),
            }),
            logger: Box::new(NullPipelineLogger),
            annotations: None,
        }
    }

    fn fast_config() -> TrackerConfig {
        TrackerConfig {
            throttle: false,
            template_size: (10, 10),
            scales: vec![1.0],
            ..TrackerConfig::default()
        }
    }

    fn drain(rx: &Receiver<TrackingMessage>) -> Vec<TrackingMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.recv_timeout(Duration::from_secs(30)) {
            let done = matches!(
                msg,
                TrackingMessage::Complete(_) | TrackingMessage::Error(_) | TrackingMessage::Cancelled
            );
            messages.push(msg);
            if done {
                break;
            }
        }
        messages
    }

    #[test]
    fn test_streams_frames_then_completes() {
        let (rx, _cancel) = spawn(params(4, fast_config()));
        let messages = drain(&rx);

        assert_eq!(messages.len(), 4);
        for (i, msg) in messages[..3].iter().enumerate() {
            match msg {
                TrackingMessage::Frame { index, result } => {
                    assert_eq!(*index, i + 1);
                    assert!(result.success);
                    assert_eq!(result.info.source, TrackSource::Template);
                }
                _ => panic!("expected frame message"),
            }
        }
        match &messages[3] {
            TrackingMessage::Complete(report) => assert_eq!(report.frames_tracked, 3),
            _ => panic!("expected completion"),
        }
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let config = TrackerConfig {
            target_fps: -1.0,
            ..fast_config()
        };
        let (rx, _cancel) = spawn(params(2, config));
        assert!(matches!(
            drain(&rx).last(),
            Some(TrackingMessage::Error(_))
        ));
    }

    #[test]
    fn test_cancel_flag_stops_after_seed_frame() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cancelled = Arc::new(AtomicBool::new(true));
        let report = run_tracking(&tx, &cancelled, params(50, fast_config())).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.frames_tracked, 0);
        assert!(rx.try_recv().is_err());
    }
}
