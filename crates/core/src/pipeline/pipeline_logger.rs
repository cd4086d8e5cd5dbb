use std::collections::BTreeMap;
use std::time::Instant;

/// Cross-cutting logger for sequence-tracking events.
///
/// Keeps the use case free of output concerns: the CLI logs through the
/// `log` facade, tests and the worker discard events.
pub trait PipelineLogger: Send {
    /// Report frame-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage (read, track, write) took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a per-frame value such as confidence.
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-sequence summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and range of one series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesSummary {
    pub count: usize,
    pub total: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesSummary {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// CLI logger: progress and summaries through `log::info!`.
///
/// Progress lines are throttled to every `throttle_frames` frames. Stage
/// timings and metrics are folded into running summaries rather than kept
/// per frame, so long sequences cost constant memory.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, SeriesSummary>,
    metrics: BTreeMap<String, SeriesSummary>,
    start_time: Instant,
    frames_seen: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
        }
    }

    pub fn timing_summary(&self, stage: &str) -> Option<&SeriesSummary> {
        self.timings.get(stage)
    }

    pub fn metric_summary(&self, name: &str) -> Option<&SeriesSummary> {
        self.metrics.get(name)
    }

    /// Formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Sequence summary ({} frames, {:.1}s wall time):",
            self.frames_seen, elapsed_s
        )];
        for (stage, s) in &self.timings {
            lines.push(format!(
                "  {stage:8}: avg {:6.2}ms  min {:6.2}ms  max {:6.2}ms  total {:7.0}ms",
                s.mean(),
                s.min,
                s.max,
                s.total
            ));
        }
        for (name, s) in &self.metrics {
            lines.push(format!(
                "  {name}: avg {:.3} (min {:.3}, max {:.3})",
                s.mean(),
                s.min,
                s.max
            ));
        }
        if self.frames_seen > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames_seen as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(25)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = current;
        if total > 0 && (current % self.throttle_frames == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Tracking: {current}/{total} frames ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
