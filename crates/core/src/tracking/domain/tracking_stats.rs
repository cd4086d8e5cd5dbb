use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::tracking::domain::track_state::Stats;

/// Overall rating of a session's speed and reliability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PerformanceGrade {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl fmt::Display for PerformanceGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PerformanceGrade::Excellent => "Excellent",
            PerformanceGrade::Good => "Good",
            PerformanceGrade::Fair => "Fair",
            PerformanceGrade::NeedsImprovement => "Needs improvement",
        };
        f.write_str(label)
    }
}

/// Snapshot of a session's running statistics.
///
/// `fps` reflects processing time of processed frames only (before any
/// throttling sleep). `success_rate` is a percentage of processed frames.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrackingStats {
    pub fps: f64,
    pub success_rate: f64,
    pub total_frames: u64,
    pub processed_frames: u64,
    pub skipped_frames: u64,
    pub successful_frames: u64,
    pub avg_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub avg_frame_time_ms: f64,
    pub min_frame_time_ms: f64,
    pub max_frame_time_ms: f64,
    pub std_frame_time_ms: f64,
    /// Percentage of frames answered by interpolation.
    pub skip_efficiency: f64,
    pub theoretical_speedup: f64,
    pub actual_speedup: f64,
}

impl TrackingStats {
    pub fn from_stats(stats: &Stats, skip_interval: u64) -> Self {
        let times_ms: Vec<f64> = stats
            .frame_time_samples
            .iter()
            .map(|d: Duration| d.as_secs_f64() * 1000.0)
            .collect();
        let (avg, min, max, std) = summarize(&times_ms);

        let avg_confidence = if stats.confidence_samples > 0 {
            stats.confidence_sum / stats.confidence_samples as f64
        } else {
            0.0
        };
        let skip_efficiency = if stats.total_frames > 0 {
            stats.skipped_frames as f64 / stats.total_frames as f64 * 100.0
        } else {
            0.0
        };

        Self {
            fps: if avg > 0.0 { 1000.0 / avg } else { 0.0 },
            success_rate: stats.successful_frames as f64 / stats.processed_frames.max(1) as f64
                * 100.0,
            total_frames: stats.total_frames,
            processed_frames: stats.processed_frames,
            skipped_frames: stats.skipped_frames,
            successful_frames: stats.successful_frames,
            avg_confidence,
            min_confidence: stats.min_confidence,
            max_confidence: stats.max_confidence,
            avg_frame_time_ms: avg,
            min_frame_time_ms: min,
            max_frame_time_ms: max,
            std_frame_time_ms: std,
            skip_efficiency,
            theoretical_speedup: skip_interval.max(1) as f64,
            actual_speedup: stats.total_frames as f64 / stats.processed_frames.max(1) as f64,
        }
    }

    pub fn grade(&self) -> PerformanceGrade {
        if self.fps >= 60.0 && self.success_rate >= 90.0 {
            PerformanceGrade::Excellent
        } else if self.fps >= 30.0 && self.success_rate >= 80.0 {
            PerformanceGrade::Good
        } else if self.fps >= 15.0 && self.success_rate >= 60.0 {
            PerformanceGrade::Fair
        } else {
            PerformanceGrade::NeedsImprovement
        }
    }

    /// Multi-line human-readable summary.
    pub fn report(&self) -> String {
        let mut lines = vec![
            "Tracking performance report".to_string(),
            format!(
                "  frames: {} total, {} processed, {} skipped ({:.1}% skipped)",
                self.total_frames, self.processed_frames, self.skipped_frames, self.skip_efficiency
            ),
            format!(
                "  success: {}/{} ({:.1}%)",
                self.successful_frames, self.processed_frames, self.success_rate
            ),
            format!(
                "  confidence: avg {:.3}, min {:.3}, max {:.3}",
                self.avg_confidence, self.min_confidence, self.max_confidence
            ),
        ];
        if self.processed_frames > 0 {
            lines.push(format!(
                "  frame time: avg {:.2} ms, min {:.2} ms, max {:.2} ms, std {:.2} ms",
                self.avg_frame_time_ms,
                self.min_frame_time_ms,
                self.max_frame_time_ms,
                self.std_frame_time_ms
            ));
        }
        lines.push(format!(
            "  speed: {:.1} fps, speedup {:.2}x actual / {:.2}x theoretical",
            self.fps, self.actual_speedup, self.theoretical_speedup
        ));
        lines.push(format!("  grade: {}", self.grade()));
        lines.join("\n")
    }
}

/// Mean, min, max and population standard deviation; zeros when empty.
fn summarize(values: &[f64]) -> (f64, f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, min, max, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn stats_with_times(ms: &[u64]) -> Stats {
        let mut stats = Stats::default();
        for &t in ms {
            stats.frame_time_samples.push(Duration::from_millis(t));
        }
        stats
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let s = TrackingStats::from_stats(&Stats::default(), 1);
        assert_eq!(s.fps, 0.0);
        assert_eq!(s.success_rate, 0.0);
        assert_eq!(s.actual_speedup, 0.0);
    }

    #[test]
    fn test_fps_from_mean_frame_time() {
        let s = TrackingStats::from_stats(&stats_with_times(&[10, 30]), 1);
        assert_relative_eq!(s.avg_frame_time_ms, 20.0, epsilon = 1e-9);
        assert_relative_eq!(s.fps, 50.0, epsilon = 1e-9);
        assert_relative_eq!(s.min_frame_time_ms, 10.0, epsilon = 1e-9);
        assert_relative_eq!(s.max_frame_time_ms, 30.0, epsilon = 1e-9);
        assert_relative_eq!(s.std_frame_time_ms, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rates_and_speedup() {
        let mut stats = Stats::default();
        stats.total_frames = 9;
        stats.processed_frames = 3;
        stats.skipped_frames = 6;
        stats.successful_frames = 2;
        let s = TrackingStats::from_stats(&stats, 3);
        assert_relative_eq!(s.success_rate, 200.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(s.skip_efficiency, 600.0 / 9.0, epsilon = 1e-9);
        assert_relative_eq!(s.actual_speedup, 3.0);
        assert_relative_eq!(s.theoretical_speedup, 3.0);
    }

    #[test]
    fn test_average_confidence() {
        let mut stats = Stats::default();
        stats.record_confidence(0.5);
        stats.record_confidence(1.0);
        let s = TrackingStats::from_stats(&stats, 1);
        assert_relative_eq!(s.avg_confidence, 0.75);
        assert_relative_eq!(s.min_confidence, 0.5);
    }

    #[rstest]
    #[case::excellent(120.0, 95.0, PerformanceGrade::Excellent)]
    #[case::good(45.0, 95.0, PerformanceGrade::Good)]
    #[case::fast_but_unreliable(120.0, 70.0, PerformanceGrade::Fair)]
    #[case::poor(10.0, 99.0, PerformanceGrade::NeedsImprovement)]
    fn test_grade(#[case] fps: f64, #[case] success_rate: f64, #[case] expected: PerformanceGrade) {
        let s = TrackingStats {
            fps,
            success_rate,
            ..TrackingStats::default()
        };
        assert_eq!(s.grade(), expected);
    }

    #[test]
    fn test_report_mentions_grade() {
        let s = TrackingStats {
            fps: 100.0,
            success_rate: 100.0,
            processed_frames: 4,
            ..TrackingStats::default()
        };
        let report = s.report();
        assert!(report.contains("grade: Excellent"));
        assert!(report.contains("frame time"));
    }
}
