//! Telemetry sampling and statistical aggregation over rendered lines.

use crate::logging::{StatSummary, TelemetryEvent};
use chrono::Utc;
use std::time::Instant;

/// Accumulates per-line telemetry samples and computes run statistics.
pub struct TelemetryAggregator {
    rms_samples: Vec<f64>,
    peak_samples: Vec<f64>,

    run_start: Instant,
    last_sample_time: Instant,
    lines_emitted: u64,
    frames_emitted: u64,
    mode: String,

    sample_interval_secs: f64,
}

impl TelemetryAggregator {
    pub fn new(mode: impl Into<String>, sample_interval_secs: f64) -> Self {
        let now = Instant::now();
        Self {
            rms_samples: Vec::new(),
            peak_samples: Vec::new(),
            run_start: now,
            last_sample_time: now,
            lines_emitted: 0,
            frames_emitted: 0,
            mode: mode.into(),
            sample_interval_secs,
        }
    }

    /// Record one rendered line: its frame number and the RMS/peak level
    /// of its composite (real) channel.
    pub fn record_line(&mut self, frame_no: u64, video: &[f64]) {
        self.lines_emitted += 1;
        self.frames_emitted = self.frames_emitted.max(frame_no + 1);

        let n = video.len().max(1) as f64;
        let sum_sq: f64 = video.iter().map(|v| v * v).sum();
        let rms = (sum_sq / n).sqrt();
        let peak = video.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

        self.rms_samples.push(rms);
        self.peak_samples.push(peak);
    }

    pub fn should_sample(&self) -> bool {
        self.last_sample_time.elapsed().as_secs_f64() >= self.sample_interval_secs
    }

    /// Generate a telemetry event and reset the sampling timer, or
    /// `None` if the sampling interval has not yet elapsed.
    pub fn sample(&mut self) -> Option<TelemetryEvent> {
        if !self.should_sample() {
            return None;
        }

        let elapsed = self.run_start.elapsed().as_secs_f64().max(1e-9);
        let event = TelemetryEvent {
            timestamp: Utc::now(),
            mode: self.mode.clone(),
            lines_emitted: self.lines_emitted,
            frames_emitted: self.frames_emitted,
            lines_per_sec: self.lines_emitted as f64 / elapsed,
            rms_level: self.mean(&self.rms_samples).unwrap_or(0.0),
            peak_level: self.mean(&self.peak_samples).unwrap_or(0.0),
        };

        self.last_sample_time = Instant::now();
        Some(event)
    }

    pub fn compute_statistics(&self) -> (StatSummary, StatSummary) {
        (
            self.compute_stat_summary(&self.rms_samples),
            self.compute_stat_summary(&self.peak_samples),
        )
    }

    fn compute_stat_summary(&self, samples: &[f64]) -> StatSummary {
        if samples.is_empty() {
            return StatSummary {
                mean: 0.0,
                stddev: 0.0,
                min: 0.0,
                max: 0.0,
                samples: 0,
            };
        }

        let mean = self.mean(samples).unwrap_or(0.0);
        let variance =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        let stddev = variance.sqrt();
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        StatSummary {
            mean,
            stddev,
            min,
            max,
            samples: samples.len(),
        }
    }

    fn mean(&self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    pub fn total_lines(&self) -> u64 {
        self.lines_emitted
    }

    pub fn total_frames(&self) -> u64 {
        self.frames_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_summary_of_constant_signal_has_zero_stddev() {
        let mut agg = TelemetryAggregator::new("pal-i", 0.0);
        agg.record_line(0, &[0.5, 0.5, 0.5]);
        agg.record_line(0, &[0.5, 0.5, 0.5]);
        let (rms, _peak) = agg.compute_statistics();
        assert!((rms.stddev).abs() < 1e-12);
        assert!((rms.mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn frames_emitted_tracks_max_frame_no_seen() {
        let mut agg = TelemetryAggregator::new("pal-i", 0.0);
        agg.record_line(0, &[0.0]);
        agg.record_line(2, &[0.0]);
        agg.record_line(1, &[0.0]);
        assert_eq!(agg.total_frames(), 3);
    }
}
