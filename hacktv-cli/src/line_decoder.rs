//! Line decoder: classifies a rendered line and produces a hex dump good
//! enough to eyeball sync placement and signal levels without a scope.
//!
//! This mirrors spec.md §8's testable properties rather than any
//! internal engine state: classification is derived purely from the
//! line's own sample values against the mode's published reference
//! levels (T.2's `(blanking+sync)/2` threshold), so it works the same
//! way a real test instrument reading the output stream would.

use crate::logging::LineDecodeEvent;
use chrono::Utc;
use hacktv_core::config::ModeConfig;
use hacktv_core::line::{Field, Line};

pub struct LineDecoder<'a> {
    mode: &'a ModeConfig,
}

impl<'a> LineDecoder<'a> {
    pub fn new(mode: &'a ModeConfig) -> Self {
        Self { mode }
    }

    /// Classify and hex-dump `line` into a loggable event.
    pub fn decode(&self, line: &Line) -> LineDecodeEvent {
        let classification = self.classify(line);
        let hex_preview = Self::hex_preview(&line.video, 16);

        LineDecodeEvent {
            timestamp: Utc::now(),
            frame_no: line.frame_no,
            line_no: line.line_no,
            field: match line.field {
                Field::Odd => "odd".to_string(),
                Field::Even => "even".to_string(),
            },
            classification,
            hex_preview,
        }
    }

    fn classify(&self, line: &Line) -> String {
        if self.mode.mac.is_some() {
            return "mac-duobinary".to_string();
        }
        if line.video.is_empty() {
            return "empty".to_string();
        }

        let sync_threshold = (self.mode.blanking_level + self.mode.sync_level) / 2.0;
        let min = line.video.iter().copied().fold(f64::INFINITY, f64::min);
        let max = line.video.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // Sync pulses sit strictly below blanking; whether that region
        // is numerically "low" or "high" depends on which reference
        // level the mode places further from zero (spec.md T.2).
        let has_sync = if self.mode.sync_level < self.mode.blanking_level {
            min <= sync_threshold
        } else {
            max >= sync_threshold
        };

        let spread = (max - min).abs();
        let active_spread = (self.mode.white_level - self.mode.black_level).abs() * 0.1;
        let has_active_swing = spread > active_spread;

        match (has_sync, has_active_swing) {
            (true, true) => "sync+active".to_string(),
            (true, false) => "sync".to_string(),
            (false, true) => "active".to_string(),
            (false, false) => "blanking".to_string(),
        }
    }

    /// Render the first `count` samples as signed 16-bit hex, spaced for
    /// readability, matching the unit the radio sink actually writes.
    fn hex_preview(video: &[f64], count: usize) -> String {
        video
            .iter()
            .take(count)
            .map(|&v| format!("{:04X}", to_i16(v) as u16))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Scale a `[-1, 1]`-normalised sample to the `i16` unit the radio sink
/// writes, matching the scaling every `RadioSink` implementation in this
/// crate uses.
pub fn to_i16(sample: f64) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f64).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hacktv_core::config::PAL_I;

    #[test]
    fn blanking_line_classifies_as_blanking() {
        let mode = &PAL_I;
        let mut line = Line::new(32);
        line.line_no = 10;
        line.video.iter_mut().for_each(|s| *s = mode.blanking_level);
        let decoder = LineDecoder::new(mode);
        assert_eq!(decoder.classify(&line), "blanking");
    }

    #[test]
    fn sync_pulse_is_detected() {
        let mode = &PAL_I;
        let mut line = Line::new(32);
        line.line_no = 1;
        line.video.iter_mut().for_each(|s| *s = mode.blanking_level);
        line.video[0] = mode.sync_level;
        let decoder = LineDecoder::new(mode);
        assert_eq!(decoder.classify(&line), "sync");
    }

    #[test]
    fn to_i16_clamps_out_of_range_samples() {
        assert_eq!(to_i16(2.0), i16::MAX);
        assert_eq!(to_i16(-2.0), -i16::MAX);
    }
}
