//! Vertical Interval Test Signal insertion: a fixed 2T sine-squared pulse
//! followed by a five-step staircase, written onto a nominated test line
//! so a receiver or test instrument downstream of the transmitter can
//! check frequency response and linearity.

use crate::config::ModeConfig;
use crate::line::{Line, LineProcessor};
use crate::levels::Levels;

pub struct VitsInserter {
    line_no: u32,
    levels: Levels,
}

impl VitsInserter {
    pub fn new(mode: &ModeConfig, line_no: u32) -> Self {
        Self {
            line_no,
            levels: Levels::from_mode(mode),
        }
    }
}

fn sine_squared_pulse(t: f64, half_width_t: f64) -> f64 {
    if t.abs() >= half_width_t {
        0.0
    } else {
        let x = std::f64::consts::FRAC_PI_2 * t / half_width_t;
        x.cos().powi(2)
    }
}

impl LineProcessor for VitsInserter {
    fn name(&self) -> &'static str {
        "vbi-vits"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() || line.line_no as u32 != self.line_no {
            return;
        }

        let line_period_s =
            mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
        let sample_rate = line.video.len() as f64 / line_period_s;
        let start = (mode.active_left_s * sample_rate).round() as usize;
        let width = (mode.active_width_s * sample_rate).round() as usize;

        let span = (self.levels.white - self.levels.black).abs();

        // 2T pulse in the first fifth of the active line.
        let pulse_width = width / 5;
        let half_width_t = pulse_width as f64 / 2.0 / sample_rate;
        for i in 0..pulse_width {
            let idx = start + i;
            if idx >= line.video.len() {
                break;
            }
            let t = (i as f64 - pulse_width as f64 / 2.0) / sample_rate;
            line.video[idx] = self.levels.black + span * sine_squared_pulse(t, half_width_t);
        }

        // Five-step staircase across the remaining active width.
        let remaining_start = start + pulse_width;
        let remaining_width = width.saturating_sub(pulse_width);
        let steps = 5;
        let step_width = remaining_width / steps;
        for step in 0..steps {
            let level = self.levels.black + span * (step as f64 / (steps - 1) as f64);
            let step_start = remaining_start + step * step_width;
            for i in 0..step_width {
                let idx = step_start + i;
                if idx >= line.video.len() {
                    break;
                }
                line.video[idx] = level;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;

    #[test]
    fn staircase_final_step_reaches_white() {
        let mode = &PAL_I;
        let mut inserter = VitsInserter::new(mode, 17);
        let mut line = Line::new(2048);
        line.line_no = 17;
        inserter.process(std::slice::from_mut(&mut line), mode);
        let last_nonzero = line
            .video
            .iter()
            .rposition(|&s| s != 0.0)
            .expect("staircase should write samples");
        assert!((line.video[last_nonzero] - mode.white_level).abs() < 0.05);
    }

    #[test]
    fn only_fires_on_its_own_line() {
        let mode = &PAL_I;
        let mut inserter = VitsInserter::new(mode, 17);
        let mut line = Line::new(2048);
        line.line_no = 18;
        inserter.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video.iter().all(|&s| s == 0.0));
    }
}
