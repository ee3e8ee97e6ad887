//! Analogue Copy Protection: pseudo-sync pulses written into the vertical
//! blanking interval lines that raise a VCR's AGC circuit into
//! compression, plus an optional colourstripe burst across a run of
//! active lines. Pattern geometry only — this crate does not try to
//! reproduce any particular vendor's exact line assignment beyond what
//! spec.md describes (ACP pulses inserted into VBI lines).

use crate::config::ModeConfig;
use crate::line::{Line, LineProcessor};
use crate::levels::Levels;

#[derive(Debug, Clone, Copy)]
pub struct AcpConfig {
    /// Lines (1-based) that receive an elevated pseudo-sync pulse.
    pub pseudo_sync_lines: [u32; 9],
    /// Lines that receive a colourstripe burst instead.
    pub colourstripe_lines: (u32, u32),
}

impl Default for AcpConfig {
    fn default() -> Self {
        Self {
            pseudo_sync_lines: [10, 11, 12, 13, 14, 15, 16, 17, 18],
            colourstripe_lines: (19, 20),
        }
    }
}

pub struct AcpInserter {
    config: AcpConfig,
    levels: Levels,
}

impl AcpInserter {
    pub fn new(mode: &ModeConfig, config: AcpConfig) -> Self {
        Self {
            config,
            levels: Levels::from_mode(mode),
        }
    }
}

impl LineProcessor for AcpInserter {
    fn name(&self) -> &'static str {
        "vbi-acp"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() {
            return;
        }
        let line_no = line.line_no as u32;

        let line_period_s =
            mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
        let sample_rate = line.video.len() as f64 / line_period_s;

        if self.config.pseudo_sync_lines.contains(&line_no) {
            let width = (mode.sync.hsync_width_s * 2.5 * sample_rate).round() as usize;
            for sample in line.video.iter_mut().take(width) {
                *sample = self.levels.sync;
            }
        } else if line_no == self.config.colourstripe_lines.0
            || line_no == self.config.colourstripe_lines.1
        {
            let start = (mode.active_left_s * sample_rate).round() as usize;
            let width = (mode.active_width_s * sample_rate).round() as usize;
            let omega = 2.0 * std::f64::consts::PI * mode.colour_carrier_hz.as_f64() / sample_rate;
            let amplitude = (self.levels.white - self.levels.black) * 0.2;
            for i in 0..width {
                let idx = start + i;
                if idx >= line.video.len() {
                    break;
                }
                line.video[idx] += amplitude * (omega * i as f64).sin();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;

    #[test]
    fn pseudo_sync_line_is_pulled_to_sync_level() {
        let mode = &PAL_I;
        let config = AcpConfig::default();
        let mut inserter = AcpInserter::new(mode, config);
        let mut line = Line::new(1024);
        line.line_no = config.pseudo_sync_lines[0] as i32;
        inserter.process(std::slice::from_mut(&mut line), mode);
        assert!((line.video[0] - mode.sync_level).abs() < 1e-6);
    }

    #[test]
    fn unrelated_lines_are_untouched() {
        let mode = &PAL_I;
        let mut inserter = AcpInserter::new(mode, AcpConfig::default());
        let mut line = Line::new(1024);
        line.line_no = 300;
        inserter.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video.iter().all(|&s| s == 0.0));
    }
}
