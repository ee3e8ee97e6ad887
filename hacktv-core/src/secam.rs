//! SECAM's FM colour subcarrier. The raster/paint stage writes a raw D'r
//! or D'b chroma deviation (in Hz) into a line's `video_q` buffer; this
//! stage frequency-modulates that value onto one of two subcarriers —
//! 4.25 MHz for D'b, 4.40625 MHz for D'r, matching `src/video.c`'s
//! `fm_secam_cr`/`fm_secam_cb` modulators — and sums the result back
//! into the real composite channel.

use crate::audio::oscillator::FmOscillator;
use crate::config::{ColourMode, ModeConfig};
use crate::levels::Levels;
use crate::line::{Line, LineProcessor};
use crate::raster::secam_line_is_dr;

pub struct SecamChromaModulator {
    db: FmOscillator,
    dr: FmOscillator,
    amplitude: f64,
}

impl SecamChromaModulator {
    pub fn new(sample_rate: f64, levels: &Levels) -> Self {
        // `src/video.c`: secam_level = (white - blanking) * 0.200 * video_level.
        let amplitude = 0.200 * (levels.white - levels.blanking).abs() * levels.video_scale;
        Self {
            db: FmOscillator::new(4_250_000.0, 1.0, sample_rate),
            dr: FmOscillator::new(4_406_260.0, 1.0, sample_rate),
            amplitude,
        }
    }
}

impl LineProcessor for SecamChromaModulator {
    fn name(&self) -> &'static str {
        "secam-chroma"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() || mode.colour_mode != ColourMode::Secam {
            return;
        }

        let is_dr = secam_line_is_dr(line.line_no as u32);
        for (sample, &q) in line.video.iter_mut().zip(line.video_q.iter()) {
            if q == 0.0 {
                continue;
            }
            let carrier = if is_dr { self.dr.step(q) } else { self.db.step(q) };
            *sample += self.amplitude * carrier;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SECAM_L;

    #[test]
    fn chroma_is_untouched_outside_the_active_window() {
        let mode = &SECAM_L;
        let levels = Levels::from_mode(mode);
        let mut modulator = SecamChromaModulator::new(16_000_000.0, &levels);
        let mut line = Line::new(64);
        line.line_no = 100;
        modulator.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn nonzero_chroma_perturbs_the_composite_channel() {
        let mode = &SECAM_L;
        let levels = Levels::from_mode(mode);
        let mut modulator = SecamChromaModulator::new(16_000_000.0, &levels);
        let mut line = Line::new(64);
        line.line_no = 100;
        line.video_q[10..20].fill(50_000.0);
        modulator.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video[10..20].iter().any(|&s| s != 0.0));
    }
}
