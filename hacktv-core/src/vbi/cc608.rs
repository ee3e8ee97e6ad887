//! EIA-608 (CEA-608, "line 21") closed captioning: a 7-cycle clock
//! run-in, a start bit, and two 8-bit odd-parity data bytes, NRZ coded at
//! 32 times the line rate, written onto line 21 (or line 284 for field 2).

use std::collections::VecDeque;

use crate::config::ModeConfig;
use crate::line::{Line, LineProcessor};
use crate::levels::Levels;

pub const FIELD1_LINE: u32 = 21;
pub const FIELD2_LINE: u32 = 284;
pub const BIT_RATE_HZ: f64 = 503_500.0 / 15.0 * 32.0 / 32.0; // 32 * line frequency approximation

#[derive(Debug, Clone, Copy)]
pub struct CaptionWord {
    pub byte1: u8,
    pub byte2: u8,
}

pub struct Cc608Inserter {
    pending: VecDeque<CaptionWord>,
    levels: Levels,
}

impl Cc608Inserter {
    pub fn new(mode: &ModeConfig) -> Self {
        Self {
            pending: VecDeque::new(),
            levels: Levels::from_mode(mode),
        }
    }

    pub fn queue(&mut self, word: CaptionWord) {
        self.pending.push_back(word);
    }
}

impl LineProcessor for Cc608Inserter {
    fn name(&self) -> &'static str {
        "vbi-cc608"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() || line.line_no as u32 != FIELD1_LINE {
            return;
        }
        let Some(word) = self.pending.pop_front() else {
            return;
        };

        let line_period_s =
            mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
        let sample_rate = line.video.len() as f64 / line_period_s;
        let samples_per_bit = (sample_rate / BIT_RATE_HZ).round().max(1.0) as usize;

        let lo = self.levels.blanking;
        let hi = self.levels.blanking + (self.levels.white - self.levels.black) * 0.5;

        let start = (mode.active_left_s * sample_rate).round() as usize;
        let mut offset = start;

        for i in 0..14 {
            let bit = i % 2 == 0;
            crate::vbi::write_nrz_bit(&mut line.video, offset, samples_per_bit, bit, lo, hi);
            offset += samples_per_bit;
        }
        // Start bit.
        crate::vbi::write_nrz_bit(&mut line.video, offset, samples_per_bit, true, lo, hi);
        offset += samples_per_bit;

        let b1 = crate::vbi::odd_parity(word.byte1);
        let b2 = crate::vbi::odd_parity(word.byte2);
        for byte in [b1, b2] {
            for bit_no in 0..8 {
                let bit = (byte >> bit_no) & 1 != 0;
                crate::vbi::write_nrz_bit(&mut line.video, offset, samples_per_bit, bit, lo, hi);
                offset += samples_per_bit;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;

    #[test]
    fn queued_word_is_consumed_once() {
        let mode = &PAL_I;
        let mut inserter = Cc608Inserter::new(mode);
        inserter.queue(CaptionWord { byte1: 0x14, byte2: 0x20 });
        let mut line = Line::new(1024);
        line.line_no = FIELD1_LINE as i32;
        inserter.process(std::slice::from_mut(&mut line), mode);
        assert!(inserter.pending.is_empty());
        inserter.process(std::slice::from_mut(&mut line), mode);
    }
}
