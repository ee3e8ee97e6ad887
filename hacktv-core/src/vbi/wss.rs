//! Widescreen Signalling (ETSI EN 300 294): a 14-bit run-in plus data
//! word, biphase coded onto line 23, that tells a receiver the intended
//! display aspect ratio and a handful of other flags.

use crate::config::ModeConfig;
use crate::line::{Line, LineProcessor};
use crate::levels::Levels;

pub const WSS_LINE: u32 = 23;

/// The subset of WSS groups this crate can stamp; callers select one by
/// aspect tag, matching the "aspect tag" wording in spec.md §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WssAspect {
    FullFormat4x3,
    Box14x9Top,
    Box14x9,
    Box16x9Top,
    Box16x9,
    FullFormat16x9,
    Anamorphic16x9,
}

impl WssAspect {
    /// Bits 0..=2 of the WSS group 1 data word (aspect ratio code).
    fn group1_code(self) -> u8 {
        match self {
            WssAspect::FullFormat4x3 => 0b000,
            WssAspect::Box14x9Top => 0b001,
            WssAspect::Box14x9 => 0b010,
            WssAspect::Box16x9Top => 0b011,
            WssAspect::Box16x9 => 0b100,
            WssAspect::FullFormat16x9 => 0b101,
            WssAspect::Anamorphic16x9 => 0b110,
        }
    }

    /// Full 14-bit WSS data word (groups 1-4), other groups left at
    /// their "no subtitles / no camera / no surround" default.
    pub fn data_word(self) -> u16 {
        self.group1_code() as u16
    }
}

pub struct WssInserter {
    aspect: WssAspect,
    levels: Levels,
    bit_rate_hz: f64,
}

impl WssInserter {
    pub fn new(mode: &ModeConfig, aspect: WssAspect) -> Self {
        Self {
            aspect,
            levels: Levels::from_mode(mode),
            bit_rate_hz: 5_000_000.0 / 3.0,
        }
    }
}

impl LineProcessor for WssInserter {
    fn name(&self) -> &'static str {
        "vbi-wss"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() || line.line_no as u32 != WSS_LINE {
            return;
        }

        let line_period_s =
            mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
        let sample_rate = line.video.len() as f64 / line_period_s;
        let samples_per_bit = (sample_rate / self.bit_rate_hz).round().max(1.0) as usize;

        let lo = self.levels.blanking;
        let hi = self.levels.blanking + (self.levels.white - self.levels.black) * 0.70;

        let start = (mode.active_left_s * sample_rate).round() as usize;
        let mut offset = start;

        // Run-in: 5 cycles of 1010..., then a fixed 0011 1100 1101 start code.
        for i in 0..10 {
            let bit = i % 2 == 0;
            crate::vbi::write_nrz_bit(&mut line.video, offset, samples_per_bit, bit, lo, hi);
            offset += samples_per_bit;
        }
        const START_CODE: u16 = 0b0011_1100_1101;
        for i in 0..12 {
            let bit = (START_CODE >> (11 - i)) & 1 != 0;
            crate::vbi::write_nrz_bit(&mut line.video, offset, samples_per_bit, bit, lo, hi);
            offset += samples_per_bit;
        }

        let data = self.aspect.data_word();
        for i in 0..14 {
            let bit = (data >> i) & 1 != 0;
            crate::vbi::write_nrz_bit(&mut line.video, offset, samples_per_bit, bit, lo, hi);
            offset += samples_per_bit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;

    #[test]
    fn only_fires_on_line_23() {
        let mode = &PAL_I;
        let mut inserter = WssInserter::new(mode, WssAspect::Box14x9);
        let mut line = Line::new(1024);
        line.line_no = 24;
        inserter.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video.iter().all(|&s| s == 0.0));

        line.line_no = WSS_LINE as i32;
        inserter.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn aspect_codes_are_distinct() {
        let codes: Vec<u16> = [
            WssAspect::FullFormat4x3,
            WssAspect::Box14x9Top,
            WssAspect::Box14x9,
            WssAspect::Box16x9Top,
            WssAspect::Box16x9,
            WssAspect::FullFormat16x9,
            WssAspect::Anamorphic16x9,
        ]
        .iter()
        .map(|a| a.data_word())
        .collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
