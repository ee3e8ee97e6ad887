//! Videocrypt-family line scrambling: Modes I and II cut-and-rotate each
//! line at a control-word-keyed point, preserving the multiset of
//! samples on the line (spec.md §8 T7) while destroying its spatial
//! structure. Mode S instead shuffles whole lines within a small block,
//! the same family of attack Nagravision/Syster uses, so a descrambler
//! needs a short line delay rather than just a same-line cut point to
//! recover it.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::ModeConfig;
use crate::levels::Levels;
use crate::line::{Line, LineProcessor};

use super::ControlWord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideocryptVariant {
    /// Free-access "cut" demo mode: a single fixed cut point.
    I,
    /// Subscription mode II: cut point varies per line across the whole
    /// active window.
    Ii,
    /// Line-shuffle mode: lines within a small block are permuted rather
    /// than cut within themselves.
    S,
}

/// Number of consecutive lines shuffled together under Mode S.
pub const S_BLOCK_SIZE: usize = 4;

/// Line carrying Mode I/II's VBI control-word packet in field 1.
pub const CONTROL_WORD_LINE_VC1: i32 = 284;
/// Line carrying the same packet in field 2.
pub const CONTROL_WORD_LINE_VC2: i32 = 336;
const CONTROL_WORD_BIT_RATE_HZ: f64 = 1_500_000.0;

pub struct VideocryptScrambler {
    variant: VideocryptVariant,
    control_word: ControlWord,
}

impl VideocryptScrambler {
    pub fn new(variant: VideocryptVariant, control_word: ControlWord) -> Self {
        Self {
            variant,
            control_word,
        }
    }

    fn cut_point(&self, active_start: usize, active_len: usize, frame_no: u64, line_no: i32) -> usize {
        let mut rng = self.control_word.keystream(frame_no ^ (line_no as u64) << 32);
        match self.variant {
            VideocryptVariant::I => active_start + active_len / 2,
            VideocryptVariant::Ii | VideocryptVariant::S => {
                active_start + rng.gen_range(0..active_len.max(1))
            }
        }
    }

    fn shuffle_permutation(&self, frame_no: u64, block_no: u64) -> Vec<usize> {
        let mut rng = self
            .control_word
            .keystream(frame_no ^ block_no.wrapping_mul(0xC2B2_AE3D_27D4_EB4F));
        let mut order: Vec<usize> = (0..S_BLOCK_SIZE).collect();
        order.shuffle(&mut rng);
        order
    }

    fn process_cut_rotate(&self, line: &mut Line, mode: &ModeConfig) {
        let line_period_s =
            mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
        let sample_rate = line.video.len() as f64 / line_period_s;
        let start = (mode.active_left_s * sample_rate).round() as usize;
        let width = (mode.active_width_s * sample_rate).round() as usize;
        let end = (start + width).min(line.video.len());
        if start >= end {
            return;
        }

        let cut = self
            .cut_point(start, end - start, line.frame_no, line.line_no)
            .clamp(start, end);

        line.video[start..end].rotate_left(cut - start);
    }

    fn process_line_shuffle(&self, lines: &mut [Line]) {
        if lines.len() < S_BLOCK_SIZE || !lines[0].is_valid() {
            return;
        }
        if lines[0].line_no as u32 % S_BLOCK_SIZE as u32 != 0 {
            return;
        }
        let block_no = (lines[0].line_no as u64) / S_BLOCK_SIZE as u64;
        let order = self.shuffle_permutation(lines[0].frame_no, block_no);

        let originals: Vec<Vec<f64>> = lines[..S_BLOCK_SIZE].iter().map(|l| l.video.clone()).collect();
        for (dst, &src) in order.iter().enumerate() {
            lines[dst].video.copy_from_slice(&originals[src]);
        }
    }

    /// Write the 60-bit control word, packed into 8 bytes, onto the
    /// field's VBI control-word line as an NRZ byte stream. Runs for
    /// every variant; a descrambler recovers the control word from here
    /// regardless of how the picture itself was scrambled.
    fn write_control_word_packet(&self, line: &mut Line, mode: &ModeConfig) {
        if line.line_no != CONTROL_WORD_LINE_VC1 && line.line_no != CONTROL_WORD_LINE_VC2 {
            return;
        }
        let line_period_s =
            mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
        let sample_rate = line.video.len() as f64 / line_period_s;
        let samples_per_bit = (sample_rate / CONTROL_WORD_BIT_RATE_HZ).round().max(1.0) as usize;

        let levels = Levels::from_mode(mode);
        let lo = levels.blanking;
        let hi = levels.blanking + (levels.white - levels.black) * 0.6;

        let start = (mode.active_left_s * sample_rate).round() as usize;
        let mut offset = start;
        for byte in self.control_word.value().to_be_bytes() {
            offset = crate::vbi::write_nrz_byte(&mut line.video, offset, samples_per_bit, byte, lo, hi);
        }
    }
}

impl LineProcessor for VideocryptScrambler {
    fn name(&self) -> &'static str {
        "scrambler-videocrypt"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if line.is_valid() {
            self.write_control_word_packet(line, mode);
        }

        match self.variant {
            VideocryptVariant::S => self.process_line_shuffle(lines),
            VideocryptVariant::I | VideocryptVariant::Ii => {
                let Some(line) = lines.first_mut() else {
                    return;
                };
                if line.is_valid() {
                    self.process_cut_rotate(line, mode);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;

    #[test]
    fn cut_and_rotate_preserves_sample_multiset() {
        let mode = &PAL_I;
        let cw = ControlWord::new(0xDEAD_BEEF_1234).unwrap();
        let mut scrambler = VideocryptScrambler::new(VideocryptVariant::Ii, cw);

        let width = mode.line_width_samples(864.0 * mode.lines as f64 * mode.frame_rate.as_f64());
        let mut line = Line::new(width.max(64));
        line.line_no = 100;
        line.frame_no = 3;
        for (i, s) in line.video.iter_mut().enumerate() {
            *s = i as f64;
        }
        let mut before = line.video.clone();
        scrambler.process(std::slice::from_mut(&mut line), mode);

        before.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut after = line.video.clone();
        after.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(before, after);
    }

    #[test]
    fn variant_i_cuts_at_the_midpoint() {
        let mode = &PAL_I;
        let cw = ControlWord::new(1).unwrap();
        let scrambler = VideocryptScrambler::new(VideocryptVariant::I, cw);
        let cut = scrambler.cut_point(100, 200, 0, 1);
        assert_eq!(cut, 200);
    }

    fn make_s_block(mode: &ModeConfig) -> Vec<Line> {
        let width = mode.line_width_samples(864.0 * mode.lines as f64 * mode.frame_rate.as_f64());
        (0..S_BLOCK_SIZE)
            .map(|i| {
                let mut line = Line::new(width.max(64));
                line.line_no = (i + 1) as i32 + S_BLOCK_SIZE as i32 * 20;
                line.frame_no = 5;
                for (s, sample) in line.video.iter_mut().enumerate() {
                    *sample = (i * 1000 + s) as f64;
                }
                line
            })
            .collect()
    }

    #[test]
    fn mode_s_shuffles_whole_lines_rather_than_cutting_within_one() {
        let mode = &PAL_I;
        let cw = ControlWord::new(0x1357_9BDF).unwrap();
        let mut scrambler = VideocryptScrambler::new(VideocryptVariant::S, cw);
        let mut lines = make_s_block(mode);
        let originals: Vec<Vec<f64>> = lines.iter().map(|l| l.video.clone()).collect();

        scrambler.process(&mut lines, mode);

        // Every resulting line must be one of the originals, verbatim
        // (a cut-and-rotate would instead mangle each line internally).
        for line in &lines {
            assert!(originals.iter().any(|orig| orig == &line.video));
        }
    }

    #[test]
    fn control_word_packet_only_appears_on_its_two_vbi_lines() {
        let mode = &PAL_I;
        let cw = ControlWord::new(0xABCDEF).unwrap();
        let mut scrambler = VideocryptScrambler::new(VideocryptVariant::I, cw);
        let width = mode.line_width_samples(864.0 * mode.lines as f64 * mode.frame_rate.as_f64());

        let mut other = Line::new(width.max(64));
        other.line_no = 100;
        other.frame_no = 1;
        scrambler.process(std::slice::from_mut(&mut other), mode);

        let mut vc1 = Line::new(width.max(64));
        vc1.line_no = CONTROL_WORD_LINE_VC1;
        vc1.frame_no = 1;
        scrambler.process(std::slice::from_mut(&mut vc1), mode);

        assert!(vc1.video.iter().any(|&s| s != 0.0));
    }
}
