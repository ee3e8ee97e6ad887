//! Nagravision Syster / D11 line-delay scrambling: rather than cutting a
//! line within itself as Videocrypt does, each line in a block is
//! replaced by a line 0, 1, or 2 line times later in the same block, the
//! delay for each position drawn from a control-word-keyed table. This
//! is a genuine delay, not a permutation — several positions can draw
//! from the same source line, so (unlike Videocrypt) the line multiset
//! is not preserved; a descrambler needs the same delay table and a
//! matching line buffer to undo it.

use rand::Rng;

use crate::config::ModeConfig;
use crate::line::{Line, LineProcessor};

use super::ControlWord;

/// Number of consecutive lines delayed together. Syster decoders need
/// this many lines of delay to recover the original order, which is why
/// this processor needs the engine's full delay-line window, not just
/// `lines[0]` (spec.md §5: the scramblers are the reason the line ring
/// has more than one tap).
pub const BLOCK_SIZE: usize = 32;

/// Largest delay, in line times, the table can assign to a line.
const MAX_DELAY_LINES: usize = 2;

pub struct SysterScrambler {
    control_word: ControlWord,
}

impl SysterScrambler {
    pub fn new(control_word: ControlWord) -> Self {
        Self { control_word }
    }

    fn delay_table(&self, frame_no: u64, block_no: u64) -> [usize; BLOCK_SIZE] {
        let mut rng = self.control_word.keystream(frame_no ^ block_no.wrapping_mul(0x9E37_79B9));
        let mut delays = [0usize; BLOCK_SIZE];
        for delay in delays.iter_mut() {
            *delay = rng.gen_range(0..=MAX_DELAY_LINES);
        }
        delays
    }
}

impl LineProcessor for SysterScrambler {
    fn name(&self) -> &'static str {
        "scrambler-syster"
    }

    fn process(&mut self, lines: &mut [Line], _mode: &ModeConfig) {
        if lines.len() < BLOCK_SIZE || !lines[0].is_valid() {
            return;
        }
        // Only fire once the window holds exactly one fresh block:
        // lines[0] is the last line of it, lines[1..BLOCK_SIZE] the rest.
        // Triggering on every tick would re-delay an already-scrambled
        // window as it slides.
        if lines[0].line_no as u32 % BLOCK_SIZE as u32 != 0 {
            return;
        }
        let block_no = (lines[0].line_no as u64) / BLOCK_SIZE as u64;
        let delays = self.delay_table(lines[0].frame_no, block_no);

        let originals: Vec<Vec<f64>> = lines[..BLOCK_SIZE].iter().map(|l| l.video.clone()).collect();
        for (i, delay) in delays.iter().enumerate() {
            let src = (i + delay) % BLOCK_SIZE;
            lines[i].video.copy_from_slice(&originals[src]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;
    use crate::line::Field;

    fn make_block() -> Vec<Line> {
        // lines[0] is the most recent line of the block and must carry a
        // line number divisible by BLOCK_SIZE to trigger the scrambler;
        // the rest count back from it.
        (0..BLOCK_SIZE)
            .map(|i| {
                let mut line = Line::new(8);
                line.line_no = BLOCK_SIZE as i32 - i as i32;
                line.frame_no = 1;
                line.field = Field::Odd;
                line.video = vec![i as f64; 8];
                line
            })
            .collect()
    }

    #[test]
    fn every_output_line_is_drawn_from_the_original_block() {
        let mode = &PAL_I;
        let cw = ControlWord::new(42).unwrap();
        let mut scrambler = SysterScrambler::new(cw);
        let mut lines = make_block();
        let originals: Vec<Vec<f64>> = lines.iter().map(|l| l.video.clone()).collect();

        scrambler.process(&mut lines, mode);

        for line in &lines {
            assert!(originals.iter().any(|orig| orig == &line.video));
        }
    }

    #[test]
    fn delay_table_moves_at_least_one_line_out_of_place() {
        let mode = &PAL_I;
        let cw = ControlWord::new(0x1234_5678).unwrap();
        let mut scrambler = SysterScrambler::new(cw);
        let mut lines = make_block();
        let originals: Vec<Vec<f64>> = lines.iter().map(|l| l.video.clone()).collect();

        scrambler.process(&mut lines, mode);

        assert!(lines
            .iter()
            .zip(originals.iter())
            .any(|(line, orig)| &line.video != orig));
    }
}
