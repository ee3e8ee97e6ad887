//! Teletext line insertion: clock run-in, framing code and 40 data bytes
//! NRZ-encoded at roughly 6.9375 Mbit/s (444 * line rate for 625-line
//! systems). Page content, character rounding and font rasterisation are
//! not this crate's job — packets arrive pre-built as 45-byte buffers
//! (2 clock run-in bytes, 1 framing code, 42 data bytes) from the AV
//! source's teletext collaborator.

use std::collections::VecDeque;

use crate::config::ModeConfig;
use crate::line::{Line, LineProcessor};
use crate::levels::Levels;

pub const CLOCK_RUN_IN: [u8; 2] = [0x55, 0x55];
pub const FRAMING_CODE: u8 = 0x27;
pub const PACKET_BYTES: usize = 42;

/// One fully assembled teletext packet, ready to be clocked onto a line.
#[derive(Debug, Clone)]
pub struct TeletextPacket {
    pub line_no: u32,
    pub data: [u8; PACKET_BYTES],
}

pub struct TeletextInserter {
    pending: VecDeque<TeletextPacket>,
    bit_rate_hz: f64,
    levels: Levels,
}

impl TeletextInserter {
    pub fn new(mode: &ModeConfig, bit_rate_hz: f64) -> Self {
        Self {
            pending: VecDeque::new(),
            bit_rate_hz,
            levels: Levels::from_mode(mode),
        }
    }

    pub fn queue(&mut self, packet: TeletextPacket) {
        self.pending.push_back(packet);
    }
}

impl LineProcessor for TeletextInserter {
    fn name(&self) -> &'static str {
        "vbi-teletext"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() {
            return;
        }
        let Some(pos) = self
            .pending
            .iter()
            .position(|p| p.line_no == line.line_no as u32)
        else {
            return;
        };
        let packet = self.pending.remove(pos).expect("position was just found");

        let line_period_s =
            mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
        let sample_rate = line.video.len() as f64 / line_period_s;

        let samples_per_bit = (sample_rate / self.bit_rate_hz).round().max(1.0) as usize;

        let lo = self.levels.blanking;
        let hi = self.levels.blanking + (self.levels.white - self.levels.black) * 0.66;

        let start = (mode.active_left_s * sample_rate).round() as usize;

        let mut offset = start;
        for &b in &CLOCK_RUN_IN {
            offset = crate::vbi::write_nrz_byte(&mut line.video, offset, samples_per_bit, b, lo, hi);
        }
        offset = crate::vbi::write_nrz_byte(
            &mut line.video,
            offset,
            samples_per_bit,
            FRAMING_CODE,
            lo,
            hi,
        );
        for &b in &packet.data {
            offset = crate::vbi::write_nrz_byte(&mut line.video, offset, samples_per_bit, b, lo, hi);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;

    #[test]
    fn queued_packet_is_consumed_on_its_line() {
        let mode = &PAL_I;
        let mut inserter = TeletextInserter::new(mode, 6_937_500.0);
        inserter.queue(TeletextPacket {
            line_no: 7,
            data: [0xAAu8; PACKET_BYTES],
        });
        let mut line = Line::new(1024);
        line.line_no = 7;
        inserter.process(std::slice::from_mut(&mut line), mode);
        assert!(inserter.pending.is_empty());
        assert!(line.video.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn other_lines_are_left_untouched() {
        let mode = &PAL_I;
        let mut inserter = TeletextInserter::new(mode, 6_937_500.0);
        inserter.queue(TeletextPacket {
            line_no: 7,
            data: [0xAAu8; PACKET_BYTES],
        });
        let mut line = Line::new(1024);
        line.line_no = 8;
        inserter.process(std::slice::from_mut(&mut line), mode);
        assert_eq!(inserter.pending.len(), 1);
        assert!(line.video.iter().all(|&s| s == 0.0));
    }
}
