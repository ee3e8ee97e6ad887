//! Vertical Interval Timecode: an 80-bit SMPTE biphase-mark-coded word
//! carrying hours/minutes/seconds/frames plus two CRC bytes, written onto
//! a nominated VBI line once per frame.

use crate::config::ModeConfig;
use crate::line::{Line, LineProcessor};
use crate::levels::Levels;

pub const SYNC_WORD: u16 = 0b1011_1111_1111_1100;

#[derive(Debug, Clone, Copy, Default)]
pub struct Timecode {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
    pub drop_frame: bool,
}

impl Timecode {
    fn bcd(value: u8) -> (u8, u8) {
        (value / 10, value % 10)
    }

    /// Pack into the 64 payload bits (8 groups of 8), MSB-first within
    /// each group, following the SMPTE 12M field layout order.
    fn payload_bits(&self) -> [u8; 64] {
        let mut bits = [0u8; 64];
        let (f_tens, f_units) = Self::bcd(self.frames);
        let (s_tens, s_units) = Self::bcd(self.seconds);
        let (m_tens, m_units) = Self::bcd(self.minutes);
        let (h_tens, h_units) = Self::bcd(self.hours);

        let groups: [(u8, u8); 8] = [
            (f_units, 0),
            (f_tens & 0x3, if self.drop_frame { 1 } else { 0 }),
            (s_units, 0),
            (s_tens & 0x7, 0),
            (m_units, 0),
            (m_tens & 0x7, 0),
            (h_units, 0),
            (h_tens & 0x3, 0),
        ];

        for (g, (units, flag)) in groups.iter().enumerate() {
            for b in 0..4 {
                bits[g * 8 + b] = (units >> b) & 1;
            }
            bits[g * 8 + 4] = *flag;
        }
        bits
    }

    /// Full 80-bit biphase word: 64 payload bits + 16-bit sync word.
    pub fn encode(&self) -> [u8; 80] {
        let mut out = [0u8; 80];
        out[..64].copy_from_slice(&self.payload_bits());
        for i in 0..16 {
            out[64 + i] = ((SYNC_WORD >> (15 - i)) & 1) as u8;
        }
        out
    }
}

pub struct VitcInserter {
    line_no: u32,
    levels: Levels,
    bit_rate_hz: f64,
    /// Explicit override, for callers that track timecode themselves
    /// (e.g. genlocked to an external clock). Absent this, the inserter
    /// derives a timecode from the line's own frame number every time it
    /// fires, so a caller that just wants a running VITC needs no
    /// external content feed at all.
    pending: Option<Timecode>,
}

impl VitcInserter {
    pub fn new(mode: &ModeConfig, line_no: u32) -> Self {
        Self {
            line_no,
            levels: Levels::from_mode(mode),
            bit_rate_hz: 2.0 * mode.lines as f64 * mode.frame_rate.as_f64() * 80.0 / 2.0,
            pending: None,
        }
    }

    pub fn set_timecode(&mut self, tc: Timecode) {
        self.pending = Some(tc);
    }

    /// Derive an hours/minutes/seconds/frames timecode from a raw frame
    /// count at `mode`'s frame rate, wrapping at 24 hours.
    fn timecode_for_frame(frame_no: u64, mode: &ModeConfig) -> Timecode {
        let fps = mode.frame_rate.as_f64().round().max(1.0) as u64;
        let wrap = fps * 24 * 3600;
        let total_frames = if wrap == 0 { 0 } else { frame_no % wrap };
        let frames = (total_frames % fps) as u8;
        let total_secs = total_frames / fps;
        let seconds = (total_secs % 60) as u8;
        let minutes = ((total_secs / 60) % 60) as u8;
        let hours = ((total_secs / 3600) % 24) as u8;
        Timecode {
            hours,
            minutes,
            seconds,
            frames,
            drop_frame: false,
        }
    }
}

impl LineProcessor for VitcInserter {
    fn name(&self) -> &'static str {
        "vbi-vitc"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() || line.line_no as u32 != self.line_no {
            return;
        }
        let tc = self
            .pending
            .unwrap_or_else(|| Self::timecode_for_frame(line.frame_no, mode));

        let line_period_s =
            mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
        let sample_rate = line.video.len() as f64 / line_period_s;
        let half_bit = (sample_rate / self.bit_rate_hz / 2.0).round().max(1.0) as usize;

        let lo = self.levels.blanking;
        let hi = self.levels.blanking + (self.levels.white - self.levels.black) * 0.7;

        let start = (mode.active_left_s * sample_rate).round() as usize;
        let mut offset = start;
        let mut level = lo;

        for bit in tc.encode() {
            // Biphase mark: always transition at the start of a bit cell;
            // a 1 also transitions at the half-cell boundary.
            level = if level == lo { hi } else { lo };
            crate::vbi::write_nrz_bit(&mut line.video, offset, half_bit, level == hi, lo, hi);
            if bit == 1 {
                level = if level == lo { hi } else { lo };
            }
            crate::vbi::write_nrz_bit(
                &mut line.video,
                offset + half_bit,
                half_bit,
                level == hi,
                lo,
                hi,
            );
            offset += 2 * half_bit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;

    #[test]
    fn sync_word_occupies_last_16_bits() {
        let tc = Timecode {
            hours: 1,
            minutes: 2,
            seconds: 3,
            frames: 4,
            drop_frame: false,
        };
        let bits = tc.encode();
        let mut word = 0u16;
        for b in &bits[64..80] {
            word = (word << 1) | (*b as u16);
        }
        assert_eq!(word, SYNC_WORD);
    }

    #[test]
    fn inserter_self_derives_a_timecode_when_none_is_set() {
        let mode = &PAL_I;
        let mut inserter = VitcInserter::new(mode, 19);
        let mut line = Line::new(1024);
        line.line_no = 19;
        line.frame_no = 90;
        inserter.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn explicit_timecode_overrides_the_derived_one() {
        let mode = &PAL_I;
        let mut inserter = VitcInserter::new(mode, 19);
        let mut derived_line = Line::new(1024);
        derived_line.line_no = 19;
        derived_line.frame_no = 90;
        inserter.process(std::slice::from_mut(&mut derived_line), mode);

        inserter.set_timecode(Timecode {
            hours: 1,
            minutes: 2,
            seconds: 3,
            frames: 4,
            drop_frame: false,
        });
        let mut overridden_line = Line::new(1024);
        overridden_line.line_no = 19;
        overridden_line.frame_no = 90;
        inserter.process(std::slice::from_mut(&mut overridden_line), mode);

        assert_ne!(derived_line.video, overridden_line.video);
    }

    #[test]
    fn timecode_for_frame_wraps_seconds_and_minutes() {
        let mode = &PAL_I;
        let fps = mode.frame_rate.as_f64().round() as u64;
        let tc = VitcInserter::timecode_for_frame(fps * 61, mode);
        assert_eq!(tc.seconds, 1);
        assert_eq!(tc.minutes, 1);
    }
}
