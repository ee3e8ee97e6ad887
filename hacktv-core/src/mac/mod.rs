//! D/D2-MAC encoder: a packet queue feeding a digital duobinary line
//! coder, scheduled Service Information packets, VSAM picture scrambling,
//! and the line-624/625 frame-sync content, confined to the blanking
//! region so it never collides with the analogue luma/chroma
//! [`crate::engine::paint_active_video`] paints into the active segment.
//! Lines 624 and 625 carry no picture at all, so the digital multiplex
//! fills their whole width instead.

pub mod audio;
pub mod duobinary;
pub mod packet;
pub mod prbs;
pub mod si;

use std::collections::{HashMap, VecDeque};

use crate::config::{ModeConfig, VsamMode};
use crate::errors::MacError;
use crate::line::{Line, LineProcessor};

pub const MAC_CLOCK_RATE: f64 = 20_250_000.0;
pub const PACKET_BITS: usize = 751;
pub const PACKET_BYTES: usize = 94;
pub const PAYLOAD_BITS: usize = 728;
pub const PAYLOAD_BYTES: usize = 91;
pub const QUEUE_LEN: usize = 12;

/// Line carrying the spare-bits/clamp content, `src/mac.c`'s `_line_624`.
pub const LINE_624: u32 = 624;
/// Line carrying the frame sync word and service data field,
/// `src/mac.c`'s `_line_625`.
pub const LINE_625: u32 = 625;

/// 32-bit clock run-in, `src/mac.c`'s `MAC_CRI`.
const MAC_CRI: u32 = 0x5555_5555;
/// 64-bit frame sync word, `src/mac.c`'s `MAC_FSW`, inverted on odd frames.
const MAC_FSW: u64 = 0x65AE_F315_3F41_C246;
/// 32-bit line-624 spare-bits clamp marker, `src/mac.c`'s `MAC_CLAMP`.
const MAC_CLAMP: u32 = 0xEAF3_927F;
/// Line sync word prefixing line 625's service data field, `MAC_LSW`.
const MAC_LSW: u8 = 0x0B;

/// Push `width` bits of `value` (MSB first), one bit per `u8`, matching
/// the bit-vector shape [`packet::MacPacket::to_bits`] returns.
fn push_bits(dst: &mut Vec<u8>, value: u64, width: u32) {
    for i in (0..width).rev() {
        dst.push(((value >> i) & 1) as u8);
    }
}

/// Per-sub-frame packet queue and continuity-index bookkeeping. One MAC
/// line is emitted from the head of this queue every active line; an
/// empty queue falls back to an idle (all-zero payload) stuffing packet
/// so the duobinary line coder always has 751 bits to emit.
pub struct MacEncoder {
    queue: VecDeque<packet::MacPacket>,
    continuity: HashMap<u16, u8>,
    descriptor: crate::config::MacDescriptor,
    frame_no: u64,
    /// PRBS-3 keystream backing payload scrambling and RDF/spare-bit
    /// filler, re-seeded once per frame from the control word.
    payload_prbs: prbs::Prbs3,
    /// PRBS-2 keystream driving the VSAM cut-rotate of the active
    /// picture, re-seeded once per frame.
    vsam_prbs: prbs::Prbs2,
}

impl MacEncoder {
    pub fn new(descriptor: crate::config::MacDescriptor) -> Self {
        let payload_prbs = prbs::Prbs3::reset(descriptor.control_word, 0);
        let vsam_prbs = prbs::Prbs2::reset(descriptor.control_word, 0);
        Self {
            queue: VecDeque::new(),
            continuity: HashMap::new(),
            descriptor,
            frame_no: u64::MAX,
            payload_prbs,
            vsam_prbs,
        }
    }

    pub fn enqueue(&mut self, packet: packet::MacPacket) -> Result<(), MacError> {
        if self.queue.len() >= QUEUE_LEN {
            return Err(MacError::QueueFull { subframe: 0 });
        }
        self.queue.push_back(packet);
        Ok(())
    }

    fn next_continuity(&mut self, addr: u16) -> u8 {
        let entry = self.continuity.entry(addr).or_insert(0);
        let value = *entry;
        *entry = (*entry + 1) & 0x7;
        value
    }

    fn idle_packet(&mut self) -> packet::MacPacket {
        let continuity = self.next_continuity(0x3FE);
        packet::MacPacket::new(0x3FE, continuity, &[0u8; PAYLOAD_BYTES], false)
            .expect("idle payload is always the right length")
    }

    fn maybe_schedule_si(&mut self) {
        if let Some(mut packet) = si::build_si_packet(&self.descriptor, self.frame_no, 0) {
            packet.continuity = self.next_continuity(packet.packet_addr);
            let _ = self.enqueue(packet);
        }
    }

    /// Line 624: spare bits filled from the PRBS-3 stream, closed off by
    /// the clamp marker `src/mac.c`'s `_line_624` writes last.
    fn line_624_bits(&mut self) -> Vec<u8> {
        let mut bits = Vec::with_capacity(PACKET_BITS);
        push_bits(&mut bits, MAC_CRI as u64, 32);
        push_bits(&mut bits, MAC_FSW, 64);
        while bits.len() + 32 < PACKET_BITS {
            bits.push(self.payload_prbs.next_bit());
        }
        push_bits(&mut bits, MAC_CLAMP as u64, 32);
        bits.truncate(PACKET_BITS);
        bits
    }

    /// Line 625: CRI/FSW (inverted on odd frames, `src/mac.c`'s
    /// alternating line 625 content), then the Service Data Field (UDT,
    /// CHID, MVSCG/VSAM, CAFCNT, a simplified Rp/Fp/SIFT block), then RDF
    /// filler from the PRBS-3 stream. The RDF's BCH protection and
    /// Rp/Fp/SIFT sub-fields are not reproduced bit-exact — see
    /// `DESIGN.md`.
    fn line_625_bits(&mut self) -> Vec<u8> {
        let invert = self.frame_no % 2 == 1;
        let cri = if invert { !MAC_CRI } else { MAC_CRI };
        let fsw = if invert { !MAC_FSW } else { MAC_FSW };

        let mut bits = Vec::with_capacity(PACKET_BITS);
        push_bits(&mut bits, cri as u64, 32);
        push_bits(&mut bits, fsw, 64);
        push_bits(&mut bits, MAC_LSW as u64, 8); // UDT
        push_bits(&mut bits, self.descriptor.chid as u64, 16); // CHID
        push_bits(&mut bits, self.descriptor.vsam.mvscg_bits() as u64, 3); // MVSCG
        push_bits(&mut bits, 0, 5); // SDFSCR/unallocated
        push_bits(&mut bits, self.frame_no & 0xFF, 8); // CAFCNT
        push_bits(&mut bits, 0, 2); // Rp, Fp
        push_bits(&mut bits, 0, 2); // SIFT
        while bits.len() < PACKET_BITS {
            bits.push(self.payload_prbs.next_bit());
        }
        bits.truncate(PACKET_BITS);
        bits
    }

    /// Cut-and-rotate the active picture segment under the configured
    /// [`VsamMode`], keyed off the per-frame PRBS-2 stream. `DoubleCut`
    /// additionally mirrors the two halves of the segment around the cut,
    /// a simplified stand-in for the real two-cut-point picture scramble
    /// — see `DESIGN.md`.
    fn apply_vsam_scramble(&mut self, line: &mut Line, start: usize, end: usize) {
        if self.descriptor.vsam == VsamMode::Unscrambled || start >= end {
            return;
        }
        let span = end - start;
        let cut = start + (self.vsam_prbs.next_byte() as usize * span / 256).min(span.saturating_sub(1));
        line.video[start..end].rotate_left(cut - start);

        if self.descriptor.vsam == VsamMode::DoubleCut {
            let mid = start + span / 2;
            line.video[start..mid].reverse();
            line.video[mid..end].reverse();
        }
    }

    fn render_digital(&self, line: &mut Line, bits: &[u8], samples_per_bit: usize, mode: &ModeConfig) {
        let mut encoder = duobinary::DuobinaryEncoder::new();
        let levels = encoder.encode(bits);
        let shaped = duobinary::shape_symbols(&levels, samples_per_bit)
            .expect("fixed RRC pulse parameters are always valid");

        let swing = (mode.white_level - mode.black_level) / 2.0;
        let mid = (mode.white_level + mode.black_level) / 2.0;

        for (idx, sample) in shaped.iter().enumerate() {
            if idx >= line.video.len() {
                break;
            }
            line.video[idx] = mid + swing * (sample / 2.0);
        }
    }
}

impl LineProcessor for MacEncoder {
    fn name(&self) -> &'static str {
        "mac-encoder"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() || mode.mac.is_none() {
            return;
        }

        if line.line_no == 1 && line.frame_no != self.frame_no {
            self.frame_no = line.frame_no;
            self.payload_prbs = prbs::Prbs3::reset(self.descriptor.control_word, self.frame_no as u32);
            self.vsam_prbs = prbs::Prbs2::reset(self.descriptor.control_word, self.frame_no as u32);
            self.maybe_schedule_si();
        }

        let line_period_s =
            mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
        let sample_rate = line.video.len() as f64 / line_period_s;
        let samples_per_bit = (sample_rate / MAC_CLOCK_RATE).round().max(1.0) as usize;
        let start = (mode.active_left_s * sample_rate).round() as usize;
        let width = (mode.active_width_s * sample_rate).round() as usize;
        let end = (start + width).min(line.video.len());

        let line_no = line.line_no as u32;
        let bits = match line_no {
            LINE_624 => self.line_624_bits(),
            LINE_625 => self.line_625_bits(),
            _ => {
                let packet = self.queue.pop_front().unwrap_or_else(|| self.idle_packet());
                packet.to_bits(Some(&mut self.payload_prbs))
            }
        };

        // Lines 624/625 carry no picture, so the digital multiplex may
        // use the whole line; every other active line confines it to the
        // blanking before the analogue picture segment paints in.
        let digital_width = match line_no {
            LINE_624 | LINE_625 => line.video.len(),
            _ => start,
        };
        let digital_bits = (digital_width / samples_per_bit).min(bits.len());
        self.render_digital(line, &bits[..digital_bits], samples_per_bit, mode);

        if !matches!(line_no, LINE_624 | LINE_625) {
            self.apply_vsam_scramble(line, start, end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{D2MAC_FM, MacMode};

    fn test_descriptor() -> crate::config::MacDescriptor {
        crate::config::MacDescriptor {
            mode: MacMode::D2,
            chid: 0xE8B5,
            vsam: VsamMode::Unscrambled,
            control_word: 0x0FFF_FFFF_FFFF_FFFF,
        }
    }

    #[test]
    fn idle_packet_falls_back_when_queue_empty() {
        let mode = &D2MAC_FM;
        let mut enc = MacEncoder::new(test_descriptor());
        let width = mode.line_width_samples(20_250_000.0 * 2.0);
        let mut line = Line::new(width.max(2000));
        line.line_no = 50;
        line.frame_no = 1;
        enc.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn si_packet_is_scheduled_on_frame_boundary() {
        let mode = &D2MAC_FM;
        let mut enc = MacEncoder::new(test_descriptor());
        let width = mode.line_width_samples(20_250_000.0 * 2.0);
        let mut line = Line::new(width.max(2000));
        line.line_no = 1;
        line.frame_no = 0;
        enc.process(std::slice::from_mut(&mut line), mode);
        assert_eq!(enc.queue.len(), 0);
    }

    #[test]
    fn line_624_ends_with_the_clamp_marker() {
        let mut enc = MacEncoder::new(test_descriptor());
        let bits = enc.line_624_bits();
        assert_eq!(bits.len(), PACKET_BITS);
        let mut clamp = 0u32;
        for &b in &bits[bits.len() - 32..] {
            clamp = (clamp << 1) | b as u32;
        }
        assert_eq!(clamp, MAC_CLAMP);
    }

    #[test]
    fn line_625_carries_the_configured_chid() {
        let mut enc = MacEncoder::new(test_descriptor());
        let bits = enc.line_625_bits();
        assert_eq!(bits.len(), PACKET_BITS);
        // CRI (32) + FSW (64) + UDT (8) = 104 bits in, CHID starts.
        let mut chid = 0u32;
        for &b in &bits[104..120] {
            chid = (chid << 1) | b as u32;
        }
        assert_eq!(chid, 0xE8B5);
    }

    #[test]
    fn vsam_scramble_preserves_the_segment_multiset() {
        let mut descriptor = test_descriptor();
        descriptor.vsam = VsamMode::SingleCut;
        let mut enc = MacEncoder::new(descriptor);
        let mut line = Line::new(2000);
        for (i, s) in line.video.iter_mut().enumerate() {
            *s = i as f64;
        }
        let mut before = line.video[100..1900].to_vec();
        enc.apply_vsam_scramble(&mut line, 100, 1900);
        let mut after = line.video[100..1900].to_vec();

        before.sort_by(|a, b| a.partial_cmp(b).unwrap());
        after.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(before, after);
    }

    #[test]
    fn vsam_unscrambled_is_a_no_op() {
        let mut enc = MacEncoder::new(test_descriptor());
        let mut line = Line::new(200);
        for (i, s) in line.video.iter_mut().enumerate() {
            *s = i as f64;
        }
        let before = line.video.clone();
        enc.apply_vsam_scramble(&mut line, 20, 180);
        assert_eq!(line.video, before);
    }
}
