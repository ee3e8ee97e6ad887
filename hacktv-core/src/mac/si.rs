//! Service Information scheduler: decides which frames carry a DG0
//! (service description) or DG3 (network/bouquet) packet.
//!
//! Resolved per SPEC_FULL §9 by following `src/mac.c`: both data groups
//! are scheduled every 4 frames, on both sub-frames.

use super::packet::MacPacket;
use crate::config::MacDescriptor;

pub const SI_SCHEDULE_PERIOD_FRAMES: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiDataGroup {
    Dg0,
    Dg3,
}

pub fn due_this_frame(frame_no: u64) -> Option<SiDataGroup> {
    if frame_no % SI_SCHEDULE_PERIOD_FRAMES != 0 {
        return None;
    }
    if (frame_no / SI_SCHEDULE_PERIOD_FRAMES) % 2 == 0 {
        Some(SiDataGroup::Dg0)
    } else {
        Some(SiDataGroup::Dg3)
    }
}

/// Build the SI packet due this frame, if any, addressed to the
/// well-known SI packet address (0x3FF, the MAC convention for service
/// information). Never PRBS-3 scrambled: a receiver must be able to read
/// service information before it has acquired conditional access.
pub fn build_si_packet(
    descriptor: &MacDescriptor,
    frame_no: u64,
    continuity: u8,
) -> Option<MacPacket> {
    let group = due_this_frame(frame_no)?;
    let mut payload = [0u8; super::PAYLOAD_BYTES];
    payload[0] = match group {
        SiDataGroup::Dg0 => 0,
        SiDataGroup::Dg3 => 3,
    };
    payload[1..3].copy_from_slice(&descriptor.chid.to_be_bytes());
    if group == SiDataGroup::Dg3 {
        payload[3] = descriptor.vsam.mvscg_bits();
    }
    MacPacket::new(0x3FF, continuity, &payload, false).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MacMode, VsamMode};

    fn test_descriptor() -> MacDescriptor {
        MacDescriptor {
            mode: MacMode::D2,
            chid: 0xE8B5,
            vsam: VsamMode::SingleCut,
            control_word: 0x0FFF_FFFF_FFFF_FFFF,
        }
    }

    #[test]
    fn si_packets_are_due_every_four_frames() {
        assert_eq!(due_this_frame(0), Some(SiDataGroup::Dg0));
        assert_eq!(due_this_frame(1), None);
        assert_eq!(due_this_frame(4), Some(SiDataGroup::Dg3));
        assert_eq!(due_this_frame(8), Some(SiDataGroup::Dg0));
    }

    #[test]
    fn packet_carries_the_configured_chid() {
        let packet = build_si_packet(&test_descriptor(), 0, 0).unwrap();
        assert_eq!(&packet.payload[1..3], &0xE8B5u16.to_be_bytes());
    }

    #[test]
    fn dg3_packet_carries_the_vsam_byte() {
        let packet = build_si_packet(&test_descriptor(), 4, 0).unwrap();
        assert_eq!(packet.payload[3], VsamMode::SingleCut.mvscg_bits());
    }
}
