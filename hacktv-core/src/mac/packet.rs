//! MAC packet framing: a 10-bit packet address and 3-bit continuity
//! index, protected by the (23,12) Golay code `src/mac.c` calls
//! `mac_golay_encode`, followed by a 728-bit (91-byte) payload.

use super::prbs::{xor_with_keystream3, Prbs3};
use super::{PACKET_BITS, PACKET_BYTES, PAYLOAD_BYTES};
use crate::errors::MacError;

/// Generator polynomial for the (23,12) binary Golay code used on the
/// packet header.
const GOLAY_GENERATOR: u32 = 0xAE3;

/// Systematic (23,12) Golay encode: returns a 23-bit codeword with the
/// 12 data bits in the high bits and the computed parity in the low 11.
pub fn golay_encode(data: u16) -> u32 {
    debug_assert!(data < 1 << 12);
    let mut reg = (data as u32) << 11;
    for bit in (11..23).rev() {
        if reg & (1 << bit) != 0 {
            reg ^= GOLAY_GENERATOR << (bit - 11);
        }
    }
    ((data as u32) << 11) | (reg & 0x7FF)
}

#[derive(Debug, Clone)]
pub struct MacPacket {
    /// 10-bit packet address identifying the channel/service component.
    pub packet_addr: u16,
    /// 3-bit continuity index, incremented per packet on a given address.
    pub continuity: u8,
    pub payload: [u8; PAYLOAD_BYTES],
    /// Whether the payload is PRBS-3 scrambled for conditional access,
    /// `src/mac.c`'s per-packet `scramble` flag.
    pub scramble: bool,
}

impl MacPacket {
    pub fn new(
        packet_addr: u16,
        continuity: u8,
        payload: &[u8],
        scramble: bool,
    ) -> Result<Self, MacError> {
        if payload.len() != PAYLOAD_BYTES {
            return Err(MacError::BadPayloadLength {
                len: payload.len(),
                expected: PAYLOAD_BYTES,
            });
        }
        let mut buf = [0u8; PAYLOAD_BYTES];
        buf.copy_from_slice(payload);
        Ok(Self {
            packet_addr,
            continuity: continuity & 0x7,
            payload: buf,
            scramble,
        })
    }

    /// Render this packet as the full 751-bit stream (MSB-first), one bit
    /// per `u8`, ready for the duobinary encoder. The payload is first
    /// PRBS-3 scrambled (if `scramble` is set and a keystream is given),
    /// then the whole packet is run through the jumping bit interleave
    /// every MAC packet gets regardless of scrambling.
    pub fn to_bits(&self, prbs: Option<&mut Prbs3>) -> Vec<u8> {
        let header_data = ((self.packet_addr & 0x3FF) << 2) | (self.continuity as u16 & 0x3);
        let codeword = golay_encode(header_data);

        let mut payload = self.payload;
        if self.scramble {
            if let Some(prbs) = prbs {
                xor_with_keystream3(&mut payload, prbs);
            }
        }

        let mut packed = [0u8; PACKET_BYTES];
        let mut bit_pos = 0usize;
        let mut push_bits = |value: u32, width: u32, packed: &mut [u8; PACKET_BYTES], bit_pos: &mut usize| {
            for i in (0..width).rev() {
                let bit = ((value >> i) & 1) as u8;
                let byte = *bit_pos / 8;
                let shift = 7 - (*bit_pos % 8);
                packed[byte] |= bit << shift;
                *bit_pos += 1;
            }
        };
        push_bits(codeword, 23, &mut packed, &mut bit_pos);
        for &byte in &payload {
            push_bits(byte as u32, 8, &mut packed, &mut bit_pos);
        }

        interleave(&mut packed);

        let mut bits = Vec::with_capacity(PACKET_BITS);
        for i in 0..PACKET_BITS {
            let byte = i / 8;
            let shift = 7 - (i % 8);
            bits.push((packed[byte] >> shift) & 1);
        }
        bits
    }
}

/// Convolutional bit interleave over the 94-byte (751-bit, +1 padding
/// bit) packet buffer, ported from `src/mac.c`'s `_interleave`: a sliding
/// one-bit shift register addressed by a cyclic byte index, spreading
/// every packet's bits across its full width so a short noise burst on
/// the duobinary line does not wipe out consecutive source bits.
fn interleave(pkt: &mut [u8; PACKET_BYTES]) {
    let mut work = *pkt;
    let mut d = 0usize;
    for i in 0..(PACKET_BITS + 1) {
        let c = i >> 3;
        pkt[d] = (pkt[d] >> 1) | (work[c] << 7);
        work[c] >>= 1;
        d += 1;
        if d == PACKET_BYTES {
            d = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golay_encode_preserves_data_bits() {
        let codeword = golay_encode(0b1010_1100_0111);
        assert_eq!((codeword >> 11) as u16, 0b1010_1100_0111);
    }

    #[test]
    fn golay_zero_maps_to_zero() {
        assert_eq!(golay_encode(0), 0);
    }

    #[test]
    fn packet_round_trips_payload_length() {
        let payload = [0x5Au8; PAYLOAD_BYTES];
        let packet = MacPacket::new(0x0010, 1, &payload, false).unwrap();
        assert_eq!(packet.payload, payload);
        let bits = packet.to_bits(None);
        assert_eq!(bits.len(), PACKET_BITS);
    }

    #[test]
    fn wrong_payload_length_is_rejected() {
        let payload = vec![0u8; PAYLOAD_BYTES - 1];
        assert!(MacPacket::new(0, 0, &payload, false).is_err());
    }

    #[test]
    fn interleave_is_a_permutation_of_the_packet_bits() {
        let payload = [0xF0u8; PAYLOAD_BYTES];
        let packet = MacPacket::new(0x3FF, 2, &payload, false).unwrap();
        let bits = packet.to_bits(None);
        let ones = bits.iter().filter(|&&b| b == 1).count();
        // Interleaving only reorders bits, it cannot change the weight.
        let header_ones = golay_encode(((0x3FFu16 & 0x3FF) << 2 | 2) as u16).count_ones() as usize;
        let payload_ones = payload.iter().map(|b| b.count_ones() as usize).sum::<usize>();
        assert_eq!(ones, header_ones + payload_ones);
    }

    #[test]
    fn scrambling_changes_the_rendered_bits() {
        let payload = [0x42u8; PAYLOAD_BYTES];
        let plain = MacPacket::new(0x0100, 0, &payload, false).unwrap().to_bits(None);
        let mut prbs = Prbs3::reset(0x0FFF_FFFF_FFFF_FFFF, 0);
        let scrambled = MacPacket::new(0x0100, 0, &payload, true)
            .unwrap()
            .to_bits(Some(&mut prbs));
        assert_ne!(plain, scrambled);
    }
}
