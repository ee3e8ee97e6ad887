//! Eurocrypt conditional access carried as data packets inside a D/D2-MAC
//! multiplex: this module builds the Entitlement Control/Management
//! Message (ECM/EMM) envelopes the MAC packet queue carries, not the
//! cryptography inside them — encrypting the control word for a real
//! smartcard population is exactly the "scrambler control-word card
//! algorithm" spec.md §1 puts out of scope. The payload here is whatever
//! the caller already produced (or a fixed placeholder for the simple
//! free-access case).

use crate::mac::packet::MacPacket;

pub const ECM_SERVICE_ID_OFFSET: usize = 0;
pub const ECM_CONTROL_WORD_OFFSET: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct EurocryptEcm {
    pub service_id: u16,
    /// Already-encrypted control word bytes, opaque to this crate.
    pub encrypted_control_word: [u8; 8],
}

impl EurocryptEcm {
    /// Build the MAC payload for this ECM, addressed to sub-frame 0 as
    /// `src/mac.c`'s SI scheduler does for conditional-access packets.
    pub fn to_packet(&self, packet_addr: u16, continuity: u8) -> MacPacket {
        let mut payload = [0u8; crate::mac::PAYLOAD_BYTES];
        payload[ECM_SERVICE_ID_OFFSET..ECM_SERVICE_ID_OFFSET + 2]
            .copy_from_slice(&self.service_id.to_be_bytes());
        payload[ECM_CONTROL_WORD_OFFSET..ECM_CONTROL_WORD_OFFSET + 8]
            .copy_from_slice(&self.encrypted_control_word);

        MacPacket {
            packet_addr,
            continuity,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecm_embeds_service_id_and_control_word() {
        let ecm = EurocryptEcm {
            service_id: 0x1234,
            encrypted_control_word: [0xAA; 8],
        };
        let packet = ecm.to_packet(0x0010, 0);
        assert_eq!(&packet.payload[0..2], &[0x12, 0x34]);
        assert_eq!(&packet.payload[2..10], &[0xAA; 8]);
    }
}
