//! Video scramblers: Videocrypt I/II/S (cut-and-rotate), Syster/D11 (line
//! shuffle) and the Eurocrypt conditional-access layer carried over
//! D/D2-MAC.
//!
//! None of these reproduce a real pay-TV operator's actual card
//! algorithm — that is explicitly out of scope (spec.md §1 Non-goals).
//! What each scrambler does implement is the *cut/shuffle mechanism*
//! itself, keyed from a 60-bit control word the caller supplies, using a
//! `rand_chacha` keystream as a stand-in for the proprietary one. A real
//! decoder card's descrambling sequence is not reproducible from this
//! substitute, which is the point: this crate scrambles for research and
//! interoperability testing, not conditional-access emulation.

pub mod eurocrypt;
pub mod syster;
pub mod videocrypt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::errors::ScramblerError;

/// A 60-bit Eurocrypt/Videocrypt control word, the secret both the
/// scrambler and a downstream descrambler must share out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlWord(u64);

impl ControlWord {
    pub const MASK: u64 = (1 << 60) - 1;

    pub fn new(value: u64) -> Result<Self, ScramblerError> {
        if value & !Self::MASK != 0 {
            Err(ScramblerError::InvalidControlWord(value))
        } else {
            Ok(Self(value))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Seed a keystream generator from this control word plus a
    /// slow-changing frame counter, so the cut/shuffle sequence changes
    /// every frame without needing a new control word.
    pub(crate) fn keystream(&self, frame_no: u64) -> ChaCha8Rng {
        let mut seed = [0u8; 32];
        seed[0..8].copy_from_slice(&self.0.to_le_bytes());
        seed[8..16].copy_from_slice(&frame_no.to_le_bytes());
        ChaCha8Rng::from_seed(seed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScramblerMode {
    VideocryptI,
    VideocryptII,
    VideocryptS,
    Syster,
    EurocryptMac,
}

impl std::str::FromStr for ScramblerMode {
    type Err = ScramblerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "videocrypt1" | "videocrypt-i" => Ok(Self::VideocryptI),
            "videocrypt2" | "videocrypt-ii" => Ok(Self::VideocryptII),
            "videocrypts" | "videocrypt-s" => Ok(Self::VideocryptS),
            "syster" | "d11" => Ok(Self::Syster),
            "eurocrypt" | "eurocrypt-mac" => Ok(Self::EurocryptMac),
            other => Err(ScramblerError::UnknownMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_word_rejects_out_of_range_values() {
        assert!(ControlWord::new(ControlWord::MASK).is_ok());
        assert!(ControlWord::new(ControlWord::MASK + 1).is_err());
    }

    #[test]
    fn keystream_is_deterministic_for_same_inputs() {
        let cw = ControlWord::new(0x1234_5678_9ABC).unwrap();
        let mut a = cw.keystream(7);
        let mut b = cw.keystream(7);
        use rand::RngCore;
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn mode_parses_known_names() {
        assert_eq!("videocrypt1".parse::<ScramblerMode>().unwrap(), ScramblerMode::VideocryptI);
        assert!("bogus".parse::<ScramblerMode>().is_err());
    }
}
