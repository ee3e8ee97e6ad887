//! MAC sound-in-syncs audio encoding: PCM samples are companded down
//! from 14 to 10 bits and packed into the audio packet stream that rides
//! alongside the vision packets in the same multiplex (`mac_audioenc_*`
//! in `src/mac.c`).

/// Compand a 14-bit linear sample to a 10-bit near-instantaneous
/// companded sample, the "MEDIUM_QUALITY"/companded profile.
pub fn compand_14_to_10(sample: i16) -> u16 {
    let magnitude = sample.unsigned_abs().min(0x1FFF);
    let sign = if sample < 0 { 1u16 } else { 0u16 };

    // Pick the highest segment whose lower bound the magnitude clears;
    // eight segments of doubling size, matching a standard
    // near-instantaneous-companding (NICAM/A-law-style) ladder.
    let mut segment = 0u16;
    let mut lower = 0u32;
    let mut step = 1u32;
    for s in 0..8 {
        let width = step * 16;
        if (magnitude as u32) < lower + width || s == 7 {
            segment = s as u16;
            break;
        }
        lower += width;
        step *= 2;
    }
    let step = 1u32 << segment;
    let mantissa = ((magnitude as u32 - lower) / step).min(15) as u16;

    (sign << 9) | (segment << 4) | mantissa
}

pub fn expand_10_to_14(code: u16) -> i16 {
    let sign = (code >> 9) & 1;
    let segment = (code >> 4) & 0xF;
    let mantissa = code & 0xF;
    let step = 1u32 << segment;
    let lower: u32 = if segment == 0 {
        0
    } else {
        (0..segment).map(|s| (1u32 << s) * 16).sum()
    };
    let magnitude = lower + mantissa as u32 * step;
    if sign == 1 {
        -(magnitude as i32).min(0x1FFF) as i16
    } else {
        (magnitude as i32).min(0x1FFF) as i16
    }
}

/// Pack a block of 10-bit companded samples MSB-first into bytes for a
/// MAC audio packet payload.
pub fn pack_companded_block(samples: &[u16]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(samples.len() * 10);
    for &s in samples {
        for i in (0..10).rev() {
            bits.push(((s >> i) & 1) as u8);
        }
    }
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_companders_to_zero() {
        assert_eq!(compand_14_to_10(0), 0);
    }

    #[test]
    fn companding_is_monotonic_in_magnitude() {
        let mut last = 0u16;
        for sample in (0..0x1FFFi16).step_by(211) {
            let code = compand_14_to_10(sample) & 0x1FF;
            assert!(code >= last, "companded code should not decrease with magnitude");
            last = code;
        }
    }

    #[test]
    fn sign_bit_round_trips() {
        let pos = compand_14_to_10(1000);
        let neg = compand_14_to_10(-1000);
        assert_eq!(pos & 0x1FF, neg & 0x1FF);
        assert_ne!(pos & 0x200, neg & 0x200);
    }
}
