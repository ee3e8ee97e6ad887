//! A2 (Zweikanalton/dual-FM) stereo: a second FM subcarrier one line
//! frequency above the mono carrier, plus a 54.6875 kHz pilot tone that
//! signals stereo/dual-language mode to a receiver.

use super::oscillator::FmOscillator;

pub const PILOT_STEREO_HZ: f64 = 54_687.5;
pub const PILOT_DUAL_HZ: f64 = 117_187.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum A2Identification {
    Mono,
    Stereo,
    Dual,
}

pub struct A2Encoder {
    carrier2: FmOscillator,
    pilot_hz: f64,
    pilot_phase: f64,
    sample_rate: f64,
}

impl A2Encoder {
    pub fn new(carrier2_hz: f64, deviation_hz: f64, sample_rate: f64, id: A2Identification) -> Self {
        Self {
            carrier2: FmOscillator::new(carrier2_hz, deviation_hz, sample_rate),
            pilot_hz: match id {
                A2Identification::Mono => 0.0,
                A2Identification::Stereo => PILOT_STEREO_HZ,
                A2Identification::Dual => PILOT_DUAL_HZ,
            },
            pilot_phase: 0.0,
            sample_rate,
        }
    }

    /// One sample of the second FM subcarrier plus its identification
    /// pilot, scaled by `level` relative to the first (mono-compatible)
    /// carrier which the caller mixes separately.
    pub fn step(&mut self, audio_sample: f64, level: f64) -> f64 {
        let carrier = self.carrier2.step(audio_sample);
        let pilot = if self.pilot_hz > 0.0 {
            let p = self.pilot_phase.sin() * 0.1;
            self.pilot_phase += 2.0 * std::f64::consts::PI * self.pilot_hz / self.sample_rate;
            if self.pilot_phase > std::f64::consts::PI {
                self.pilot_phase -= 2.0 * std::f64::consts::PI;
            }
            p
        } else {
            0.0
        };
        level * (carrier + pilot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_identification_has_no_pilot() {
        let mut enc = A2Encoder::new(6_258_000.0, 50_000.0, 16_000_000.0, A2Identification::Mono);
        assert_eq!(enc.pilot_hz, 0.0);
        let _ = enc.step(0.0, 1.0);
    }

    #[test]
    fn stereo_identification_picks_the_stereo_pilot() {
        let enc = A2Encoder::new(6_258_000.0, 50_000.0, 16_000_000.0, A2Identification::Stereo);
        assert_eq!(enc.pilot_hz, PILOT_STEREO_HZ);
    }
}
