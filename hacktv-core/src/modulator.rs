//! The IF modulator: the last stage before a line reaches a
//! [`sink::RadioSink`](crate::sink::RadioSink), turning a real baseband
//! line into a complex-IQ sample sequence (or leaving it as real
//! baseband, for modes configured that way).
//!
//! VSB is approximated rather than reproduced to vestigial-filter
//! accuracy: a Hilbert transformer built from a Kaiser-windowed FIR
//! produces the analytic signal, which gives full upper-sideband energy
//! and, by re-adding a lowpass-filtered copy of the real baseband scaled
//! to the configured `lower_bw_hz`, a controllable vestige of the lower
//! sideband. This is a deliberate simplification of the channel filter
//! a real VSB transmitter would use; see `DESIGN.md`.

use num_complex::Complex64;

use crate::config::{Modulation, ModeConfig};
use crate::errors::DspError;
use crate::filters::{apply_fir, kaiser_lowpass};

fn hilbert_taps(len: usize) -> Vec<f64> {
    let m = (len - 1) as f64 / 2.0;
    let mut taps = vec![0.0; len];
    for (n, tap) in taps.iter_mut().enumerate() {
        let k = n as f64 - m;
        if k == 0.0 {
            *tap = 0.0;
        } else if (k as i64) % 2 == 0 {
            *tap = 0.0;
        } else {
            *tap = 2.0 / (std::f64::consts::PI * k);
        }
        // Hamming window to tame Gibbs ringing at the ends.
        let w = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * n as f64 / (len - 1) as f64).cos();
        *tap *= w;
    }
    taps
}

pub struct IfModulator {
    modulation: Modulation,
    sample_rate: f64,
    phase_acc: f64,
    hilbert: Vec<f64>,
    lower_filter: Option<Vec<f64>>,
}

impl IfModulator {
    pub fn new(mode: &ModeConfig, sample_rate: f64) -> Result<Self, DspError> {
        let (hilbert, lower_filter) = match mode.modulation {
            Modulation::Vsb { lower_bw_hz, .. } => (
                hilbert_taps(65),
                Some(kaiser_lowpass(65, lower_bw_hz.max(1.0), sample_rate, 6.0)?),
            ),
            _ => (Vec::new(), None),
        };

        Ok(Self {
            modulation: mode.modulation,
            sample_rate,
            phase_acc: 0.0,
            hilbert,
            lower_filter,
        })
    }

    /// Modulate one line's worth of real baseband samples to the
    /// configured IF. Only the sample buffer matters here — line number
    /// and field are irrelevant to the IF stage, so callers pass the
    /// buffer directly rather than a whole `Line`.
    pub fn modulate(&mut self, samples: &[f64]) -> Vec<Complex64> {
        match self.modulation {
            Modulation::None => samples.iter().map(|&s| Complex64::new(s, 0.0)).collect(),
            Modulation::Am { carrier_hz } => {
                let mut out = Vec::with_capacity(samples.len());
                let omega = 2.0 * std::f64::consts::PI * carrier_hz / self.sample_rate;
                for &s in samples {
                    self.phase_acc += omega;
                    if self.phase_acc > std::f64::consts::PI {
                        self.phase_acc -= 2.0 * std::f64::consts::PI;
                    } else if self.phase_acc < -std::f64::consts::PI {
                        self.phase_acc += 2.0 * std::f64::consts::PI;
                    }
                    out.push(Complex64::from_polar(s, self.phase_acc));
                }
                out
            }
            Modulation::Fm { deviation_hz, .. } => {
                let mut out = Vec::with_capacity(samples.len());
                for &s in samples {
                    let freq = deviation_hz * s;
                    self.phase_acc += 2.0 * std::f64::consts::PI * freq / self.sample_rate;
                    if self.phase_acc > std::f64::consts::PI {
                        self.phase_acc -= 2.0 * std::f64::consts::PI;
                    } else if self.phase_acc < -std::f64::consts::PI {
                        self.phase_acc += 2.0 * std::f64::consts::PI;
                    }
                    out.push(Complex64::from_polar(1.0, self.phase_acc));
                }
                out
            }
            Modulation::Vsb { .. } => {
                let quadrature = apply_fir(samples, &self.hilbert);
                let lower = self
                    .lower_filter
                    .as_ref()
                    .map(|taps| apply_fir(samples, taps))
                    .unwrap_or_default();

                samples
                    .iter()
                    .zip(quadrature.iter())
                    .enumerate()
                    .map(|(i, (&re, &im))| {
                        let vestige = lower.get(i).copied().unwrap_or(0.0);
                        Complex64::new(re + vestige, im)
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NTSC_M, PAL_I};

    fn make_samples(width: usize) -> Vec<f64> {
        (0..width).map(|i| (i as f64 * 0.1).sin()).collect()
    }

    #[test]
    fn vsb_output_matches_input_length() {
        let mode = &PAL_I;
        let mut modulator = IfModulator::new(mode, 16_000_000.0).unwrap();
        let samples = make_samples(512);
        let out = modulator.modulate(&samples);
        assert_eq!(out.len(), samples.len());
    }

    #[test]
    fn fm_output_samples_are_unit_magnitude() {
        let mode = &NTSC_M;
        let mode = ModeConfig {
            modulation: Modulation::Fm {
                deviation_hz: 25_000.0,
                energy_dispersal: false,
            },
            ..mode.clone()
        };
        let mut modulator = IfModulator::new(&mode, 16_000_000.0).unwrap();
        let samples = make_samples(256);
        let out = modulator.modulate(&samples);
        for sample in out {
            assert!((sample.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn am_output_envelope_tracks_the_input_samples() {
        let mode = ModeConfig {
            modulation: Modulation::Am { carrier_hz: 1_000_000.0 },
            ..PAL_I.clone()
        };
        let mut modulator = IfModulator::new(&mode, 16_000_000.0).unwrap();
        let samples = make_samples(256);
        let out = modulator.modulate(&samples);
        for (s, l) in out.iter().zip(samples.iter()) {
            assert!((s.norm() - l.abs()).abs() < 1e-9);
        }
        // A genuine carrier multiply moves energy off the real axis.
        assert!(out.iter().any(|s| s.im.abs() > 1e-6));
    }

    #[test]
    fn none_modulation_is_identity_on_the_real_axis() {
        let mode = ModeConfig {
            modulation: Modulation::None,
            ..PAL_I.clone()
        };
        let mut modulator = IfModulator::new(&mode, 16_000_000.0).unwrap();
        let samples = make_samples(128);
        let out = modulator.modulate(&samples);
        for (s, l) in out.iter().zip(samples.iter()) {
            assert_eq!(s.re, *l);
            assert_eq!(s.im, 0.0);
        }
    }
}
