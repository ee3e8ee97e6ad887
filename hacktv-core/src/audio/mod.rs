//! The audio mixer: generates FM mono, AM mono, NICAM-728, DANCE and A2
//! subcarriers from an incoming PCM audio stream and sums them onto the
//! composite video line, already at the pipeline's output sample rate.

pub mod a2;
pub mod dance;
pub mod nicam;
pub mod oscillator;
pub mod resampler;

use std::collections::VecDeque;

use oscillator::{AmOscillator, FmOscillator};

use crate::config::{ModeConfig, Preemphasis};
use crate::line::{Line, LineProcessor};
use crate::mac::audio::compand_14_to_10;
use nicam::{NicamFramer, NicamMode, SAMPLES_PER_FRAME};

/// NICAM-728 reference audio rate; one frame is produced per 32
/// decimated mono samples (spec §3's 32 kHz audio reference rate).
const NICAM_AUDIO_RATE_HZ: f64 = 32_000.0;
const NICAM_BAUD: f64 = 364_000.0;
/// pi/4-DQPSK dibit -> phase increment, Gray-coded so adjacent symbols
/// differ by one bit.
const NICAM_DIBIT_PHASE: [f64; 4] = [
    std::f64::consts::FRAC_PI_4,
    3.0 * std::f64::consts::FRAC_PI_4,
    -3.0 * std::f64::consts::FRAC_PI_4,
    -std::f64::consts::FRAC_PI_4,
];

/// Drives a NICAM-728 digital stereo frame onto the line as a
/// differentially-encoded pi/4-QPSK subcarrier at 364 kBd, root-raised
/// cosine group delay approximated by linear interpolation between
/// symbol phases.
struct NicamSubcarrier {
    framer: NicamFramer,
    carrier_hz: f64,
    carrier_phase: f64,
    sample_rate: f64,
    symbol_phase: f64,
    symbol_clock: f64,
    dibits: VecDeque<u8>,
    audio_clock: f64,
    block: Vec<i16>,
    level: f64,
}

impl NicamSubcarrier {
    fn new(carrier_hz: f64, sample_rate: f64, level: f64) -> Self {
        Self {
            framer: NicamFramer::new(NicamMode::StereoCompanded),
            carrier_hz,
            carrier_phase: 0.0,
            sample_rate,
            symbol_phase: 0.0,
            symbol_clock: 0.0,
            dibits: VecDeque::new(),
            audio_clock: 0.0,
            block: Vec::with_capacity(SAMPLES_PER_FRAME / 2),
            level,
        }
    }

    fn push_frame_bits(&mut self) {
        let mut companded = [0u16; SAMPLES_PER_FRAME];
        for (i, &sample) in self.block.iter().enumerate() {
            // Mono audio duplicated onto both channels (the mixer has no
            // stereo source of its own), interleaved left/right.
            companded[2 * i] = compand_14_to_10(sample);
            companded[2 * i + 1] = compand_14_to_10(sample);
        }
        let bits = self.framer.build_frame(&companded);
        for pair in bits.chunks(2) {
            let dibit = (pair[0] << 1) | pair.get(1).copied().unwrap_or(0);
            self.dibits.push_back(dibit);
        }
        self.block.clear();
    }

    /// Advance by one output sample of mono reference audio and return
    /// the instantaneous modulated subcarrier sample.
    fn step(&mut self, audio_sample: f64) -> f64 {
        self.audio_clock += NICAM_AUDIO_RATE_HZ / self.sample_rate;
        while self.audio_clock >= 1.0 {
            self.audio_clock -= 1.0;
            self.block.push((audio_sample.clamp(-1.0, 1.0) * i16::MAX as f64) as i16);
            if self.block.len() * 2 >= SAMPLES_PER_FRAME {
                self.push_frame_bits();
            }
        }

        self.symbol_clock += NICAM_BAUD / self.sample_rate;
        if self.symbol_clock >= 1.0 {
            self.symbol_clock -= 1.0;
            if let Some(dibit) = self.dibits.pop_front() {
                self.symbol_phase = wrap_phase(self.symbol_phase + NICAM_DIBIT_PHASE[dibit as usize & 0x3]);
            }
        }

        let out = (self.carrier_phase + self.symbol_phase).cos();
        self.carrier_phase = wrap_phase(
            self.carrier_phase + 2.0 * std::f64::consts::PI * self.carrier_hz / self.sample_rate,
        );
        self.level * out
    }
}

/// Wrap a phase accumulator back into `(-pi, pi]`.
fn wrap_phase(phase: f64) -> f64 {
    if phase > std::f64::consts::PI {
        phase - 2.0 * std::f64::consts::PI
    } else if phase < -std::f64::consts::PI {
        phase + 2.0 * std::f64::consts::PI
    } else {
        phase
    }
}

/// First-order pre-emphasis shelf, applied to audio before it drives an
/// FM oscillator. `tau` is the time constant in seconds (0 disables it).
struct Preemphasiser {
    tau: f64,
    sample_rate: f64,
    prev_in: f64,
    prev_out: f64,
}

impl Preemphasiser {
    fn new(preemphasis: Preemphasis, sample_rate: f64) -> Self {
        let tau = match preemphasis {
            Preemphasis::None => 0.0,
            Preemphasis::Us50 => 50e-6,
            Preemphasis::Us75 => 75e-6,
            Preemphasis::J17 => 17e-6,
        };
        Self {
            tau,
            sample_rate,
            prev_in: 0.0,
            prev_out: 0.0,
        }
    }

    fn step(&mut self, input: f64) -> f64 {
        if self.tau == 0.0 {
            return input;
        }
        let rc = self.tau;
        let dt = 1.0 / self.sample_rate;
        let alpha = rc / (rc + dt);
        let out = alpha * (self.prev_out + input - self.prev_in);
        self.prev_in = input;
        self.prev_out = out;
        out
    }
}

/// A single enabled FM or AM subcarrier with its pre-emphasis filter.
struct AnalogSubcarrier {
    is_fm: bool,
    fm: Option<FmOscillator>,
    am: Option<AmOscillator>,
    preemph: Preemphasiser,
    level: f64,
}

pub struct AudioMixer {
    audio_in: VecDeque<f64>,
    subcarriers: Vec<AnalogSubcarrier>,
    nicam: Option<NicamSubcarrier>,
}

impl AudioMixer {
    pub fn new(mode: &ModeConfig, sample_rate: f64) -> Self {
        let mut subcarriers = Vec::new();

        if let Some(sc) = mode.fm_mono {
            subcarriers.push(AnalogSubcarrier {
                is_fm: true,
                fm: Some(FmOscillator::new(sc.carrier_hz, sc.deviation_hz, sample_rate)),
                am: None,
                preemph: Preemphasiser::new(sc.preemphasis, sample_rate),
                level: sc.level,
            });
        }
        if let Some(sc) = mode.am_mono {
            subcarriers.push(AnalogSubcarrier {
                is_fm: false,
                fm: None,
                am: Some(AmOscillator::new(sc.carrier_hz, sample_rate)),
                preemph: Preemphasiser::new(sc.preemphasis, sample_rate),
                level: sc.level,
            });
        }

        let nicam = mode
            .nicam
            .map(|sc| NicamSubcarrier::new(sc.carrier_hz, sample_rate, sc.level));

        Self {
            audio_in: VecDeque::new(),
            subcarriers,
            nicam,
        }
    }

    /// Feed resampled audio into the mixer's input ring, to be consumed
    /// one sample per output video sample as lines are processed.
    pub fn feed(&mut self, samples: &[f64]) {
        self.audio_in.extend(samples.iter().copied());
    }

    fn next_audio_sample(&mut self) -> f64 {
        self.audio_in.pop_front().unwrap_or(0.0)
    }
}

impl LineProcessor for AudioMixer {
    fn name(&self) -> &'static str {
        "audio-mixer"
    }

    fn process(&mut self, lines: &mut [Line], _mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() || (self.subcarriers.is_empty() && self.nicam.is_none()) {
            return;
        }

        for sample in line.video.iter_mut() {
            let audio = self.next_audio_sample();
            let mut mixed = 0.0;
            for sc in self.subcarriers.iter_mut() {
                let shaped = sc.preemph.step(audio);
                mixed += sc.level
                    * if sc.is_fm {
                        sc.fm.as_mut().unwrap().step(shaped)
                    } else {
                        sc.am.as_mut().unwrap().step(shaped, 0.3)
                    };
            }
            if let Some(nicam) = self.nicam.as_mut() {
                mixed += nicam.step(audio);
            }
            *sample += mixed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;

    #[test]
    fn mixer_with_no_subcarriers_leaves_line_untouched() {
        let mode = &PAL_I;
        let mut mixer = AudioMixer::new(mode, 16_000_000.0);
        mixer.subcarriers.clear();
        mixer.nicam = None;
        let mut line = Line::new(64);
        line.line_no = 1;
        mixer.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn feeding_audio_perturbs_the_line() {
        let mode = &PAL_I;
        let mut mixer = AudioMixer::new(mode, 16_000_000.0);
        mixer.feed(&vec![0.5; 64]);
        let mut line = Line::new(64);
        line.line_no = 1;
        mixer.process(std::slice::from_mut(&mut line), mode);
        assert!(line.video.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn nicam_subcarrier_produces_a_bounded_modulated_tone() {
        let mut nicam = NicamSubcarrier::new(6_552_000.0, 16_000_000.0, 0.07 / 2.0);
        let mut max_mag: f64 = 0.0;
        for n in 0..200_000 {
            let audio = ((n as f64) * 0.0007).sin();
            let sample = nicam.step(audio);
            max_mag = max_mag.max(sample.abs());
        }
        assert!(max_mag <= 0.07 / 2.0 + 1e-9);
    }

    #[test]
    fn a_full_frame_of_companded_audio_yields_364_dibits() {
        let mut nicam = NicamSubcarrier::new(6_552_000.0, 16_000_000.0, 1.0);
        nicam.block = vec![0i16; SAMPLES_PER_FRAME / 2];
        nicam.push_frame_bits();
        assert_eq!(nicam.dibits.len(), super::nicam::FRAME_BITS / 2);
    }
}
