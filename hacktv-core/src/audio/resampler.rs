//! Fractional resampling from the AV source's native audio rate to the
//! reference rate the audio mixer's subcarrier encoders expect (32 kHz
//! for NICAM, 48 kHz for DANCE), built on `rubato`.

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use crate::errors::DspError;

pub struct AudioResampler {
    inner: SincFixedIn<f64>,
    chunk_size: usize,
}

impl AudioResampler {
    pub fn new(from_rate: f64, to_rate: f64, chunk_size: usize) -> Result<Self, DspError> {
        let ratio = to_rate / from_rate;
        if ratio <= 0.0 || !ratio.is_finite() {
            return Err(DspError::FilterDesignFailed {
                reason: format!("invalid resample ratio {ratio}"),
            });
        }

        let params = SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.92,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let inner = SincFixedIn::new(ratio, 2.0, params, chunk_size, 1).map_err(|e| {
            DspError::FilterDesignFailed {
                reason: e.to_string(),
            }
        })?;

        Ok(Self { inner, chunk_size })
    }

    /// Resample one chunk of `chunk_size` mono samples.
    pub fn process(&mut self, input: &[f64]) -> Result<Vec<f64>, DspError> {
        if input.len() != self.chunk_size {
            return Err(DspError::BufferUnderrun {
                requested: self.chunk_size,
                available: input.len(),
            });
        }
        let waves_in = vec![input.to_vec()];
        let waves_out = self
            .inner
            .process(&waves_in, None)
            .map_err(|e| DspError::FilterDesignFailed {
                reason: e.to_string(),
            })?;
        Ok(waves_out.into_iter().next().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resampler_produces_output_for_a_full_chunk() {
        let mut resampler = AudioResampler::new(48_000.0, 32_000.0, 1024).unwrap();
        let input: Vec<f64> = (0..1024)
            .map(|n| (n as f64 * 0.05).sin())
            .collect();
        let output = resampler.process(&input).unwrap();
        assert!(!output.is_empty());
    }

    #[test]
    fn wrong_chunk_size_is_rejected() {
        let mut resampler = AudioResampler::new(48_000.0, 32_000.0, 1024).unwrap();
        let input = vec![0.0; 10];
        assert!(resampler.process(&input).is_err());
    }
}
