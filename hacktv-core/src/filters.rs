//! The filter bank: Kaiser-window FIR design for the VSB/low-pass
//! shaping filters the IF modulator needs, an RRC pulse for the MAC
//! duobinary line, and rational resampling (reduced via GCD) between
//! arbitrary sample rates.

use crate::config::gcd;
use crate::errors::DspError;

/// Zeroth-order modified Bessel function of the first kind, the one
/// transcendental a Kaiser window needs, evaluated by its series.
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1.0;
    while term > 1e-12 * sum {
        term *= (x / (2.0 * k)).powi(2);
        sum += term;
        k += 1.0;
    }
    sum
}

/// Design a symmetric low-pass FIR filter of `taps` coefficients with a
/// Kaiser window of shape parameter `beta`, cutoff `cutoff_hz` at
/// `sample_rate`.
pub fn kaiser_lowpass(taps: usize, cutoff_hz: f64, sample_rate: f64, beta: f64) -> Result<Vec<f64>, DspError> {
    if taps == 0 || taps % 2 == 0 {
        return Err(DspError::FilterDesignFailed {
            reason: "filter length must be odd and non-zero".to_string(),
        });
    }
    if cutoff_hz <= 0.0 || cutoff_hz >= sample_rate / 2.0 {
        return Err(DspError::FilterDesignFailed {
            reason: format!("cutoff {cutoff_hz} Hz out of range for sample rate {sample_rate} Hz"),
        });
    }

    let m = (taps - 1) as f64;
    let fc = cutoff_hz / sample_rate;
    let i0_beta = bessel_i0(beta);

    let mut coeffs = Vec::with_capacity(taps);
    for n in 0..taps {
        let k = n as f64 - m / 2.0;
        let sinc = if k == 0.0 {
            2.0 * fc
        } else {
            (2.0 * std::f64::consts::PI * fc * k).sin() / (std::f64::consts::PI * k)
        };
        let ratio = 2.0 * n as f64 / m - 1.0;
        let window = bessel_i0(beta * (1.0 - ratio * ratio).max(0.0).sqrt()) / i0_beta;
        coeffs.push(sinc * window);
    }

    let sum: f64 = coeffs.iter().sum();
    if sum != 0.0 {
        for c in coeffs.iter_mut() {
            *c /= sum;
        }
    }

    Ok(coeffs)
}

/// Root-raised-cosine pulse for the MAC duobinary line, normalised to
/// unit energy.
pub fn rrc_pulse(taps: usize, rolloff: f64, symbol_period_samples: f64) -> Result<Vec<f64>, DspError> {
    if !(0.0..=1.0).contains(&rolloff) {
        return Err(DspError::FilterDesignFailed {
            reason: format!("rolloff {rolloff} out of [0, 1]"),
        });
    }
    if taps == 0 || taps % 2 == 0 {
        return Err(DspError::FilterDesignFailed {
            reason: "filter length must be odd and non-zero".to_string(),
        });
    }

    let m = (taps - 1) as f64 / 2.0;
    let t_sym = symbol_period_samples;
    let mut coeffs = Vec::with_capacity(taps);

    for n in 0..taps {
        let t = (n as f64 - m) / t_sym;
        let value = if t.abs() < 1e-8 {
            1.0 - rolloff + 4.0 * rolloff / std::f64::consts::PI
        } else if (4.0 * rolloff * t).abs() - 1.0 == 0.0 {
            let x = std::f64::consts::PI / (4.0 * rolloff);
            (rolloff / (2.0_f64).sqrt())
                * ((1.0 + 2.0 / std::f64::consts::PI) * x.sin() + (1.0 - 2.0 / std::f64::consts::PI) * x.cos())
        } else {
            let numerator = (std::f64::consts::PI * t * (1.0 - rolloff)).sin()
                + 4.0 * rolloff * t * (std::f64::consts::PI * t * (1.0 + rolloff)).cos();
            let denominator =
                std::f64::consts::PI * t * (1.0 - (4.0 * rolloff * t).powi(2));
            numerator / denominator
        };
        coeffs.push(value);
    }

    let energy: f64 = coeffs.iter().map(|c| c * c).sum::<f64>().sqrt();
    if energy != 0.0 {
        for c in coeffs.iter_mut() {
            *c /= energy;
        }
    }

    Ok(coeffs)
}

/// Reduce an `interpolation`/`decimation` rational resample ratio to
/// lowest terms via the config module's `gcd`.
pub fn reduce_resample_ratio(interpolation: usize, decimation: usize) -> Result<(usize, usize), DspError> {
    let g = gcd(interpolation as u64, decimation as u64);
    if g == 0 {
        return Err(DspError::DegenerateResampleRatio {
            interpolation,
            decimation,
        });
    }
    Ok(((interpolation as u64 / g) as usize, (decimation as u64 / g) as usize))
}

/// Apply an FIR filter to `input`, valid-length convolution with
/// zero-padding at the edges (same length as input).
pub fn apply_fir(input: &[f64], taps: &[f64]) -> Vec<f64> {
    let half = taps.len() / 2;
    let mut out = vec![0.0; input.len()];
    for (i, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (k, &tap) in taps.iter().enumerate() {
            let idx = i as isize + k as isize - half as isize;
            if idx >= 0 && (idx as usize) < input.len() {
                acc += tap * input[idx as usize];
            }
        }
        *o = acc;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kaiser_lowpass_is_symmetric() {
        let taps = kaiser_lowpass(31, 1_000_000.0, 8_000_000.0, 6.0).unwrap();
        for i in 0..taps.len() / 2 {
            assert!((taps[i] - taps[taps.len() - 1 - i]).abs() < 1e-9);
        }
    }

    #[test]
    fn kaiser_lowpass_rejects_even_length() {
        assert!(kaiser_lowpass(30, 1_000_000.0, 8_000_000.0, 6.0).is_err());
    }

    #[test]
    fn rrc_pulse_has_unit_energy() {
        let taps = rrc_pulse(65, 0.35, 4.0).unwrap();
        let energy: f64 = taps.iter().map(|c| c * c).sum();
        assert!((energy - 1.0).abs() < 1e-6);
    }

    #[test]
    fn resample_ratio_reduces_to_lowest_terms() {
        let (i, d) = reduce_resample_ratio(48_000, 32_000).unwrap();
        assert_eq!((i, d), (3, 2));
    }

    #[test]
    fn fir_apply_preserves_length() {
        let taps = kaiser_lowpass(15, 1_000.0, 8_000.0, 4.0).unwrap();
        let input = vec![1.0; 100];
        let out = apply_fir(&input, &taps);
        assert_eq!(out.len(), input.len());
    }
}
