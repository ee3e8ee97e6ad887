//! Reference levels and the RGB → luma/chroma lookup tables.
//!
//! The four reference levels (white/black/blanking/sync) are carried
//! straight from `ModeConfig` into the working voltage domain used by the
//! rest of the pipeline. The colour conversion is the more interesting
//! piece: a flat 2^24-entry table addressed by a full 24-bit RGB triple
//! would resolve every possible input exactly, but at 16 million entries
//! per channel that is a wasteful default for a library consumers might
//! run inside test suites or containers. Instead we build two 2^12-entry
//! corner tables — one for luma, one for the chroma pair — on a 16-level
//! (4 bits per channel) lattice and trilinearly interpolate between the
//! eight nearest corners for any input pixel, trading a fraction of a
//! level of accuracy for a thousand-fold reduction in memory.

use rayon::prelude::*;

use crate::config::ModeConfig;

/// The four reference levels translated into this mode's working voltage
/// domain (data model invariant #2: `white != black`, `sync` is the most
/// negative excursion for normal-polarity modes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub white: f64,
    pub black: f64,
    pub blanking: f64,
    pub sync: f64,
    pub video_scale: f64,
}

impl Levels {
    pub fn from_mode(mode: &ModeConfig) -> Self {
        Self {
            white: mode.white_level,
            black: mode.black_level,
            blanking: mode.blanking_level,
            sync: mode.sync_level,
            video_scale: mode.video_level,
        }
    }

    /// Linear blend between black and white for a normalised luma value
    /// in `[0.0, 1.0]`.
    pub fn luma_to_line_level(&self, y: f64) -> f64 {
        self.black + (self.white - self.black) * y
    }
}

const LUT_BITS: u32 = 4;
const LUT_LEVELS: usize = 1 << LUT_BITS; // 16
const LUT_SIZE: usize = LUT_LEVELS * LUT_LEVELS * LUT_LEVELS; // 4096 == 2^12

fn corner_index(r: usize, g: usize, b: usize) -> usize {
    (r * LUT_LEVELS + g) * LUT_LEVELS + b
}

/// Gamma-corrects an 8-bit channel sample and scales it to `[0.0, 1.0]`.
pub(crate) fn gamma_expand(sample: u8, gamma: f64) -> f64 {
    (sample as f64 / 255.0).powf(gamma)
}

/// The colour-subcarrier phase table (data model §3/§4.1): one `(cos,
/// sin)` pair per sample offset, scaled to `i16`, built once per mode and
/// indexed by *absolute* sample offset rather than a per-line index so
/// the phase never resets at a line boundary (invariant #4). The table
/// is exactly one subcarrier/line repeat period long — four frames for
/// PAL, two lines for NTSC (invariant #7) — so every lookup falls in the
/// first pass and wraparound is always phase-exact.
pub struct ColourSubcarrierTable {
    table: Vec<(i16, i16)>,
}

impl ColourSubcarrierTable {
    pub fn build(carrier_hz: f64, sample_rate: f64, period_samples: usize) -> Self {
        let omega = 2.0 * std::f64::consts::PI * carrier_hz / sample_rate;
        let table = (0..period_samples.max(1))
            .map(|i| {
                let phase = omega * i as f64;
                (
                    (phase.cos() * i16::MAX as f64).round() as i16,
                    (phase.sin() * i16::MAX as f64).round() as i16,
                )
            })
            .collect();
        Self { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// `(cos, sin)` of the subcarrier phase at absolute sample offset `n`.
    pub fn at(&self, n: u64) -> (f64, f64) {
        let idx = (n as usize) % self.table.len().max(1);
        let (c, s) = self.table[idx];
        (c as f64 / i16::MAX as f64, s as f64 / i16::MAX as f64)
    }
}

/// RGB to luma/chroma conversion table, built once per mode and then
/// consulted once per pixel of active video.
pub struct ColourLut {
    /// Luma corner values, `LUT_SIZE` entries (2^12).
    y: Vec<f32>,
    /// Chroma corner values as (first, second) pairs — (I,Q) for NTSC,
    /// (U,V)-style for PAL/SECAM — also `LUT_SIZE` entries (2^12).
    chroma: Vec<(f32, f32)>,
}

impl ColourLut {
    /// Build the corner tables for `mode`. Corner evaluation is
    /// independent per corner, so this runs over a `rayon` thread pool;
    /// it happens once at mode-setup time, off the per-line hot path
    /// (§5: this does not violate the single-threaded `next_line` model).
    pub fn build(mode: &ModeConfig) -> Self {
        let indices: Vec<usize> = (0..LUT_SIZE).collect();
        let corners: Vec<(f32, (f32, f32))> = indices
            .par_iter()
            .map(|&idx| {
                let b = idx % LUT_LEVELS;
                let g = (idx / LUT_LEVELS) % LUT_LEVELS;
                let r = idx / (LUT_LEVELS * LUT_LEVELS);

                let sample_at = |level: usize| -> u8 {
                    ((level * 255) / (LUT_LEVELS - 1)) as u8
                };
                let rl = gamma_expand(sample_at(r), mode.gamma);
                let gl = gamma_expand(sample_at(g), mode.gamma);
                let bl = gamma_expand(sample_at(b), mode.gamma);

                let y = mode.rw_co * rl + mode.gw_co * gl + mode.bw_co * bl;
                let c1 = mode.eu_co * (bl - y);
                let c2 = mode.ev_co * (rl - y);
                (y as f32, (c1 as f32, c2 as f32))
            })
            .collect();

        let mut yt = Vec::with_capacity(LUT_SIZE);
        let mut ct = Vec::with_capacity(LUT_SIZE);
        for (y, c) in corners {
            yt.push(y);
            ct.push(c);
        }
        Self { y: yt, chroma: ct }
    }

    /// Trilinearly interpolated (Y, chroma1, chroma2) for one 24-bit
    /// input pixel.
    pub fn lookup(&self, r: u8, g: u8, b: u8) -> (f32, f32, f32) {
        let scale = (LUT_LEVELS - 1) as f32 / 255.0;
        let rf = r as f32 * scale;
        let gf = g as f32 * scale;
        let bf = b as f32 * scale;

        let r0 = rf.floor() as usize;
        let g0 = gf.floor() as usize;
        let b0 = bf.floor() as usize;
        let r1 = (r0 + 1).min(LUT_LEVELS - 1);
        let g1 = (g0 + 1).min(LUT_LEVELS - 1);
        let b1 = (b0 + 1).min(LUT_LEVELS - 1);

        let dr = rf - r0 as f32;
        let dg = gf - g0 as f32;
        let db = bf - b0 as f32;

        let mut y = 0.0f32;
        let mut c1 = 0.0f32;
        let mut c2 = 0.0f32;

        for (ri, wr) in [(r0, 1.0 - dr), (r1, dr)] {
            for (gi, wg) in [(g0, 1.0 - dg), (g1, dg)] {
                for (bi, wb) in [(b0, 1.0 - db), (b1, db)] {
                    let weight = wr * wg * wb;
                    if weight == 0.0 {
                        continue;
                    }
                    let idx = corner_index(ri, gi, bi);
                    y += weight * self.y[idx];
                    let (c1v, c2v) = self.chroma[idx];
                    c1 += weight * c1v;
                    c2 += weight * c2v;
                }
            }
        }

        (y, c1, c2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAL_I;

    #[test]
    fn lut_has_2_pow_12_entries() {
        let lut = ColourLut::build(&PAL_I);
        assert_eq!(lut.y.len(), 4096);
        assert_eq!(lut.chroma.len(), 4096);
    }

    #[test]
    fn white_maps_close_to_unity_luma() {
        let lut = ColourLut::build(&PAL_I);
        let (y, _, _) = lut.lookup(255, 255, 255);
        assert!((y - 1.0).abs() < 0.01, "expected ~1.0, got {y}");
    }

    #[test]
    fn black_maps_close_to_zero_luma() {
        let lut = ColourLut::build(&PAL_I);
        let (y, c1, c2) = lut.lookup(0, 0, 0);
        assert!(y.abs() < 0.01, "expected ~0.0, got {y}");
        assert!(c1.abs() < 0.01);
        assert!(c2.abs() < 0.01);
    }

    #[test]
    fn interpolation_is_monotonic_along_grey_ramp() {
        let lut = ColourLut::build(&PAL_I);
        let mut last = -1.0f32;
        for v in (0..=255u16).step_by(17) {
            let (y, _, _) = lut.lookup(v as u8, v as u8, v as u8);
            assert!(y >= last - 1e-4, "luma should be non-decreasing along a grey ramp");
            last = y;
        }
    }

    #[test]
    fn levels_from_mode_matches_config() {
        let levels = Levels::from_mode(&PAL_I);
        assert_eq!(levels.white, PAL_I.white_level);
        assert_eq!(levels.sync, PAL_I.sync_level);
    }

    #[test]
    fn subcarrier_table_phase_matches_direct_trig() {
        let table = ColourSubcarrierTable::build(4_433_618.75, 16_000_000.0, 1024);
        let omega = 2.0 * std::f64::consts::PI * 4_433_618.75 / 16_000_000.0;
        for n in [0u64, 1, 500, 1023] {
            let (c, s) = table.at(n);
            let phase = omega * n as f64;
            assert!((c - phase.cos()).abs() < 1e-3);
            assert!((s - phase.sin()).abs() < 1e-3);
        }
    }

    #[test]
    fn subcarrier_table_wraps_past_its_length() {
        let table = ColourSubcarrierTable::build(4_433_618.75, 16_000_000.0, 100);
        assert_eq!(table.at(5), table.at(105));
    }
}
