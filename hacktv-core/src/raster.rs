//! Sync and raster generation: stamps blanking, horizontal sync, vertical
//! sync and the colour burst onto a line buffer before any active video
//! or VBI data is written to it.
//!
//! A pure function of `(mode, frame_no, line_no)` in the sense that the
//! sync shape never depends on anything the engine hasn't already decided
//! by the time this stage runs — it is the first `LineProcessor` in every
//! non-MAC chain.

use crate::config::{ColourMode, ModeConfig};
use crate::levels::{ColourSubcarrierTable, Levels};
use crate::line::{Line, LineProcessor};

/// Linear ramp from `from` to `to` over `[start, start+rise)` samples,
/// written into `buf`. Used for every sync/burst edge: hacktv's analogue
/// modes never use an instantaneous step, matching real transmitter rise
/// times.
fn ramp(buf: &mut [f64], start: usize, rise: usize, from: f64, to: f64) {
    if rise == 0 {
        if start < buf.len() {
            buf[start] = to;
        }
        return;
    }
    for i in 0..rise {
        let idx = start + i;
        if idx >= buf.len() {
            break;
        }
        let t = i as f64 / rise as f64;
        buf[idx] = from + (to - from) * t;
    }
}

fn fill_from(buf: &mut [f64], start: usize, value: f64) {
    for s in buf.iter_mut().skip(start) {
        *s = value;
    }
}

/// Whole-line vertical position within the broadcast field/frame
/// sequence. Only meaningful for interlaced 525/625-line rasters; MAC and
/// mechanical (Baird) rasters do not have a conventional vsync region.
fn is_vsync_region(mode: &ModeConfig, line_no: u32) -> bool {
    if !matches!(
        mode.raster,
        crate::config::RasterKind::Raster525 | crate::config::RasterKind::Raster625
    ) {
        return false;
    }

    let line_period_s = mode.frame_rate.den as f64 / mode.frame_rate.num as f64 / mode.lines as f64;
    let vsync_lines = (mode.sync.vsync_long_width_s / line_period_s * 5.0).round().max(2.0) as u32;

    let field2_start = mode.half_line + 1;
    (1..=vsync_lines).contains(&line_no)
        || (mode.interlaced && (field2_start..field2_start + vsync_lines).contains(&line_no))
}

/// PAL's V-switch: the colour burst phase alternates line to line. The V
/// switch state is usually `+V` on line 1 of each field; this follows
/// `src/video.c`'s simpler per-line alternation.
pub fn pal_v_switch(line_no: u32) -> f64 {
    if line_no % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// How many lines the colour-subcarrier-to-line-rate relationship takes
/// to repeat (data model invariant #7): PAL's subcarrier completes an
/// integer number of cycles only every four frames, NTSC's every two
/// lines. Other colour modes have no subcarrier of their own.
pub fn colour_repeat_lines(mode: &ModeConfig) -> u64 {
    match mode.colour_mode {
        ColourMode::Pal => 4 * mode.lines as u64,
        ColourMode::Ntsc => 2,
        _ => 1,
    }
}

/// Absolute sample offset of the first sample of `(frame_no, line_no)`,
/// reduced into the subcarrier's repeat period. Computed directly from
/// the raster position rather than from an incrementing counter, so it
/// can never drift if a caller seeks the source (invariant #7).
pub fn subcarrier_line_offset(mode: &ModeConfig, frame_no: u64, line_no: u32, width: usize) -> u64 {
    let lines_per_frame = mode.lines as u64;
    let total_lines = frame_no * lines_per_frame + line_no.saturating_sub(1) as u64;
    let repeat_lines = colour_repeat_lines(mode).max(1);
    (total_lines % repeat_lines) * width as u64
}

/// SECAM alternates which colour difference signal (D'r or D'b) rides the
/// line, resolved (per SPEC_FULL §9) by following `src/video.c`'s
/// `bline & 1` test.
pub fn secam_line_is_dr(line_no: u32) -> bool {
    line_no % 2 == 1
}

pub struct SyncGenerator {
    levels: Levels,
    subcarrier: Option<std::sync::Arc<ColourSubcarrierTable>>,
}

impl SyncGenerator {
    pub fn new(mode: &ModeConfig, subcarrier: Option<std::sync::Arc<ColourSubcarrierTable>>) -> Self {
        Self {
            levels: Levels::from_mode(mode),
            subcarrier,
        }
    }
}

impl LineProcessor for SyncGenerator {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn process(&mut self, lines: &mut [Line], mode: &ModeConfig) {
        let Some(line) = lines.first_mut() else {
            return;
        };
        if !line.is_valid() || mode.colour_mode == ColourMode::Mac {
            // MAC lines carry no conventional analogue sync; the
            // duobinary encoder writes the whole line itself.
            return;
        }

        let width = line.video.len();
        let sample_rate = width as f64 * mode.frame_rate.num as f64 / mode.frame_rate.den as f64
            * mode.lines as f64;

        fill_from(&mut line.video, 0, self.levels.blanking);

        let vsync = is_vsync_region(mode, line.line_no as u32);
        let rise = (mode.sync.sync_rise_s * sample_rate).round() as usize;

        if vsync {
            let pulse_width = (mode.sync.vsync_long_width_s * sample_rate).round() as usize;
            ramp(&mut line.video, 0, rise, self.levels.blanking, self.levels.sync);
            fill_from(&mut line.video, rise, self.levels.sync);
            if pulse_width < width {
                ramp(
                    &mut line.video,
                    pulse_width,
                    rise,
                    self.levels.sync,
                    self.levels.blanking,
                );
                fill_from(
                    &mut line.video,
                    (pulse_width + rise).min(width),
                    self.levels.blanking,
                );
            }
        } else {
            let hsync_width = (mode.sync.hsync_width_s * sample_rate).round() as usize;
            ramp(&mut line.video, 0, rise, self.levels.blanking, self.levels.sync);
            fill_from(&mut line.video, rise, self.levels.sync);
            ramp(
                &mut line.video,
                hsync_width,
                rise,
                self.levels.sync,
                self.levels.blanking,
            );
            fill_from(
                &mut line.video,
                (hsync_width + rise).min(width),
                self.levels.blanking,
            );

            if mode.colour_mode == ColourMode::Pal || mode.colour_mode == ColourMode::Ntsc {
                write_burst(line, mode, &self.levels, sample_rate, self.subcarrier.as_deref(), width);
            }
        }

        line.burst_written = true;
    }
}

fn write_burst(
    line: &mut Line,
    mode: &ModeConfig,
    levels: &Levels,
    sample_rate: f64,
    subcarrier: Option<&ColourSubcarrierTable>,
    width_samples: usize,
) {
    let start = (mode.burst_left_s * sample_rate).round() as usize;
    let burst_width = (mode.burst_width_s * sample_rate).round() as usize;
    let rise = (mode.burst_rise_s * sample_rate).round() as usize;
    let amplitude = mode.burst_level * (levels.white - levels.black).abs();

    let sign = if mode.colour_mode == ColourMode::Pal {
        pal_v_switch(line.line_no as u32)
    } else {
        1.0
    };

    let omega = 2.0 * std::f64::consts::PI * mode.colour_carrier_hz.as_f64() / sample_rate;
    // PAL burst sits at 135 degrees +/- the V switch; NTSC at 180 degrees.
    let phase_offset = if mode.colour_mode == ColourMode::Pal {
        (135.0f64).to_radians() * sign
    } else {
        std::f64::consts::PI
    };
    // sin(theta + phase_offset) via the angle-sum identity, so the per-
    // sample work is a lookup-and-multiply rather than another sin() call.
    let (sin_phi, cos_phi) = phase_offset.sin_cos();

    let line_offset = subcarrier_line_offset(mode, line.frame_no, line.line_no as u32, width_samples);

    for i in 0..burst_width {
        let idx = start + i;
        if idx >= line.video.len() {
            break;
        }
        let env = if i < rise {
            i as f64 / rise.max(1) as f64
        } else if i >= burst_width.saturating_sub(rise) {
            (burst_width - i) as f64 / rise.max(1) as f64
        } else {
            1.0
        };
        let (cos_theta, sin_theta) = match subcarrier {
            Some(table) => table.at(line_offset + idx as u64),
            None => {
                let theta = omega * (line_offset + idx as u64) as f64;
                (theta.cos(), theta.sin())
            }
        };
        let value = sin_theta * cos_phi + cos_theta * sin_phi;
        line.video[idx] += amplitude * env * value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NTSC_M, PAL_I};
    use crate::line::Field;

    fn make_active_line(mode: &ModeConfig, line_no: i32) -> Line {
        let width = mode.line_width_samples(864.0 * mode.lines as f64 * mode.frame_rate.as_f64());
        let mut line = Line::new(width.max(1));
        line.line_no = line_no;
        line.field = Field::Odd;
        line
    }

    #[test]
    fn vsync_lines_drop_to_sync_level() {
        let mode = &PAL_I;
        let sample_rate = 864.0 * mode.lines as f64 * mode.frame_rate.as_f64();
        let width = mode.line_width_samples(sample_rate);
        let mut line = Line::new(width);
        line.line_no = 2;
        let mut gen = SyncGenerator::new(mode, None);
        gen.process(std::slice::from_mut(&mut line), mode);
        let mid = width / 2;
        assert!((line.video[mid] - mode.sync_level).abs() < 1e-6);
    }

    #[test]
    fn active_lines_carry_blanking_at_start() {
        let mode = &PAL_I;
        let mut line = make_active_line(mode, 100);
        let mut gen = SyncGenerator::new(mode, None);
        gen.process(std::slice::from_mut(&mut line), mode);
        assert!((line.video[0] - mode.sync_level).abs() < 1e-6);
        let after_sync = line.video.len() / 4;
        assert!((line.video[after_sync] - mode.blanking_level).abs() < 1e-6);
    }

    #[test]
    fn ntsc_burst_written_on_active_lines() {
        let mode = &NTSC_M;
        let mut line = make_active_line(mode, 100);
        let mut gen = SyncGenerator::new(mode, None);
        gen.process(std::slice::from_mut(&mut line), mode);
        assert!(line.burst_written);
    }

    #[test]
    fn secam_line_polarity_alternates() {
        assert!(secam_line_is_dr(1));
        assert!(!secam_line_is_dr(2));
    }
}
