//! The line-processor engine: pulls frames from an [`AvSource`], threads
//! each output line through the ordered chain of processors built for a
//! mode, and hands finished lines to a [`RadioSink`].
//!
//! Exactly one line is produced per call to [`Engine::next_line`], and the
//! engine never spawns work of its own — the single suspension point spec
//! component #5 describes. The delay-line ring exists only because some
//! processors (the Syster/D11 shuffle, in particular) need to see several
//! consecutive lines before any of them can be finalised; a line is only
//! handed out once it has spent its full dwell time at the back of the
//! ring, matching the "line_no < 1 marks a line still in flight" rule in
//! [`crate::line::Line`].

use std::collections::VecDeque;
use std::sync::Arc;

use crate::audio::AudioMixer;
use crate::av_source::{AvSource, VideoFrame};
use crate::config::{ColourMode, ModeConfig, OutputKind};
use crate::errors::CoreError;
use crate::levels::{gamma_expand, ColourLut, ColourSubcarrierTable, Levels};
use crate::line::{Field, Line, LineProcessor};
use crate::mac::MacEncoder;
use crate::modulator::IfModulator;
use crate::raster::{colour_repeat_lines, pal_v_switch, secam_line_is_dr, subcarrier_line_offset, SyncGenerator};
use crate::secam::SecamChromaModulator;
use crate::sink::RadioSink;

/// Depth of the delay-line ring: the deepest lookback any registered
/// processor needs. Syster/D11 delays whole lines across a block of
/// [`crate::scrambler::syster::BLOCK_SIZE`] lines and Videocrypt Mode S
/// shuffles a block of [`crate::scrambler::videocrypt::S_BLOCK_SIZE`]
/// lines; every other processor only ever touches `lines[0]`.
pub const RING_DEPTH: usize = if crate::scrambler::syster::BLOCK_SIZE
    >= crate::scrambler::videocrypt::S_BLOCK_SIZE
{
    crate::scrambler::syster::BLOCK_SIZE
} else {
    crate::scrambler::videocrypt::S_BLOCK_SIZE
};

/// Drives the whole per-line pipeline for one [`ModeConfig`].
///
/// VBI inserters and scramblers are added after construction via
/// [`Engine::add_vbi_inserter`] / [`Engine::add_scrambler`] — the engine
/// itself only knows the fixed stages every mode needs (sync, MAC, audio,
/// the IF modulator); which optional stages run on top is a caller
/// decision (spec §6: the CLI/demo picks the VBI services and scrambler
/// for a run, the core never guesses).
pub struct Engine {
    mode: ModeConfig,
    sample_rate: f64,
    width: usize,
    lut: ColourLut,
    levels: Levels,
    subcarrier: Option<Arc<ColourSubcarrierTable>>,
    secam_chroma: Option<SecamChromaModulator>,
    sync: SyncGenerator,
    vbi: Vec<Box<dyn LineProcessor>>,
    scramblers: Vec<Box<dyn LineProcessor>>,
    mac: Option<MacEncoder>,
    audio: AudioMixer,
    modulator: IfModulator,
    ring: VecDeque<Line>,
    frame_no: u64,
    next_line_no: u32,
    current_frame: Option<VideoFrame>,
    source_exhausted: bool,
}

impl Engine {
    /// Build an engine for `mode`, synthesising at `sample_rate` samples
    /// per second. The colour LUT and IF modulator filters are built once
    /// here, off the per-line hot path.
    pub fn new(mode: ModeConfig, sample_rate: f64) -> Result<Self, CoreError> {
        mode.validate()?;
        let width = mode.line_width_samples(sample_rate).max(1);
        let lut = ColourLut::build(&mode);
        let levels = Levels::from_mode(&mode);

        let subcarrier = matches!(mode.colour_mode, ColourMode::Pal | ColourMode::Ntsc).then(|| {
            let period = colour_repeat_lines(&mode) as usize * width;
            Arc::new(ColourSubcarrierTable::build(
                mode.colour_carrier_hz.as_f64(),
                sample_rate,
                period,
            ))
        });
        let secam_chroma = (mode.colour_mode == ColourMode::Secam)
            .then(|| SecamChromaModulator::new(sample_rate, &levels));

        let sync = SyncGenerator::new(&mode, subcarrier.clone());
        let audio = AudioMixer::new(&mode, sample_rate);
        let modulator = IfModulator::new(&mode, sample_rate)?;
        let mac = mode.mac.map(MacEncoder::new);

        let ring = (0..RING_DEPTH).map(|_| Line::new(width)).collect();

        Ok(Self {
            mode,
            sample_rate,
            width,
            lut,
            levels,
            subcarrier,
            secam_chroma,
            sync,
            vbi: Vec::new(),
            scramblers: Vec::new(),
            mac,
            audio,
            modulator,
            ring,
            frame_no: 0,
            next_line_no: 1,
            current_frame: None,
            source_exhausted: false,
        })
    }

    pub fn mode(&self) -> &ModeConfig {
        &self.mode
    }

    /// Register a VBI inserter, run in the order added, after sync/raster
    /// and before scrambling.
    pub fn add_vbi_inserter(&mut self, inserter: Box<dyn LineProcessor>) {
        self.vbi.push(inserter);
    }

    /// Register a video scrambler, run after every VBI inserter.
    pub fn add_scrambler(&mut self, scrambler: Box<dyn LineProcessor>) {
        self.scramblers.push(scrambler);
    }

    /// Feed PCM audio into the mixer's input ring. Typically called once
    /// per frame with the block paired to that frame's video, but nothing
    /// stops a caller from feeding ahead.
    pub fn feed_audio(&mut self, samples: &[f64]) {
        self.audio.feed(samples);
    }

    /// Advance the pipeline by one line, pulling a fresh frame from
    /// `source` whenever the raster wraps back to line 1. `Ok(None)` is a
    /// clean end of stream: the source had nothing left and every
    /// in-flight delay line has drained. `line_no < 1` lines are
    /// swallowed internally and never returned (data model invariant #5).
    pub fn next_line(&mut self, source: &mut dyn AvSource) -> Result<Option<&Line>, CoreError> {
        loop {
            if self.source_exhausted && self.ring.iter().all(|l| !l.is_valid()) {
                return Ok(None);
            }

            if self.source_exhausted {
                let mut filler = Line::new(self.width);
                filler.line_no = 0;
                self.ring.push_front(filler);
            } else {
                self.admit_one_line(source)?;
            }

            if self.ring.len() > RING_DEPTH {
                self.ring.pop_back();
            }

            self.run_processors();

            if self.ring.back().map(|l| l.is_valid()).unwrap_or(false) {
                return Ok(self.ring.back());
            }
            // Still within the startup transient or the drain tail; loop
            // around and keep pumping without emitting anything.
        }
    }

    /// Modulate and write the next line to `sink`. Returns `false` once
    /// [`Engine::next_line`] reports clean end of stream.
    pub fn write_next_line(
        &mut self,
        source: &mut dyn AvSource,
        sink: &mut dyn RadioSink,
    ) -> Result<bool, CoreError> {
        let output_kind = self.mode.output_kind;
        let Some(line) = self.next_line(source)? else {
            return Ok(false);
        };
        let video = line.video.clone();

        match output_kind {
            OutputKind::ComplexIq => {
                let samples = self.modulator.modulate(&video);
                sink.write_iq(&samples)?;
            }
            OutputKind::RealBaseband => {
                sink.write_real(&video)?;
            }
        }
        Ok(true)
    }

    fn admit_one_line(&mut self, source: &mut dyn AvSource) -> Result<(), CoreError> {
        if self.next_line_no > self.mode.lines {
            self.next_line_no = 1;
            self.frame_no += 1;
        }

        if self.next_line_no == 1 {
            match source.read_video() {
                Some(frame) => self.current_frame = Some(frame),
                None => {
                    self.source_exhausted = true;
                    let mut filler = Line::new(self.width);
                    filler.line_no = 0;
                    self.ring.push_front(filler);
                    return Ok(());
                }
            }
            if let Some(audio) = source.read_audio() {
                self.audio.feed(&audio.samples);
            }
        }

        let mut line = Line::new(self.width);
        line.line_no = self.next_line_no as i32;
        line.frame_no = self.frame_no;
        line.field = if self.mode.interlaced && self.next_line_no > self.mode.half_line {
            Field::Even
        } else {
            Field::Odd
        };

        self.ring.push_front(line);
        self.next_line_no += 1;
        Ok(())
    }

    fn run_processors(&mut self) {
        let mode = &self.mode;
        let window = self.ring.make_contiguous();

        // Blank, sync and (for PAL/NTSC) burst must land on the line
        // first; only then can active video be painted into the window
        // sync just cleared, or the blanking fill would wipe it out.
        self.sync.process(window, mode);
        if let Some(line) = window.first_mut() {
            if line.is_valid() {
                if let Some(frame) = self.current_frame.as_ref() {
                    paint_active_video(
                        mode,
                        self.sample_rate,
                        &self.lut,
                        &self.levels,
                        self.subcarrier.as_deref(),
                        frame,
                        line,
                    );
                }
            }
        }
        for inserter in self.vbi.iter_mut() {
            inserter.process(window, mode);
        }
        for scrambler in self.scramblers.iter_mut() {
            scrambler.process(window, mode);
        }
        if let Some(mac) = self.mac.as_mut() {
            mac.process(window, mode);
        }
        if let Some(secam) = self.secam_chroma.as_mut() {
            secam.process(window, mode);
        }
        self.audio.process(window, mode);
    }
}

/// Which active-video row (0-based, into the current [`VideoFrame`]) a
/// given raster line number corresponds to, or `None` if the line falls
/// in vertical blanking.
fn active_row(mode: &ModeConfig, line_no: u32) -> Option<u32> {
    let first_active = mode.lines.saturating_sub(mode.active_lines) / 2;
    if mode.interlaced {
        let half = mode.half_line;
        if line_no <= half {
            if line_no < first_active {
                return None;
            }
            Some((line_no - first_active) * 2)
        } else {
            let field2_line = line_no - half;
            if field2_line < first_active {
                return None;
            }
            Some((field2_line - first_active) * 2 + 1)
        }
    } else {
        if line_no < first_active {
            return None;
        }
        Some(line_no - first_active)
    }
}

/// Resample one row of the current frame onto the active portion of
/// `line`, through the colour LUT and (for PAL/NTSC) a chroma
/// subcarrier whose phase runs continuously across line boundaries
/// (invariant #4/#7). Runs after [`SyncGenerator`] so it only ever
/// touches the active window, never the blanking/sync it just wrote.
/// SECAM leaves its chroma in `line.video_q` for [`SecamChromaModulator`]
/// to FM-modulate later; D/D2-MAC leaves its chroma there too, alternating
/// Cr/Cb by line the same way SECAM alternates Dr/Db, for
/// [`crate::mac::MacEncoder`] to time-compress into the line's duobinary
/// multiplex region later in the pipeline.
fn paint_active_video(
    mode: &ModeConfig,
    sample_rate: f64,
    lut: &ColourLut,
    levels: &Levels,
    subcarrier: Option<&ColourSubcarrierTable>,
    frame: &VideoFrame,
    line: &mut Line,
) {
    let Some(row) = active_row(mode, line.line_no as u32) else {
        return;
    };
    if row >= frame.height || frame.height == 0 {
        return;
    }

    let start = (mode.active_left_s * sample_rate).round() as usize;
    let width_samples = (mode.active_width_s * sample_rate).round() as usize;
    let end = (start + width_samples).min(line.video.len());
    if start >= end {
        return;
    }
    let cols = end - start;
    let width_samples_total = line.video.len();
    let line_offset = subcarrier_line_offset(mode, line.frame_no, line.line_no as u32, width_samples_total);

    for i in 0..cols {
        let x = ((i as u64 * frame.width as u64) / cols as u64) as u32;
        let x = x.min(frame.width.saturating_sub(1));
        let (r, g, b) = frame.pixel(x, row);
        let idx = start + i;

        match mode.colour_mode {
            ColourMode::ApolloFsc | ColourMode::CbsFsc => {
                let channel = fsc_channel(mode, line.frame_no, line.line_no as u32);
                let component = match channel {
                    0 => r,
                    1 => g,
                    _ => b,
                };
                line.video[idx] = levels.luma_to_line_level(gamma_expand(component, mode.gamma));
            }
            _ => {
                let (y, c1, c2) = lut.lookup(r, g, b);
                let mut sample = levels.luma_to_line_level(y as f64);

                match mode.colour_mode {
                    ColourMode::Pal => {
                        if let Some(table) = subcarrier {
                            let (cos_theta, sin_theta) = table.at(line_offset + idx as u64);
                            let v_sign = pal_v_switch(line.line_no as u32);
                            sample += c1 as f64 * cos_theta + v_sign * c2 as f64 * sin_theta;
                        }
                    }
                    ColourMode::Ntsc => {
                        if let Some(table) = subcarrier {
                            let (cos_theta, sin_theta) = table.at(line_offset + idx as u64);
                            sample += c1 as f64 * sin_theta + c2 as f64 * cos_theta;
                        }
                    }
                    ColourMode::Secam | ColourMode::Mac => {
                        line.video_q[idx] = if secam_line_is_dr(line.line_no as u32) {
                            c2 as f64
                        } else {
                            c1 as f64
                        };
                    }
                    ColourMode::None | ColourMode::ApolloFsc | ColourMode::CbsFsc => {}
                }

                line.video[idx] = sample;
            }
        }
    }

    if matches!(mode.colour_mode, ColourMode::ApolloFsc | ColourMode::CbsFsc) {
        if let Some(flag_line) = mode.fsc_flag_line {
            let channel = fsc_channel(mode, line.frame_no, line.line_no as u32);
            if channel == 1 && line.line_no as u32 == flag_line {
                let pulse_len = (cols / 10).max(1).min(cols);
                for sample in &mut line.video[start..start + pulse_len] {
                    *sample = levels.white;
                }
            }
        }
    }
}

/// Which RGB channel a field-sequential-colour line carries: 0 = red,
/// 1 = green, 2 = blue, cycling with `(frame, line)` the same way
/// [`subcarrier_line_offset`]/`secam_line_is_dr` key off the raster
/// position rather than a drifting counter.
fn fsc_channel(mode: &ModeConfig, frame_no: u64, line_no: u32) -> u8 {
    ((frame_no * mode.lines as u64 + line_no as u64) % 3) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av_source::AudioBlock;
    use crate::config::{BAIRD_30_AM, PAL_I};

    struct BarsSource {
        frames_left: u32,
        width: u32,
        height: u32,
    }

    impl AvSource for BarsSource {
        fn read_video(&mut self) -> Option<VideoFrame> {
            if self.frames_left == 0 {
                return None;
            }
            self.frames_left -= 1;
            let mut rgb = vec![0u8; (self.width * self.height * 3) as usize];
            for (i, px) in rgb.chunks_mut(3).enumerate() {
                let v = ((i % 256) as u8, 128u8, 64u8);
                px[0] = v.0;
                px[1] = v.1;
                px[2] = v.2;
            }
            Some(VideoFrame {
                width: self.width,
                height: self.height,
                rgb,
            })
        }

        fn read_audio(&mut self) -> Option<AudioBlock> {
            None
        }

        fn eof(&self) -> bool {
            self.frames_left == 0
        }
    }

    #[test]
    fn engine_emits_only_valid_lines() {
        let mode = PAL_I.clone();
        let sample_rate = 864.0 * mode.lines as f64 * mode.frame_rate.as_f64();
        let mut engine = Engine::new(mode, sample_rate).unwrap();
        let mut source = BarsSource {
            frames_left: 1,
            width: 64,
            height: 64,
        };

        let mut emitted = 0;
        loop {
            match engine.next_line(&mut source).unwrap() {
                Some(line) => {
                    assert!(line.is_valid());
                    emitted += 1;
                }
                None => break,
            }
            if emitted > 10_000 {
                panic!("engine never reached end of stream");
            }
        }
        assert!(emitted > 0);
    }

    #[test]
    fn engine_advances_frame_counter_across_a_full_raster() {
        let mode = BAIRD_30_AM.clone();
        let sample_rate = 200.0 * mode.lines as f64 * mode.frame_rate.as_f64();
        let mut engine = Engine::new(mode.clone(), sample_rate).unwrap();
        let mut source = BarsSource {
            frames_left: 2,
            width: 32,
            height: 32,
        };

        let mut max_frame_no = 0u64;
        while let Some(line) = engine.next_line(&mut source).unwrap() {
            max_frame_no = max_frame_no.max(line.frame_no);
        }
        assert!(max_frame_no >= 1);
    }
}
