//! A synthetic `AvSource`: the built-in test-pattern generator that lets
//! this binary exercise `hacktv-core` end to end without a real demuxer.
//! Real video/audio decoding is explicitly an external collaborator
//! (spec.md §1); this is the pseudo-input hacktv itself calls
//! `test:colourbars`.

use hacktv_core::av_source::{AudioBlock, AvSource, VideoFrame};

use crate::config::TestPattern;

/// Reference audio rate most of the bundled presets carry on their FM
/// subcarriers (spec.md §3 "Audio block").
const AUDIO_SAMPLE_RATE: u32 = 32_000;

pub struct TestPatternSource {
    pattern: TestPattern,
    width: u32,
    height: u32,
    frames_left: u32,
    audio_tone_hz: f64,
    audio_phase: f64,
    samples_per_frame: usize,
}

impl TestPatternSource {
    pub fn new(pattern: TestPattern, width: u32, height: u32, frames: u32, frame_rate_hz: f64) -> Self {
        let samples_per_frame =
            ((AUDIO_SAMPLE_RATE as f64 / frame_rate_hz.max(1.0)) as usize).max(1);
        Self {
            pattern,
            width: width.max(1),
            height: height.max(1),
            frames_left: frames,
            audio_tone_hz: 1_000.0,
            audio_phase: 0.0,
            samples_per_frame,
        }
    }

    fn colour_bars(&self) -> Vec<u8> {
        const BARS: [(u8, u8, u8); 8] = [
            (255, 255, 255),
            (255, 255, 0),
            (0, 255, 255),
            (0, 255, 0),
            (255, 0, 255),
            (255, 0, 0),
            (0, 0, 255),
            (0, 0, 0),
        ];
        let mut rgb = vec![0u8; (self.width * self.height * 3) as usize];
        let bar_width = (self.width as usize / BARS.len()).max(1);
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                let bar = (x / bar_width).min(BARS.len() - 1);
                let (r, g, b) = BARS[bar];
                let idx = (y * self.width as usize + x) * 3;
                rgb[idx] = r;
                rgb[idx + 1] = g;
                rgb[idx + 2] = b;
            }
        }
        rgb
    }

    fn grey_ramp(&self) -> Vec<u8> {
        let mut rgb = vec![0u8; (self.width * self.height * 3) as usize];
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                let v = ((x as u64 * 255) / self.width.max(1) as u64) as u8;
                let idx = (y * self.width as usize + x) * 3;
                rgb[idx] = v;
                rgb[idx + 1] = v;
                rgb[idx + 2] = v;
            }
        }
        rgb
    }
}

impl AvSource for TestPatternSource {
    fn read_video(&mut self) -> Option<VideoFrame> {
        if self.frames_left == 0 {
            return None;
        }
        self.frames_left -= 1;

        let rgb = match self.pattern {
            TestPattern::ColourBars => self.colour_bars(),
            TestPattern::GreyRamp => self.grey_ramp(),
        };

        Some(VideoFrame {
            width: self.width,
            height: self.height,
            rgb,
        })
    }

    fn read_audio(&mut self) -> Option<AudioBlock> {
        let mut samples = Vec::with_capacity(self.samples_per_frame);
        let step = 2.0 * std::f64::consts::PI * self.audio_tone_hz / AUDIO_SAMPLE_RATE as f64;
        for _ in 0..self.samples_per_frame {
            samples.push(0.1 * self.audio_phase.sin());
            self.audio_phase += step;
            if self.audio_phase > std::f64::consts::PI {
                self.audio_phase -= 2.0 * std::f64::consts::PI;
            }
        }
        Some(AudioBlock {
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: 1,
            samples,
        })
    }

    fn eof(&self) -> bool {
        self.frames_left == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_reports_eof_after_configured_frame_count() {
        let mut source = TestPatternSource::new(TestPattern::ColourBars, 64, 32, 2, 25.0);
        assert!(source.read_video().is_some());
        assert!(source.read_video().is_some());
        assert!(source.read_video().is_none());
        assert!(source.eof());
    }

    #[test]
    fn colour_bars_frame_has_expected_dimensions() {
        let mut source = TestPatternSource::new(TestPattern::ColourBars, 80, 40, 1, 25.0);
        let frame = source.read_video().unwrap();
        assert_eq!(frame.width, 80);
        assert_eq!(frame.height, 40);
        assert_eq!(frame.rgb.len(), 80 * 40 * 3);
    }

    #[test]
    fn audio_block_is_silence_free_tone() {
        let mut source = TestPatternSource::new(TestPattern::ColourBars, 8, 8, 1, 25.0);
        let block = source.read_audio().unwrap();
        assert!(!block.samples.is_empty());
        assert!(block.samples.iter().any(|&s| s != 0.0));
    }
}
