//! `RadioSink` implementations this CLI ships on top of the library's
//! trait contract: a headerless raw `i16` file (hacktv's own raw back
//! end) and a WAV container via `hound` for convenient inspection.
//! HackRF/SoapySDR/FL2K back ends remain external collaborators
//! (spec.md §1) this crate does not implement.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use hacktv_core::errors::CoreError;
use hacktv_core::sink::RadioSink;
use num_complex::Complex64;

use crate::line_decoder::to_i16;

/// Headerless interleaved `i16` samples: `(I,Q,I,Q,...)` for complex
/// modes, one `i16` per sample for real baseband modes.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let file = File::create(path.as_ref())
            .map_err(|e| CoreError::SinkWriteFailed(e.to_string()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_i16(&mut self, samples: &[i16]) -> Result<(), CoreError> {
        for &s in samples {
            self.writer
                .write_all(&s.to_le_bytes())
                .map_err(|e| CoreError::SinkWriteFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl RadioSink for FileSink {
    fn write_iq(&mut self, samples: &[Complex64]) -> Result<(), CoreError> {
        let mut buf = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            buf.push(to_i16(s.re));
            buf.push(to_i16(s.im));
        }
        self.write_i16(&buf)
    }

    fn write_real(&mut self, samples: &[f64]) -> Result<(), CoreError> {
        let buf: Vec<i16> = samples.iter().map(|&s| to_i16(s)).collect();
        self.write_i16(&buf)
    }

    fn close(&mut self) -> Result<(), CoreError> {
        self.writer
            .flush()
            .map_err(|e| CoreError::SinkWriteFailed(e.to_string()))
    }
}

/// A WAV container sink: stereo (I,Q) for complex modes, mono for real
/// baseband. Finalised lazily on `close`.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32, complex: bool) -> Result<Self, CoreError> {
        let spec = hound::WavSpec {
            channels: if complex { 2 } else { 1 },
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path.as_ref(), spec)
            .map_err(|e| CoreError::SinkWriteFailed(e.to_string()))?;
        Ok(Self {
            writer: Some(writer),
        })
    }
}

impl RadioSink for WavSink {
    fn write_iq(&mut self, samples: &[Complex64]) -> Result<(), CoreError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CoreError::SinkWriteFailed("sink already closed".to_string()))?;
        for s in samples {
            writer
                .write_sample(to_i16(s.re))
                .map_err(|e| CoreError::SinkWriteFailed(e.to_string()))?;
            writer
                .write_sample(to_i16(s.im))
                .map_err(|e| CoreError::SinkWriteFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn write_real(&mut self, samples: &[f64]) -> Result<(), CoreError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CoreError::SinkWriteFailed("sink already closed".to_string()))?;
        for &s in samples {
            writer
                .write_sample(to_i16(s))
                .map_err(|e| CoreError::SinkWriteFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), CoreError> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| CoreError::SinkWriteFailed(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_writes_expected_byte_count() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("hacktv-cli-test-{}.raw", std::process::id()));
        let mut sink = FileSink::create(&path).unwrap();
        sink.write_real(&[0.0, 1.0, -1.0]).unwrap();
        sink.close().unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 3 * 2);
        std::fs::remove_file(&path).ok();
    }
}
