//! Structured logging for run telemetry and per-line diagnostics.

use crate::config::{LogFormat, LogTarget, LoggingConfig};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Structured log event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// Periodic telemetry sample.
    Telemetry(TelemetryEvent),

    /// Per-line diagnostic decode.
    Line(LineDecodeEvent),

    /// Statistical summary emitted at end of run.
    Statistics(StatisticsEvent),

    Info { message: String },
    Warn { message: String },
    Error { message: String, details: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    pub mode: String,
    pub lines_emitted: u64,
    pub frames_emitted: u64,
    pub lines_per_sec: f64,
    pub rms_level: f64,
    pub peak_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDecodeEvent {
    pub timestamp: DateTime<Utc>,
    pub frame_no: u64,
    pub line_no: i32,
    pub field: String,
    pub classification: String,
    pub hex_preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsEvent {
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    pub rms_level: StatSummary,
    pub peak_level: StatSummary,
    pub total_lines: u64,
    pub total_frames: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatSummary {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

/// Logger that outputs structured logs.
pub struct StructuredLogger {
    config: LoggingConfig,
    writer: Box<dyn Write + Send>,
    start_time: DateTime<Utc>,
}

impl StructuredLogger {
    pub fn new(config: LoggingConfig) -> Result<Self> {
        let writer: Box<dyn Write + Send> = match &config.target {
            LogTarget::Stdout => Box::new(io::stdout()),
            LogTarget::Stderr => Box::new(io::stderr()),
            LogTarget::File => {
                let path = config
                    .file_path
                    .as_ref()
                    .ok_or_else(|| color_eyre::eyre::eyre!("File path required for file logging"))?;
                Box::new(BufWriter::new(File::create(path)?))
            }
        };

        Ok(Self {
            config,
            writer,
            start_time: Utc::now(),
        })
    }

    pub fn log(&mut self, event: LogEvent) -> Result<()> {
        let output = match self.config.format {
            LogFormat::Json => self.format_json(&event)?,
            LogFormat::Logfmt => self.format_logfmt(&event)?,
            LogFormat::Pretty => self.format_pretty(&event)?,
        };

        writeln!(self.writer, "{}", output)?;
        self.writer.flush()?;

        Ok(())
    }

    fn format_json(&self, event: &LogEvent) -> Result<String> {
        Ok(serde_json::to_string(event)?)
    }

    fn format_logfmt(&self, event: &LogEvent) -> Result<String> {
        let ts = Utc::now().to_rfc3339();

        let msg = match event {
            LogEvent::Telemetry(t) => format!(
                "ts=\"{}\" type=telemetry mode={} lines={} frames={} lines_per_sec={:.1} rms={:.4} peak={:.4}",
                ts, t.mode, t.lines_emitted, t.frames_emitted, t.lines_per_sec, t.rms_level, t.peak_level
            ),
            LogEvent::Line(l) => format!(
                "ts=\"{}\" type=line frame={} line={} field={} class={} hex=\"{}\"",
                ts, l.frame_no, l.line_no, l.field, l.classification, l.hex_preview
            ),
            LogEvent::Statistics(s) => format!(
                "ts=\"{}\" type=statistics duration_secs={:.2} total_lines={} total_frames={} rms_mean={:.4} peak_mean={:.4}",
                ts, s.duration_secs, s.total_lines, s.total_frames, s.rms_level.mean, s.peak_level.mean
            ),
            LogEvent::Info { message } => format!("ts=\"{}\" level=info msg=\"{}\"", ts, message),
            LogEvent::Warn { message } => format!("ts=\"{}\" level=warn msg=\"{}\"", ts, message),
            LogEvent::Error { message, details } => {
                if let Some(d) = details {
                    format!("ts=\"{}\" level=error msg=\"{}\" details=\"{}\"", ts, message, d)
                } else {
                    format!("ts=\"{}\" level=error msg=\"{}\"", ts, message)
                }
            }
        };

        Ok(msg)
    }

    fn format_pretty(&self, event: &LogEvent) -> Result<String> {
        let ts = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");

        let msg = match event {
            LogEvent::Telemetry(t) => format!(
                "[{}] TELEMETRY[{}]: lines={} frames={} | {:.1} lines/s | RMS={:.4} peak={:.4}",
                ts, t.mode, t.lines_emitted, t.frames_emitted, t.lines_per_sec, t.rms_level, t.peak_level
            ),
            LogEvent::Line(l) => format!(
                "[{}] LINE[{}/{}]: field={} {} | {}",
                ts, l.frame_no, l.line_no, l.field, l.classification, l.hex_preview
            ),
            LogEvent::Statistics(s) => format!(
                "[{}] STATISTICS ({:.2}s): lines={} frames={} | RMS μ={:.4} σ={:.4} [{:.4},{:.4}] | peak μ={:.4} σ={:.4} [{:.4},{:.4}]",
                ts, s.duration_secs, s.total_lines, s.total_frames,
                s.rms_level.mean, s.rms_level.stddev, s.rms_level.min, s.rms_level.max,
                s.peak_level.mean, s.peak_level.stddev, s.peak_level.min, s.peak_level.max
            ),
            LogEvent::Info { message } => format!("[{}] INFO: {}", ts, message),
            LogEvent::Warn { message } => format!("[{}] WARN: {}", ts, message),
            LogEvent::Error { message, details } => {
                if let Some(d) = details {
                    format!("[{}] ERROR: {} | {}", ts, message, d)
                } else {
                    format!("[{}] ERROR: {}", ts, message)
                }
            }
        };

        Ok(msg)
    }

    pub fn elapsed(&self) -> f64 {
        (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}
