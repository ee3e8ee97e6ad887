//! hacktv-core error types, split by the subsystem that raises them.

use thiserror::Error;

/// Top-level error type returned by every core entry point.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("unknown mode: {0}")]
    ModeUnknown(String),

    #[error("AV source open failed: {0}")]
    SourceOpenFailed(String),

    #[error("AV source read failed: {0}")]
    SourceReadFailed(String),

    #[error("AV source reached end of stream")]
    SourceEof,

    #[error("radio sink write failed: {0}")]
    SinkWriteFailed(String),

    #[error("DSP error: {0}")]
    Dsp(#[from] DspError),

    #[error("scrambler error: {0}")]
    Scrambler(#[from] ScramblerError),

    #[error("MAC encoder error: {0}")]
    Mac(#[from] MacError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Configuration validation errors, raised while deriving `Levels` /
/// line geometry from a `ModeConfig` (data model invariants #1 and #2).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid sample rate: {rate} Hz (must be > 0)")]
    InvalidSampleRate { rate: f64 },

    #[error(
        "pixel rate {pixel_rate} Hz is not an exact multiple of lines * frame_rate for this mode \
         (lines={lines}, frame_rate={num}/{den})"
    )]
    NonExactLineWidth {
        pixel_rate: f64,
        lines: u32,
        num: u32,
        den: u32,
    },

    #[error("active_left + active_width ({left_plus_width}) exceeds line width ({width})")]
    ActiveVideoOverflow { left_plus_width: f64, width: f64 },

    #[error("sync pulse width {width}s is not strictly less than half a line ({half_line}s)")]
    SyncPulseTooWide { width: f64, half_line: f64 },

    #[error("gamma must be finite and positive, got {gamma}")]
    InvalidGamma { gamma: f64 },
}

/// DSP processing errors (filter design, oscillator, resampler).
#[derive(Debug, Error)]
pub enum DspError {
    #[error("filter design failed: {reason}")]
    FilterDesignFailed { reason: String },

    #[error("rational resampler ratio {interpolation}/{decimation} reduces to zero")]
    DegenerateResampleRatio {
        interpolation: usize,
        decimation: usize,
    },

    #[error("buffer underrun: requested {requested}, available {available}")]
    BufferUnderrun { requested: usize, available: usize },
}

/// Video scrambler errors.
#[derive(Debug, Error)]
pub enum ScramblerError {
    #[error("unknown scrambler mode string: {0}")]
    UnknownMode(String),

    #[error("control word {0:#x} is not a valid 60-bit value")]
    InvalidControlWord(u64),

    #[error("line ring does not hold the {required} lines of delay this scrambler needs")]
    InsufficientRingDepth { required: usize },
}

/// MAC encoder errors.
#[derive(Debug, Error)]
pub enum MacError {
    #[error("packet queue for sub-frame {subframe} is full")]
    QueueFull { subframe: u8 },

    #[error("payload length {len} does not match the expected {expected} bytes")]
    BadPayloadLength { len: usize, expected: usize },

    #[error("audio encoder block size {block} is invalid for {bits}-bit companding")]
    InvalidAudioBlock { block: usize, bits: u8 },
}
