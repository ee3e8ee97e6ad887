//! CLI-specific configuration structures for TOML-based configuration.
//!
//! `hacktv-core` only knows about [`hacktv_core::config::ModeConfig`]
//! presets; everything here is the layer that picks one, applies a
//! handful of override knobs, and decides where the rendered samples go
//! and how the run is logged — the "CLI surface" spec.md §6 describes as
//! external to the core.

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// Deep merge JSON values - override takes precedence over base.
/// For objects, recursively merge; for arrays and primitives, override replaces base.
fn merge_json_values(base: &mut JsonValue, override_val: JsonValue) {
    match (base, override_val) {
        (JsonValue::Object(base_map), JsonValue::Object(override_map)) => {
            for (key, value) in override_map {
                if let Some(base_value) = base_map.get_mut(&key) {
                    merge_json_values(base_value, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_val, override_val) => {
            *base_val = override_val;
        }
    }
}

/// Custom deserializer to handle both single string and array of strings for include.
fn deserialize_include_optional<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        String(String),
        Vec(Vec<String>),
    }

    let opt: Option<StringOrVec> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(Vec::new()),
        Some(StringOrVec::String(s)) => Ok(vec![s]),
        Some(StringOrVec::Vec(v)) => Ok(v),
    }
}

/// Built-in synthetic `AvSource` pattern, standing in for the real
/// demuxer/decoder collaborator spec.md §1 puts outside the core. Names
/// match hacktv's own `test:colourbars`-style pseudo inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestPattern {
    ColourBars,
    GreyRamp,
}

impl Default for TestPattern {
    fn default() -> Self {
        TestPattern::ColourBars
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub pattern: TestPattern,
    /// Number of test frames to synthesise before signalling EOF.
    #[serde(default = "default_frame_count")]
    pub frames: u32,
}

fn default_frame_count() -> u32 {
    2
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pattern: TestPattern::default(),
            frames: default_frame_count(),
        }
    }
}

/// Knobs layered on top of a bundled `ModeConfig` preset (spec.md §6:
/// `-l`/`--level`, `-D` deviation, `-G` gamma).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModeOverrides {
    pub level: Option<f64>,
    pub video_level: Option<f64>,
    pub gamma: Option<f64>,
    pub deviation_hz: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Headerless interleaved `i16` samples, matching hacktv's raw file
    /// back end.
    File,
    /// A WAV container (via `hound`), convenient for inspecting a run in
    /// an ordinary audio editor.
    Wav,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_sink_kind")]
    pub kind: SinkKind,
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

fn default_sink_kind() -> SinkKind {
    SinkKind::Wav
}

fn default_output_path() -> PathBuf {
    PathBuf::from("hacktv-out.wav")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            kind: default_sink_kind(),
            path: default_output_path(),
        }
    }
}

/// Which VBI inserters (spec.md §4.3) to enrol, independent of the
/// bundled preset's analogue geometry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VbiConfig {
    /// WSS aspect tag (`4:3`, `16:9`, `14:9-letterbox`, ...), or omitted
    /// to leave WSS disabled.
    #[serde(default)]
    pub wss: Option<String>,
    #[serde(default)]
    pub acp: bool,
    #[serde(default)]
    pub vitc: bool,
    #[serde(default)]
    pub vits: bool,
}

/// Video scrambler selection (spec.md §4.4). `control_word` is a 60-bit
/// value shared out of band with a notional descrambler; it is never
/// interpreted as a real card algorithm (spec.md §1 Non-goals).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScramblerConfig {
    pub mode: Option<String>,
    #[serde(default = "default_control_word")]
    pub control_word: u64,
}

fn default_control_word() -> u64 {
    0x0FFF_FFFF_FFFF_FFFF
}

/// Enable/disable individual analogue audio subcarriers that the chosen
/// preset ships with. `false` suppresses a subcarrier the preset would
/// otherwise carry; it can never add one the preset lacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub fm_mono: bool,
    #[serde(default = "default_true")]
    pub am_mono: bool,
    #[serde(default = "default_true")]
    pub nicam: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fm_mono: true,
            am_mono: true,
            nicam: true,
        }
    }
}

/// Complete CLI configuration bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Optional path(s) to other config file(s) to include (relative to
    /// this config's directory). Supports single string or array of
    /// strings.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_include_optional")]
    pub include: Vec<String>,

    /// Bundled `ModeConfig` preset id, e.g. `pal-i`, `ntsc-m`, `d2mac-fm`.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Working sample rate in Hz. Doubles as the pixel/raster clock the
    /// engine derives line widths from (spec.md §3: the core treats
    /// `pixel_rate` and the RF sample rate as the same clock unless an
    /// IF modulator stage oversamples).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    #[serde(default)]
    pub overrides: ModeOverrides,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub vbi: VbiConfig,

    #[serde(default)]
    pub scrambler: ScramblerConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub terminal: TerminalConfig,
}

fn default_mode() -> String {
    "pal-i".to_string()
}

fn default_sample_rate() -> f64 {
    16_000_000.0
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            mode: default_mode(),
            sample_rate: default_sample_rate(),
            overrides: ModeOverrides::default(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
            vbi: VbiConfig::default(),
            scrambler: ScramblerConfig::default(),
            audio: AudioConfig::default(),
            terminal: TerminalConfig::default(),
        }
    }
}

/// Terminal/run-reporting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Telemetry sampling interval in seconds.
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_secs: f64,
}

fn default_telemetry_interval() -> f64 {
    1.0
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            telemetry_interval_secs: default_telemetry_interval(),
        }
    }
}

/// Logging output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_target")]
    pub target: LogTarget,

    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

fn default_log_target() -> LogTarget {
    LogTarget::Stdout
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            target: default_log_target(),
            file_path: None,
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Logfmt,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl CliConfig {
    /// Load configuration from a TOML file, with `include` support: each
    /// included file is merged in order underneath the current file,
    /// which always wins.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let config_toml: toml::Value =
            toml::from_str(&content).wrap_err("Failed to parse TOML configuration")?;
        let mut config_json =
            serde_json::to_value(&config_toml).wrap_err("Failed to convert TOML to JSON")?;

        let includes = match config_json.get("include") {
            Some(JsonValue::String(s)) => vec![s.clone()],
            Some(JsonValue::Array(arr)) => {
                arr.iter().filter_map(|v| v.as_str().map(String::from)).collect()
            }
            _ => Vec::new(),
        };

        if let JsonValue::Object(ref mut map) = config_json {
            map.remove("include");
        }

        let mut base_json =
            serde_json::to_value(&Self::default()).wrap_err("Failed to create default config")?;

        for include_path in &includes {
            let include_full_path = if Path::new(include_path).is_absolute() {
                PathBuf::from(include_path)
            } else {
                path.parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(include_path)
            };

            let included_config = Self::from_file(&include_full_path).wrap_err_with(|| {
                format!("Failed to load included config: {}", include_full_path.display())
            })?;
            let included_json = serde_json::to_value(&included_config)
                .wrap_err("Failed to convert included config to JSON")?;
            merge_json_values(&mut base_json, included_json);
        }

        merge_json_values(&mut base_json, config_json);

        let config: CliConfig =
            serde_json::from_value(base_json).wrap_err("Failed to parse final configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let config = CliConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        let back: CliConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.mode, config.mode);
    }
}
