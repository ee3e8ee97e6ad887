mod config;
mod line_decoder;
mod logging;
mod sink;
mod source;
mod telemetry;

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};

use hacktv_core::config::{preset_by_name, ModeConfig, OutputKind};
use hacktv_core::modulator::IfModulator;
use hacktv_core::scrambler::{
    syster::SysterScrambler, videocrypt::{VideocryptScrambler, VideocryptVariant}, ControlWord,
    ScramblerMode,
};
use hacktv_core::vbi::{acp::AcpInserter, vitc::VitcInserter, vits::VitsInserter, wss::{WssAspect, WssInserter}};
use hacktv_core::Engine;

use config::{CliConfig, SinkKind, TestPattern};
use line_decoder::LineDecoder;
use logging::{LogEvent, StatisticsEvent};
use sink::{FileSink, WavSink};
use source::TestPatternSource;
use telemetry::TelemetryAggregator;

/// A software-defined analogue television transmitter: synthesises
/// baseband or IQ samples for PAL/NTSC/SECAM/MAC and related standards
/// (spec.md §6 CLI surface).
#[derive(Parser, Debug)]
#[command(author, version, about = "hacktv analogue television synthesiser", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mode preset id (e.g. pal-i, pal-bg, ntsc-m, secam-l, d2mac-fm).
    #[arg(short = 'm', long)]
    mode: Option<String>,

    /// Output sample rate in Hz, also used as the raster's pixel clock.
    #[arg(short = 's', long = "samplerate")]
    sample_rate: Option<f64>,

    /// Overall signal level (0.0-1.0+).
    #[arg(short = 'l', long)]
    level: Option<f64>,

    /// FM subcarrier deviation override, in Hz.
    #[arg(short = 'D', long = "deviation")]
    deviation: Option<f64>,

    /// Gamma override for the RGB->YIQ LUT.
    #[arg(short = 'G', long)]
    gamma: Option<f64>,

    /// Output target: `file:<path>` (raw i16) or `wav:<path>`.
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Number of synthetic test frames to render.
    #[arg(long)]
    frames: Option<u32>,

    /// Built-in test pattern: colour-bars or grey-ramp.
    #[arg(long)]
    pattern: Option<String>,

    /// Enable Widescreen Signalling with the given aspect tag
    /// (4:3, 16:9, 14:9-letterbox, 14:9, 16:9-letterbox, 16:9-full, anamorphic-16:9).
    #[arg(long = "wss")]
    wss: Option<String>,

    /// Enable ACP (Analogue Copy Protection) pseudo-sync pulses.
    #[arg(long)]
    acp: bool,

    /// Enable the VITS test line.
    #[arg(long)]
    vits: bool,

    /// Video scrambler: videocrypt1, videocrypt2, videocrypts, syster.
    #[arg(long)]
    scrambler: Option<String>,

    /// 60-bit scrambler control word, as hex (without 0x).
    #[arg(long = "control-word")]
    control_word: Option<String>,

    /// Enable verbose per-line diagnostic logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Apply CLI overrides on top of a bundled preset, spec.md §6's `-l`,
/// `-D`, `-G` knobs.
fn resolve_mode(cli: &Cli, config: &CliConfig) -> Result<ModeConfig> {
    let mode_id = cli.mode.as_deref().unwrap_or(&config.mode);
    let preset = preset_by_name(mode_id)
        .ok_or_else(|| eyre!("unknown mode '{mode_id}' (see presets in hacktv_core::config)"))?;
    let mut mode = preset.clone();

    if let Some(level) = cli.level.or(config.overrides.level) {
        mode.level = level;
    }
    if let Some(video_level) = config.overrides.video_level {
        mode.video_level = video_level;
    }
    if let Some(gamma) = cli.gamma.or(config.overrides.gamma) {
        mode.gamma = gamma;
    }
    if let Some(deviation) = cli.deviation.or(config.overrides.deviation_hz) {
        if let Some(sc) = mode.fm_mono.as_mut() {
            sc.deviation_hz = deviation;
        }
        if let hacktv_core::config::Modulation::Fm { energy_dispersal, .. } = mode.modulation {
            mode.modulation = hacktv_core::config::Modulation::Fm {
                deviation_hz: deviation,
                energy_dispersal,
            };
        }
    }

    if !config.audio.fm_mono {
        mode.fm_mono = None;
    }
    if !config.audio.am_mono {
        mode.am_mono = None;
    }
    if !config.audio.nicam {
        mode.nicam = None;
    }

    mode.validate()?;
    Ok(mode)
}

fn parse_wss_aspect(tag: &str) -> Result<WssAspect> {
    match tag {
        "4:3" => Ok(WssAspect::FullFormat4x3),
        "14:9-letterbox" | "14:9-top" => Ok(WssAspect::Box14x9Top),
        "14:9" => Ok(WssAspect::Box14x9),
        "16:9-letterbox" | "16:9-top" => Ok(WssAspect::Box16x9Top),
        "16:9-box" => Ok(WssAspect::Box16x9),
        "16:9-full" => Ok(WssAspect::FullFormat16x9),
        "anamorphic-16:9" | "16:9" => Ok(WssAspect::Anamorphic16x9),
        other => Err(eyre!("unknown WSS aspect tag '{other}'")),
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };

    if let Some(sample_rate) = cli.sample_rate {
        config.sample_rate = sample_rate;
    }
    if let Some(frames) = cli.frames {
        config.input.frames = frames;
    }
    if let Some(pattern) = &cli.pattern {
        config.input.pattern = match pattern.as_str() {
            "colourbars" | "colour-bars" => TestPattern::ColourBars,
            "greyramp" | "grey-ramp" => TestPattern::GreyRamp,
            other => return Err(eyre!("unknown test pattern '{other}'")),
        };
    }
    if let Some(output) = &cli.output {
        let (kind, path) = output
            .split_once(':')
            .ok_or_else(|| eyre!("--output must be 'file:<path>' or 'wav:<path>'"))?;
        config.output.kind = match kind {
            "file" => SinkKind::File,
            "wav" => SinkKind::Wav,
            other => return Err(eyre!("unknown output sink '{other}'")),
        };
        config.output.path = PathBuf::from(path);
    }
    if let Some(wss) = &cli.wss {
        config.vbi.wss = Some(wss.clone());
    }
    if cli.acp {
        config.vbi.acp = true;
    }
    if cli.vits {
        config.vbi.vits = true;
    }
    if let Some(scrambler) = &cli.scrambler {
        config.scrambler.mode = Some(scrambler.clone());
    }
    if let Some(cw) = &cli.control_word {
        config.scrambler.control_word =
            u64::from_str_radix(cw.trim_start_matches("0x"), 16)
                .map_err(|_| eyre!("--control-word must be a hex literal"))?;
    }

    let mut logger = logging::StructuredLogger::new(config.terminal.logging.clone())?;
    let mode = resolve_mode(&cli, &config)?;

    logger.log(LogEvent::Info {
        message: format!(
            "starting mode '{}' at {:.0} Hz ({} lines, {:.3} fps)",
            mode.name,
            config.sample_rate,
            mode.lines,
            mode.frame_rate.as_f64()
        ),
    })?;

    let mut engine = Engine::new(mode.clone(), config.sample_rate)?;

    if let Some(tag) = &config.vbi.wss {
        let aspect = parse_wss_aspect(tag)?;
        engine.add_vbi_inserter(Box::new(WssInserter::new(&mode, aspect)));
        logger.log(LogEvent::Info {
            message: format!("WSS enabled, aspect tag '{tag}'"),
        })?;
    }
    if config.vbi.acp {
        engine.add_vbi_inserter(Box::new(AcpInserter::new(&mode, Default::default())));
        logger.log(LogEvent::Info {
            message: "ACP pseudo-sync pulses enabled".to_string(),
        })?;
    }
    if config.vbi.vits {
        engine.add_vbi_inserter(Box::new(VitsInserter::new(&mode, 19)));
        logger.log(LogEvent::Info {
            message: "VITS test line enabled on line 19".to_string(),
        })?;
    }
    if config.vbi.vitc {
        engine.add_vbi_inserter(Box::new(VitcInserter::new(&mode, 20)));
        logger.log(LogEvent::Info {
            message: "VITC timecode enabled on line 20".to_string(),
        })?;
    }

    if let Some(scrambler_name) = &config.scrambler.mode {
        let parsed = ScramblerMode::from_str(scrambler_name)
            .map_err(|e| eyre!("invalid --scrambler value: {e}"))?;
        let control_word = ControlWord::new(config.scrambler.control_word)?;
        match parsed {
            ScramblerMode::VideocryptI => engine.add_scrambler(Box::new(VideocryptScrambler::new(
                VideocryptVariant::I,
                control_word,
            ))),
            ScramblerMode::VideocryptII => engine.add_scrambler(Box::new(VideocryptScrambler::new(
                VideocryptVariant::Ii,
                control_word,
            ))),
            ScramblerMode::VideocryptS => engine.add_scrambler(Box::new(VideocryptScrambler::new(
                VideocryptVariant::S,
                control_word,
            ))),
            ScramblerMode::Syster => {
                engine.add_scrambler(Box::new(SysterScrambler::new(control_word)))
            }
            ScramblerMode::EurocryptMac => {
                logger.log(LogEvent::Warn {
                    message: "eurocrypt-mac scrambling requires a MAC mode and ECM source; \
                              not wired into the line ring for this run"
                        .to_string(),
                })?;
            }
        }
        logger.log(LogEvent::Info {
            message: format!("scrambler '{scrambler_name}' enabled"),
        })?;
    }

    let active_width =
        (mode.active_width_s * config.sample_rate).round().max(1.0) as u32;
    let mut source = TestPatternSource::new(
        config.input.pattern,
        active_width,
        mode.active_lines,
        config.input.frames,
        mode.frame_rate.as_f64(),
    );

    let complex = matches!(mode.output_kind, OutputKind::ComplexIq);
    let mut radio_sink: Box<dyn hacktv_core::sink::RadioSink> = match config.output.kind {
        SinkKind::File => Box::new(FileSink::create(&config.output.path)?),
        SinkKind::Wav => Box::new(WavSink::create(
            &config.output.path,
            config.sample_rate.round() as u32,
            complex,
        )?),
    };

    let progress = ProgressBar::new(config.input.frames as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] frame {pos}/{len} {msg}")
            .unwrap(),
    );

    let mut telemetry = TelemetryAggregator::new(mode.name, config.terminal.telemetry_interval_secs);
    let line_decoder = LineDecoder::new(&mode);
    let mut modulator = IfModulator::new(&mode, config.sample_rate)?;
    let mut last_frame_reported = u64::MAX;

    // We drive `next_line` directly rather than `Engine::write_next_line` so
    // we can inspect each line for telemetry/diagnostics before it is
    // modulated away; the IF stage is re-run here with our own modulator
    // instance built from the same mode and sample rate.
    loop {
        let line_snapshot = match engine.next_line(&mut source) {
            Ok(Some(line)) => Some((line.frame_no, line.line_no, line.field, line.video.clone())),
            Ok(None) => None,
            Err(err) => {
                logger.log(LogEvent::Error {
                    message: "pipeline error".to_string(),
                    details: Some(err.to_string()),
                })?;
                return Err(err.into());
            }
        };
        let Some((frame_no, line_no, field, video)) = line_snapshot else {
            break;
        };

        telemetry.record_line(frame_no, &video);

        if cli.verbose {
            let event = line_decoder.decode(&hacktv_core::line::Line {
                line_no,
                frame_no,
                field,
                video: video.clone(),
                video_q: Vec::new(),
                burst_written: true,
            });
            logger.log(LogEvent::Line(event))?;
        }

        match mode.output_kind {
            OutputKind::ComplexIq => {
                let samples = modulator.modulate(&video);
                radio_sink.write_iq(&samples)?;
            }
            OutputKind::RealBaseband => {
                radio_sink.write_real(&video)?;
            }
        }

        if frame_no != last_frame_reported {
            last_frame_reported = frame_no;
            progress.set_position(frame_no);
        }

        if let Some(event) = telemetry.sample() {
            logger.log(LogEvent::Telemetry(event))?;
        }
    }

    progress.finish_with_message("done");

    let (rms, peak) = telemetry.compute_statistics();
    let stats = StatisticsEvent {
        timestamp: chrono::Utc::now(),
        duration_secs: logger.elapsed(),
        rms_level: rms,
        peak_level: peak,
        total_lines: telemetry.total_lines(),
        total_frames: telemetry.total_frames(),
    };
    logger.log(LogEvent::Statistics(stats))?;

    radio_sink.close()?;
    Ok(())
}
