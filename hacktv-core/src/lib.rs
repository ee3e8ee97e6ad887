//! hacktv-core: a line-synchronous synthesiser for analogue television
//! baseband and IQ signals.
//!
//! The engine in [`engine`] pulls frames from an [`av_source::AvSource`],
//! threads each output line through an ordered chain of line processors
//! (raster/sync, VBI, colour, scrambling, MAC, audio mixing, filtering,
//! IF modulation) and hands the result to a [`sink::RadioSink`]. Nothing
//! in this crate parses command lines, opens a radio device or decodes
//! compressed video; those are external collaborators reached only
//! through the trait contracts in [`av_source`] and [`sink`].

pub mod audio;
pub mod av_source;
pub mod config;
pub mod engine;
pub mod errors;
pub mod filters;
pub mod levels;
pub mod line;
pub mod mac;
pub mod modulator;
pub mod raster;
pub mod scrambler;
pub mod secam;
pub mod sink;
pub mod utils;
pub mod vbi;

pub use config::ModeConfig;
pub use engine::Engine;
pub use errors::{CoreError, Result};
pub use line::Line;
