//! The `RadioSink` contract: where finished samples go. HackRF, SoapySDR
//! and FL2K back ends are external collaborators that implement this
//! trait; this crate ships none of them.

use num_complex::Complex64;

use crate::errors::CoreError;

/// A destination for completed lines of modulated samples.
pub trait RadioSink {
    /// Write one line's worth of complex IQ samples.
    fn write_iq(&mut self, samples: &[Complex64]) -> Result<(), CoreError>;

    /// Write one line's worth of real baseband samples (for modes
    /// configured with `OutputKind::RealBaseband`).
    fn write_real(&mut self, samples: &[f64]) -> Result<(), CoreError>;

    /// Flush and release any resources the sink holds.
    fn close(&mut self) -> Result<(), CoreError>;
}
