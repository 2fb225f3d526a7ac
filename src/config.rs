//! Configuration for the encoder and decoder.

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;

/// Default sample rate in Hz for both directions.
pub const DEFAULT_SAMPLE_RATE: f64 = 15_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Input sample rate in Hz.
    pub sample_rate: f64,

    /// Seconds without a plausible hsync before the decoder abandons a
    /// partially received image and re-arms detection.
    pub timeout_secs: u32,

    /// Track the observed line period and correct for clock drift between
    /// transmitter and receiver.
    pub slant_correction: bool,

    /// Logging surface of the decoder's [`crate::logging::SignalLogger`].
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            timeout_secs: 30,
            slant_correction: true,
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Output sample rate in Hz.
    pub sample_rate: f64,

    /// Logging surface of the encoder's [`crate::logging::SignalLogger`].
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            log: LogConfig::default(),
        }
    }
}
