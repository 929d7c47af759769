//! Player configuration
//!
//! Everything is stored in time units where that is what people reason
//! about (capacity, cushion) and converted to samples at the fixed rate.

use serde::{Deserialize, Serialize};

use crate::analysis::DEFAULT_ANALYSIS_WINDOW;
use crate::audio::OutputConfig;
use crate::types::{ms_to_samples, DEFAULT_SAMPLE_RATE};

/// Environment variable carrying the diagnostic threshold override (samples)
pub const THRESHOLD_ENV: &str = "VOXRING_INITIAL_THRESHOLD";

/// Settings read when a player session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Fixed playback rate in Hz; audio must already be at this rate
    pub sample_rate: u32,
    /// Ring buffer pre-allocation. One second keeps ordinary streaming off
    /// the growth path.
    pub initial_capacity_ms: u32,
    /// Audio required before playback starts or resumes after running dry
    pub initial_threshold_ms: u32,
    /// Diagnostic override of the cushion in samples, applied at start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_threshold_override: Option<usize>,
    /// Samples kept for volume / waveform polling
    pub analysis_window: usize,
    pub output: OutputConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            initial_capacity_ms: 1000,
            initial_threshold_ms: 100,
            initial_threshold_override: None,
            analysis_window: DEFAULT_ANALYSIS_WINDOW,
            output: OutputConfig::default(),
        }
    }
}

impl PlayerConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_initial_threshold_ms(mut self, ms: u32) -> Self {
        self.initial_threshold_ms = ms;
        self
    }

    pub fn with_threshold_override(mut self, samples: usize) -> Self {
        self.initial_threshold_override = Some(samples);
        self
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Ring buffer capacity in samples
    pub fn initial_capacity(&self) -> usize {
        ms_to_samples(self.initial_capacity_ms, self.sample_rate)
    }

    /// Cushion in samples before any override
    pub fn initial_threshold(&self) -> usize {
        ms_to_samples(self.initial_threshold_ms, self.sample_rate)
    }

    /// Override to apply at start: the environment wins over the file
    pub fn threshold_override(&self) -> Option<usize> {
        let env = std::env::var(THRESHOLD_ENV).ok();
        resolve_threshold_override(env.as_deref(), self.initial_threshold_override)
    }
}

fn resolve_threshold_override(env: Option<&str>, configured: Option<usize>) -> Option<usize> {
    match env.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(samples) => Some(samples),
            Err(e) => {
                log::warn!(
                    "Ignoring {}={:?}: {}, using configured value",
                    THRESHOLD_ENV,
                    raw,
                    e
                );
                configured
            }
        },
        None => configured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_in_samples() {
        let config = PlayerConfig::default();
        assert_eq!(config.initial_capacity(), 24000);
        assert_eq!(config.initial_threshold(), 2400);
    }

    #[test]
    fn test_sample_conversions_follow_rate() {
        let config = PlayerConfig::default().with_sample_rate(16000);
        assert_eq!(config.initial_capacity(), 16000);
        assert_eq!(config.initial_threshold(), 1600);
    }

    #[test]
    fn test_env_override_wins() {
        assert_eq!(resolve_threshold_override(Some("512"), Some(100)), Some(512));
        assert_eq!(resolve_threshold_override(Some(" 64 "), None), Some(64));
    }

    #[test]
    fn test_bad_or_missing_env_falls_back() {
        assert_eq!(resolve_threshold_override(Some("lots"), Some(100)), Some(100));
        assert_eq!(resolve_threshold_override(Some(""), None), None);
        assert_eq!(resolve_threshold_override(None, Some(7)), Some(7));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: PlayerConfig = serde_yaml::from_str("sample_rate: 16000\n").unwrap();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.initial_capacity_ms, 1000);
        assert_eq!(config.output, OutputConfig::default());
    }
}
