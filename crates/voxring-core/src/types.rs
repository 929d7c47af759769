//! Common types for voxring
//!
//! Fundamental sample, rate and state types shared by the ring buffer,
//! the render worker and the control plane.

use serde::{Deserialize, Serialize};

/// Default playback sample rate (24kHz, the common TTS output rate)
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

/// Largest device quantum the render path pre-allocates for
/// Common values: 128, 256, 512, 1024 frames
pub const MAX_QUANTUM: usize = 8192;

/// Slowest supported playback speed
pub const MIN_PLAYBACK_RATE: f64 = 0.5;

/// Fastest supported playback speed
pub const MAX_PLAYBACK_RATE: f64 = 2.0;

/// Audio sample type (normalized 32-bit float, mono)
pub type Sample = f32;

/// Buffering state of the ring buffer
///
/// `Accumulating` forces silence until the unread region reaches the
/// initial threshold; `Ready` lets reads drain the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BufferState {
    #[default]
    Accumulating = 0,
    Ready = 1,
}

impl BufferState {
    /// Decode from the `u8` representation stored in atomics
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => BufferState::Ready,
            _ => BufferState::Accumulating,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BufferState::Accumulating => "accumulating",
            BufferState::Ready => "ready",
        }
    }
}

/// Playback speed multiplier, always within
/// [`MIN_PLAYBACK_RATE`, `MAX_PLAYBACK_RATE`]
///
/// Speed changes alter pitch: the render path resamples linearly.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    /// Normal speed
    pub const NORMAL: PlaybackRate = PlaybackRate(1.0);

    /// Clamp an arbitrary value into the supported range
    ///
    /// Non-finite input (NaN, infinities) maps to normal speed.
    pub fn new(rate: f64) -> Self {
        if !rate.is_finite() {
            return Self::NORMAL;
        }
        Self(rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_normal(self) -> bool {
        self.0 == 1.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<f64> for PlaybackRate {
    fn from(rate: f64) -> Self {
        Self::new(rate)
    }
}

impl From<PlaybackRate> for f64 {
    fn from(rate: PlaybackRate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}x", self.0)
    }
}

/// Convert a duration in milliseconds to a sample count at `sample_rate`
#[inline]
pub fn ms_to_samples(ms: u32, sample_rate: u32) -> usize {
    (u64::from(ms) * u64::from(sample_rate) / 1000) as usize
}
