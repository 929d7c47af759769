//! Output configuration
//!
//! Device selection and quantum preference. The sample rate is not part of
//! this: it is fixed per player (see `PlayerConfig`).

use serde::{Deserialize, Serialize};

use crate::types::MAX_QUANTUM;

/// Smallest quantum we ask a device for (frames)
pub const MIN_QUANTUM: u32 = 64;

/// Quantum used when nothing is requested (frames)
///
/// 480 frames @ 24kHz = 20ms, the usual network frame for voice.
pub const DEFAULT_QUANTUM: u32 = 480;

/// Preferred render quantum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the device choose
    #[default]
    Default,
    /// Request a specific quantum in frames (clamped to what we pre-allocate)
    Fixed(u32),
}

impl BufferSize {
    /// Requested frames, or None for the device default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some((*frames).clamp(MIN_QUANTUM, MAX_QUANTUM as u32)),
        }
    }

    /// Frames to plan around when the device doesn't say
    pub fn frames_or_default(&self) -> u32 {
        self.as_frames().unwrap_or(DEFAULT_QUANTUM)
    }
}

/// Audio device identifier
///
/// Device name plus the host backend (ALSA, PulseAudio, CoreAudio, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    pub name: String,
    /// None = search every available host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Output device settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// None = system default output
    pub device: Option<DeviceId>,
    pub buffer_size: BufferSize,
}

impl OutputConfig {
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }
}
