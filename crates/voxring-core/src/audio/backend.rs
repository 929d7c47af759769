//! Output backend trait
//!
//! A backend is whatever calls [`RenderWorker::render`] once per quantum:
//! - **cpal**: the platform audio device
//! - **offline**: a caller-driven host for tests and file rendering
//!
//! The worker is moved into the backend when the output is opened; the
//! returned stream value keeps it running and tears it down when dropped.

use crate::engine::RenderWorker;

use super::config::OutputConfig;
use super::error::AudioResult;

/// What the backend actually negotiated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    /// Device label
    pub device: String,
    pub sample_rate: u32,
    /// Device channels the mono render is fanned out to
    pub channels: u16,
    /// Render quantum in frames
    pub quantum: u32,
}

impl OutputInfo {
    /// One-way output latency of a single quantum
    pub fn latency_ms(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.quantum as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// A running output
pub struct OpenedOutput<S> {
    /// Drop to stop rendering
    pub stream: S,
    pub info: OutputInfo,
}

/// Host API the render worker is injected into
pub trait OutputBackend {
    /// Keeps the output alive; dropping it stops the render callback
    type Stream;

    /// Start rendering `worker` at `sample_rate`
    fn open(
        &mut self,
        worker: RenderWorker,
        sample_rate: u32,
        config: &OutputConfig,
    ) -> AudioResult<OpenedOutput<Self::Stream>>;
}
