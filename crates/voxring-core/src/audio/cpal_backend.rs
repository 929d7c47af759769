//! CPAL output backend
//!
//! ```text
//! ┌──────────────────┐   push()    ┌─────────────────────┐
//! │  Control plane   │────────────►│   Command Queue     │
//! │  (AudioPlayer)   │             │  (lock-free SPSC)   │
//! └──────────────────┘             └──────────┬──────────┘
//!         ▲                                   │ pop() per quantum
//!         │ relaxed atomics / tap             ▼
//! ┌──────────────────┐             ┌─────────────────────┐
//! │ PlaybackAtomics  │◄────────────│  CPAL Audio Thread  │
//! │  AnalysisTap     │             │ (owns RenderWorker) │
//! └──────────────────┘             └─────────────────────┘
//! ```
//!
//! The worker is moved into the stream callback, so the render thread owns
//! it outright: no mutex between the device and the ring buffer. The worker
//! renders mono; each sample is copied to every device channel.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, SampleRate, Stream, StreamConfig};

use super::backend::{OpenedOutput, OutputBackend, OutputInfo};
use super::config::OutputConfig;
use super::device::{default_output_device, find_device_by_id};
use super::error::{AudioError, AudioResult};
use crate::engine::RenderWorker;
use crate::types::{Sample, MAX_QUANTUM};

/// Plays through a cpal output device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Live cpal stream; drop to stop audio
pub struct CpalStream {
    _stream: Stream,
}

impl OutputBackend for CpalBackend {
    type Stream = CpalStream;

    fn open(
        &mut self,
        worker: RenderWorker,
        sample_rate: u32,
        config: &OutputConfig,
    ) -> AudioResult<OpenedOutput<CpalStream>> {
        let device = match &config.device {
            Some(id) => find_device_by_id(id)?,
            None => default_output_device()?,
        };
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let channels = select_channels(&device, &device_name, sample_rate)?;
        let quantum = config.buffer_size.as_frames();

        let stream_config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: quantum.map_or(CpalBufferSize::Default, CpalBufferSize::Fixed),
        };

        let info = OutputInfo {
            device: device_name,
            sample_rate,
            channels,
            quantum: config.buffer_size.frames_or_default(),
        };
        log::info!(
            "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
            info.channels,
            info.sample_rate,
            info.quantum,
            info.latency_ms()
        );

        let stream = build_output_stream(&device, &stream_config, worker)?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;
        log::info!("Audio stream started");

        Ok(OpenedOutput {
            stream: CpalStream { _stream: stream },
            info,
        })
    }
}

/// Pick the channel count for a float stream at `sample_rate`
///
/// Mono is preferred; otherwise the narrowest float layout wins.
fn select_channels(device: &cpal::Device, device_name: &str, sample_rate: u32) -> AudioResult<u16> {
    let at_rate: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| sample_rate >= c.min_sample_rate().0 && sample_rate <= c.max_sample_rate().0)
        .collect();

    if at_rate.is_empty() {
        return Err(AudioError::UnsupportedSampleRate {
            device: device_name.to_string(),
            sample_rate,
        });
    }

    at_rate
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .map(|c| c.channels())
        .filter(|&ch| ch > 0)
        .min()
        .ok_or_else(|| {
            let formats: Vec<String> = at_rate
                .iter()
                .map(|c| format!("{:?}", c.sample_format()))
                .collect();
            AudioError::UnsupportedFormat(format!(
                "'{}' offers only {} at {}Hz",
                device_name,
                formats.join(", "),
                sample_rate
            ))
        })
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut worker: RenderWorker,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;
    // Pre-allocated so the callback never allocates
    let mut mono: Vec<Sample> = vec![0.0; MAX_QUANTUM];

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                for block in data.chunks_mut(MAX_QUANTUM * channels) {
                    let frames = block.len() / channels;
                    let mono = &mut mono[..frames];
                    worker.render(mono);
                    for (frame, &sample) in block.chunks_mut(channels).zip(mono.iter()) {
                        frame.fill(sample);
                    }
                }
            },
            move |err| {
                log::error!("Audio output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
