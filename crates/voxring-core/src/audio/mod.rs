//! Audio output for voxring
//!
//! The render worker is injected into an [`OutputBackend`]:
//! - [`CpalBackend`]: the platform device (ALSA/PipeWire, WASAPI, CoreAudio)
//! - [`OfflineBackend`]: caller-driven, for tests and rendering to files
//!
//! # Architecture
//!
//! - **Control thread**: sends commands via a lock-free ringbuffer
//! - **Audio thread**: owns the RenderWorker exclusively, drains commands
//!   at the start of each quantum
//! - **Atomics / tap**: control thread reads diagnostics and levels without
//!   locks

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;
mod offline;

pub use backend::{OpenedOutput, OutputBackend, OutputInfo};
pub use config::{BufferSize, DeviceId, OutputConfig, DEFAULT_QUANTUM, MIN_QUANTUM};
pub use cpal_backend::{CpalBackend, CpalStream};
pub use device::{output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};
pub use offline::{OfflineBackend, OfflineDriver, OfflineStream};
