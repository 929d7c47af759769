//! Offline output backend
//!
//! Stands in for a device when there is no device: tests drive the render
//! worker quantum by quantum, and the CLI renders straight to a file. The
//! worker sits in a slot shared between the stream (held by the player) and
//! the driver (held by whoever pumps quanta). Dropping the stream empties
//! the slot, which is how `stop()` tears the worker down.
//!
//! The slot is a mutex: fine here, this backend is never on a device thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::backend::{OpenedOutput, OutputBackend, OutputInfo};
use super::config::OutputConfig;
use super::error::AudioResult;
use crate::engine::RenderWorker;
use crate::types::Sample;

type WorkerSlot = Arc<Mutex<Option<RenderWorker>>>;

fn lock(slot: &WorkerSlot) -> MutexGuard<'_, Option<RenderWorker>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Caller-driven host
#[derive(Clone)]
pub struct OfflineBackend {
    slot: WorkerSlot,
    quantum: usize,
}

impl OfflineBackend {
    /// Backend rendering `quantum` frames per step
    pub fn new(quantum: usize) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            quantum: quantum.max(1),
        }
    }

    /// Handle that renders whichever worker is currently attached
    pub fn driver(&self) -> OfflineDriver {
        OfflineDriver {
            slot: Arc::clone(&self.slot),
            frame: vec![0.0; self.quantum],
        }
    }
}

/// Keeps the worker attached; drop to detach it
pub struct OfflineStream {
    slot: WorkerSlot,
}

impl Drop for OfflineStream {
    fn drop(&mut self) {
        lock(&self.slot).take();
    }
}

impl OutputBackend for OfflineBackend {
    type Stream = OfflineStream;

    fn open(
        &mut self,
        worker: RenderWorker,
        sample_rate: u32,
        _config: &OutputConfig,
    ) -> AudioResult<OpenedOutput<OfflineStream>> {
        if lock(&self.slot).replace(worker).is_some() {
            log::warn!("Offline backend replaced a worker that was still attached");
        }
        Ok(OpenedOutput {
            stream: OfflineStream {
                slot: Arc::clone(&self.slot),
            },
            info: OutputInfo {
                device: "offline".to_string(),
                sample_rate,
                channels: 1,
                quantum: self.quantum as u32,
            },
        })
    }
}

/// Pumps quanta through the attached worker
pub struct OfflineDriver {
    slot: WorkerSlot,
    frame: Vec<Sample>,
}

impl OfflineDriver {
    pub fn is_attached(&self) -> bool {
        lock(&self.slot).is_some()
    }

    pub fn quantum(&self) -> usize {
        self.frame.len()
    }

    /// Render one quantum; None when no worker is attached
    pub fn render_quantum(&mut self) -> Option<&[Sample]> {
        let mut slot = lock(&self.slot);
        let worker = slot.as_mut()?;
        worker.render(&mut self.frame);
        drop(slot);
        Some(&self.frame)
    }

    /// Render `count` quanta back to back
    ///
    /// Stops early (returning what was rendered) if the worker detaches.
    pub fn render_quanta(&mut self, count: usize) -> Vec<Sample> {
        let mut out = Vec::with_capacity(count * self.frame.len());
        for _ in 0..count {
            match self.render_quantum() {
                Some(frame) => out.extend_from_slice(frame),
                None => break,
            }
        }
        out
    }
}
