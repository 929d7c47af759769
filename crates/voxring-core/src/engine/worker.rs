//! Real-time render worker
//!
//! Owns the ring buffer and runs once per device quantum:
//!
//! 1. Apply the control messages queued at entry (no waiting for more)
//! 2. Read one frame from the ring buffer at the current playback rate
//! 3. Copy the frame into the analysis tap and publish diagnostics
//!
//! Nothing here locks or blocks. The only allocation is ring-buffer growth,
//! and whatever that growth retires is released by the collector thread.

use std::sync::Arc;

use basedrop::{Handle, Owned};

use super::atomics::PlaybackAtomics;
use super::command::{CommandReceiver, ControlMessage};
use crate::buffer::{BufferError, RingBuffer, WriteOutcome};
use crate::types::{PlaybackRate, Sample};

/// Render callback body injected into an output backend
pub struct RenderWorker {
    buffer: RingBuffer,
    commands: CommandReceiver,
    rate: PlaybackRate,
    atomics: Arc<PlaybackAtomics>,
    /// Output copy for visualization; samples are dropped when it is full
    tap: Option<rtrb::Producer<Sample>>,
    gc: Handle,
    /// Set after a failed growth; the session renders silence from then on
    faulted: bool,
}

impl RenderWorker {
    pub fn new(
        buffer: RingBuffer,
        commands: CommandReceiver,
        atomics: Arc<PlaybackAtomics>,
        gc: Handle,
    ) -> Self {
        atomics.publish(&buffer, PlaybackRate::NORMAL);
        Self {
            buffer,
            commands,
            rate: PlaybackRate::NORMAL,
            atomics,
            tap: None,
            gc,
            faulted: false,
        }
    }

    /// Feed every rendered frame into `tap`
    pub fn with_tap(mut self, tap: rtrb::Producer<Sample>) -> Self {
        self.tap = Some(tap);
        self
    }

    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    pub fn playback_rate(&self) -> PlaybackRate {
        self.rate
    }

    pub fn atomics(&self) -> Arc<PlaybackAtomics> {
        Arc::clone(&self.atomics)
    }

    /// Produce one quantum into `output`
    ///
    /// Returns the number of source samples consumed from the ring buffer.
    pub fn render(&mut self, output: &mut [Sample]) -> usize {
        let pending = self.commands.pending();
        for _ in 0..pending {
            let Some(message) = self.commands.pop() else {
                break;
            };
            self.apply(message);
        }

        let consumed = if self.faulted {
            output.fill(0.0);
            0
        } else {
            self.buffer.read_with_speed(output, self.rate)
        };

        if let Some(tap) = self.tap.as_mut() {
            for &sample in output.iter() {
                if tap.push(sample).is_err() {
                    break;
                }
            }
        }

        self.atomics.publish(&self.buffer, self.rate);
        self.atomics.record_quantum();
        consumed
    }

    fn apply(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Audio(samples) => self.write(&samples),
            ControlMessage::Flush => self.buffer.clear_buffer(),
            ControlMessage::SetPlaybackRate(rate) => self.rate = PlaybackRate::new(rate),
            ControlMessage::SetInitialThreshold(samples) => {
                self.buffer.set_initial_buffer_length(samples)
            }
        }
    }

    fn write(&mut self, samples: &[Sample]) {
        if self.faulted {
            return;
        }
        match self.buffer.write(samples) {
            Ok(WriteOutcome::Grown { retired }) => {
                self.atomics.record_growth();
                drop(Owned::new(&self.gc, retired));
            }
            Ok(_) => {}
            Err(err) => self.fault(err),
        }
    }

    fn fault(&mut self, err: BufferError) {
        let requested = match &err {
            BufferError::Allocation { requested, .. } => *requested,
        };
        log::error!("Render worker stopped accepting audio: {}", err);
        self.faulted = true;
        self.buffer.clear_buffer();
        self.atomics.mark_faulted(requested);
    }
}
