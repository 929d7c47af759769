//! Control channel from the control plane into the render worker
//!
//! The control side pushes [`ControlMessage`]s, the render worker pops them
//! at the start of every quantum. Messages are applied exactly once and in
//! the order they were sent; a flush therefore lands after all earlier
//! audio and before any later audio.
//!
//! # Real-Time Safety
//!
//! The queue is a `crossbeam` unbounded channel:
//! - **Render side**: `try_recv` never blocks and takes no lock
//! - **Control side**: `send` never blocks and never fails while the render
//!   side is alive, so nothing is dropped or reordered however large a burst
//!
//! The channel allocates in blocks on the control side; the render side
//! only releases a block once every 31 messages.
//!
//! ```ignore
//! let (tx, mut rx) = command_channel();
//!
//! // Control thread
//! tx.send(ControlMessage::Flush);
//!
//! // Render thread, once per quantum
//! for _ in 0..rx.pending() {
//!     if let Some(msg) = rx.pop() { /* apply */ }
//! }
//! ```

use basedrop::{Handle, Owned};
use crossbeam::channel::{self, Receiver, Sender};

use crate::types::Sample;

/// Messages sent from the control plane to the render worker
pub enum ControlMessage {
    /// Decoded audio to append to the ring buffer
    ///
    /// Wrapped in `Owned` so the payload is freed off the render thread.
    Audio(Owned<Vec<Sample>>),
    /// Discard everything buffered (barge-in)
    Flush,
    /// New playback speed; clamped again when applied
    SetPlaybackRate(f64),
    /// New cushion length in samples
    SetInitialThreshold(usize),
}

impl ControlMessage {
    /// Build an audio message whose payload is released by the collector
    pub fn audio(handle: &Handle, samples: &[Sample]) -> Self {
        ControlMessage::Audio(Owned::new(handle, samples.to_vec()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlMessage::Audio(_) => "Audio",
            ControlMessage::Flush => "Flush",
            ControlMessage::SetPlaybackRate(_) => "SetPlaybackRate",
            ControlMessage::SetInitialThreshold(_) => "SetInitialThreshold",
        }
    }
}

impl std::fmt::Debug for ControlMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlMessage::Audio(samples) => write!(f, "Audio({} samples)", samples.len()),
            ControlMessage::Flush => write!(f, "Flush"),
            ControlMessage::SetPlaybackRate(rate) => write!(f, "SetPlaybackRate({})", rate),
            ControlMessage::SetInitialThreshold(n) => write!(f, "SetInitialThreshold({})", n),
        }
    }
}

/// Control-side end of the channel
pub struct CommandSender {
    tx: Sender<ControlMessage>,
}

impl CommandSender {
    /// Queue a message (never blocks)
    ///
    /// Only fails once the render worker is gone, in which case the message
    /// has nowhere to go and is dropped.
    pub fn send(&self, message: ControlMessage) {
        if let Err(channel::SendError(message)) = self.tx.send(message) {
            log::debug!("Render worker gone, discarding {}", message.name());
        }
    }

    /// Messages sent but not yet picked up by the render worker
    pub fn queued(&self) -> usize {
        self.tx.len()
    }
}

/// Render-side end of the channel
pub struct CommandReceiver {
    rx: Receiver<ControlMessage>,
}

impl CommandReceiver {
    /// Messages queued right now
    ///
    /// The render worker drains exactly this many per quantum so a busy
    /// producer can't keep it spinning.
    #[inline]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn pop(&mut self) -> Option<ControlMessage> {
        self.rx.try_recv().ok()
    }
}

/// Create an unbounded control channel
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = channel::unbounded();
    (CommandSender { tx }, CommandReceiver { rx })
}
