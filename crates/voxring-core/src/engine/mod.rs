//! Render engine - control channel, render worker, diagnostics
//!
//! - Command queue: ordered control-plane → render-thread messages
//! - RenderWorker: per-quantum body owning the ring buffer
//! - PlaybackAtomics: lock-free diagnostics back to the control plane
//! - gc: deferred deallocation off the render thread

mod atomics;
mod command;
mod gc;
mod worker;

pub use atomics::{PlaybackAtomics, PlaybackStats};
pub use command::{command_channel, CommandReceiver, CommandSender, ControlMessage};
pub use gc::gc_handle;
pub use worker::RenderWorker;
