//! Sample storage for the render path
//!
//! - [`RingBuffer`]: growable SPSC store with the accumulate/ready state machine
//! - Linear interpolation used by speed-adjusted reads

mod interp;
mod ring;

pub use interp::linear_at;
pub use ring::{BufferError, RingBuffer, WriteOutcome};
