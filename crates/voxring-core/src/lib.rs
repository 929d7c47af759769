//! Voxring Core - Streaming playback for synthesized speech
//!
//! Audio arrives in chunks of arbitrary size, is cushioned in a growable
//! ring buffer, and is pulled out by the output device in fixed quanta at
//! an adjustable playback rate. A barge-in discards everything not yet
//! heard.

pub mod analysis;
pub mod audio;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod player;
pub mod types;

pub use config::PlayerConfig;
pub use player::{AudioPlayer, PlayerError, PlayerResult};
pub use types::*;
