//! Control-plane error types

use thiserror::Error;

use crate::audio::AudioError;

/// Errors surfaced by [`super::AudioPlayer`]
///
/// Misuse (commands before `start()`) is not an error: it is logged and
/// ignored.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The output could not be opened
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// The render side hit an unrecoverable fault; the player has stopped
    #[error("Playback session failed: ring buffer could not grow to {requested} samples")]
    SessionFailed { requested: usize },
}

/// Result type for player operations
pub type PlayerResult<T> = Result<T, PlayerError>;
