use thiserror::Error;

use crate::{file::LoadError, reader::ReaderError};

/// Errors that end a playback session early.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A track's bytes could not be decoded.
    #[error("track {track} is corrupt: {source}")]
    CorruptTrackData {
        /// zero-based track index
        track: usize,
        /// what went wrong, and where in the sequence buffer
        #[source]
        source: ReaderError,
    },
    /// The scheduler thread could not be started.
    #[error("could not start the scheduler thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The scheduler thread panicked.
    #[error("the scheduler thread panicked")]
    SchedulerPanicked,
}

/// Anything [`Player::load`](super::Player::load) can fail with.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The file was rejected.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The session could not be started.
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
