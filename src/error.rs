//! Error taxonomy shared by the library store and the sequencing engine

use thiserror::Error;

/// Failure reported by the embedded playback widget
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is not ready")]
    NotReady,

    #[error("failed to load {track_id}: {reason}")]
    Load { track_id: String, reason: String },

    #[error("transport command failed: {0}")]
    Command(String),
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage task failed: {0}")]
    StorageTask(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
    Transport,
}

impl LibraryError {
    pub fn playlist_not_found(id: i64) -> Self {
        LibraryError::NotFound(format!("Playlist {}", id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::Validation(_) => ErrorKind::Validation,
            LibraryError::NotFound(_) => ErrorKind::NotFound,
            LibraryError::Storage(_) | LibraryError::StorageTask(_) => ErrorKind::Storage,
            LibraryError::Transport(_) => ErrorKind::Transport,
        }
    }
}

impl From<tokio::task::JoinError> for LibraryError {
    fn from(error: tokio::task::JoinError) -> Self {
        LibraryError::StorageTask(error.to_string())
    }
}

pub type LibraryResult<T> = Result<T, LibraryError>;
