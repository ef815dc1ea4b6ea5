//! Core type definitions for the library and playback state

use tokio::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An item from the external video catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub channel_label: String,
    pub thumbnail_url: String,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            channel_label: String::new(),
            thumbnail_url: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FavoriteEntry {
    pub track: Track,
    pub added_at: DateTime<Utc>,
}

/// One play event. The same track may appear many times.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub entry_id: i64,
    pub track: Track,
    pub played_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub videos: Vec<Track>,
    pub created_at: DateTime<Utc>,
}

impl Playlist {
    pub fn position_of(&self, track_id: &str) -> Option<usize> {
        self.videos.iter().position(|t| t.id == track_id)
    }
}

/// A playlist row for overview listings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: i64,
    pub name: String,
    pub video_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A search hit, flagged with whether it is already a favorite
#[derive(Clone, Debug)]
pub struct SearchTrack {
    pub track: Track,
    pub favorite: bool,
}

/// Which traversal mode the engine is in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    PlayingStandalone,
    PlayingInPlaylist,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible message raised by a transition or a failed command
#[derive(Clone, Debug)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: Instant,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Instant::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}
