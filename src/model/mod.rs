//! Model module - Library data and playback state
//!
//! - `types`: Core type definitions (tracks, entries, playlists, notices)
//! - `store`: SQLite-backed library store
//! - `cache`: Favorite id cache for fast lookup
//! - `playback`: Playback session (what is loaded, timing, seek latch)
//! - `cursor`: Position within the driving playlist
//! - `app_model`: The owned session object the engine mutates

mod types;
mod store;
mod cache;
mod playback;
mod cursor;
mod app_model;

pub use types::{
    FavoriteEntry, HistoryEntry, Notice, NoticeLevel, PlaybackState, Playlist,
    PlaylistSummary, SearchTrack, Track,
};

pub use store::LibraryStore;

pub use cache::FavoritesCache;

pub use playback::{format_seconds, PlaybackInfo};

pub use cursor::PlaylistCursor;

pub use app_model::AppModel;
