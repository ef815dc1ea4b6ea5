//! Main application model: the one owned session object the engine mutates

use std::time::Duration;
use tokio::task::AbortHandle;

use crate::transport::LoadId;

use super::cursor::PlaylistCursor;
use super::playback::{PlaybackInfo, PlaybackSession};
use super::types::{Notice, PlaybackState, Playlist, SearchTrack, Track};

const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Playback session, playlist cursor and progress task live side by side and
/// only change together through the loading and closing methods below.
#[derive(Default)]
pub struct AppModel {
    session: PlaybackSession,
    cursor: PlaylistCursor,
    progress_task: Option<AbortHandle>,
    current_load: Option<LoadId>,
    viewed_playlist: Option<Playlist>,
    search_results: Vec<SearchTrack>,
    notice: Option<Notice>,
    should_quit: bool,
}

impl AppModel {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Session & Cursor
    // ========================================================================

    pub fn state(&self) -> PlaybackState {
        if !self.session.is_loaded() {
            PlaybackState::Idle
        } else if self.cursor.driving_playlist_id().is_some() {
            PlaybackState::PlayingInPlaylist
        } else {
            PlaybackState::PlayingStandalone
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn cursor(&self) -> &PlaylistCursor {
        &self.cursor
    }

    pub fn playing_track_id(&self) -> Option<&str> {
        self.session.track_id()
    }

    pub fn load_standalone(&mut self, track: Track) {
        self.cursor.reset();
        self.session.start(track);
    }

    /// Take over a freshly begun cursor and load its current item.
    pub fn load_playlist(&mut self, cursor: PlaylistCursor) {
        if let Some(track) = cursor.current().cloned() {
            self.cursor = cursor;
            self.session.start(track);
        }
    }

    /// Move within the driving playlist and load the item at `index`.
    pub fn load_index(&mut self, index: usize) {
        self.cursor.set_index(index);
        if let Some(track) = self.cursor.current().cloned() {
            self.session.start(track);
        }
    }

    pub fn refresh_snapshot(&mut self, videos: Vec<Track>) {
        self.cursor.refresh(videos);
    }

    pub fn set_cursor_index(&mut self, index: usize) {
        self.cursor.set_index(index);
    }

    /// Back to idle: session cleared, cursor reset, progress task cancelled.
    pub fn end_session(&mut self) {
        self.cancel_progress_task();
        self.current_load = None;
        self.session.stop();
        self.cursor.reset();
    }

    /// Remember which transport load backs the session.
    pub fn set_current_load(&mut self, load: LoadId) {
        self.current_load = Some(load);
    }

    pub fn current_load(&self) -> Option<LoadId> {
        self.current_load
    }

    /// True when `load` is the transport load of the live session.
    pub fn is_current_load(&self, load: LoadId) -> bool {
        self.session.is_loaded() && self.current_load == Some(load)
    }

    pub fn update_progress(&mut self, current: f64, duration: f64) -> bool {
        self.session.update_progress(current, duration)
    }

    pub fn set_playing(&mut self, is_playing: bool) {
        self.session.set_playing(is_playing);
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.session.set_duration(duration);
    }

    pub fn set_seeking(&mut self, seeking: bool) {
        self.session.set_seeking(seeking);
    }

    pub fn seek_to(&mut self, seconds: f64) {
        self.session.seek_to(seconds);
    }

    pub fn reset_position(&mut self) {
        self.session.current_time_seconds = 0.0;
    }

    pub fn playback_info(&self) -> PlaybackInfo {
        let in_playlist = self.state() == PlaybackState::PlayingInPlaylist;
        PlaybackInfo {
            state: self.state(),
            track: self.session.track().cloned(),
            progress_seconds: self.session.current_time_seconds,
            duration_seconds: self.session.duration_seconds,
            is_playing: self.session.is_playing,
            is_seeking: self.session.is_seeking,
            playlist_id: self.cursor.driving_playlist_id(),
            playlist_index: in_playlist.then(|| self.cursor.index()),
            playlist_len: self.cursor.len(),
        }
    }

    // ========================================================================
    // Progress task
    // ========================================================================

    pub fn replace_progress_task(&mut self, handle: AbortHandle) {
        self.cancel_progress_task();
        self.progress_task = Some(handle);
    }

    pub fn cancel_progress_task(&mut self) {
        if let Some(handle) = self.progress_task.take() {
            handle.abort();
            tracing::trace!("Progress poller cancelled");
        }
    }

    pub fn has_progress_task(&self) -> bool {
        self.progress_task.is_some()
    }

    // ========================================================================
    // Views & Notices
    // ========================================================================

    pub fn viewed_playlist(&self) -> Option<&Playlist> {
        self.viewed_playlist.as_ref()
    }

    pub fn viewed_playlist_id(&self) -> Option<i64> {
        self.viewed_playlist.as_ref().map(|p| p.id)
    }

    pub fn set_viewed_playlist(&mut self, playlist: Option<Playlist>) {
        self.viewed_playlist = playlist;
    }

    pub fn search_results(&self) -> &[SearchTrack] {
        &self.search_results
    }

    pub fn set_search_results(&mut self, results: Vec<SearchTrack>) {
        self.search_results = results;
    }

    pub fn set_favorite_flag(&mut self, track_id: &str, favorite: bool) {
        for result in self.search_results.iter_mut().filter(|r| r.track.id == track_id) {
            result.favorite = favorite;
        }
    }

    pub fn set_notice(&mut self, notice: Notice) {
        tracing::debug!(level = ?notice.level, message = %notice.message, "Notice");
        self.notice = Some(notice);
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn auto_clear_old_notice(&mut self) {
        if self.notice.as_ref().is_some_and(|n| n.at.elapsed() >= NOTICE_TTL) {
            self.notice = None;
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn set_should_quit(&mut self, quit: bool) {
        self.should_quit = quit;
    }
}
