//! Playback-related types and state management

use super::types::{PlaybackState, Track};

/// The single slot describing what is loaded in the transport.
///
/// Progress written by the periodic poll is ignored while `is_seeking` is
/// latched, so a manual scrub always wins over a poll landing at the same time.
#[derive(Clone, Debug, Default)]
pub struct PlaybackSession {
    track: Option<Track>,
    pub is_playing: bool,
    pub duration_seconds: f64,
    pub current_time_seconds: f64,
    pub is_seeking: bool,
}

impl PlaybackSession {
    pub fn start(&mut self, track: Track) {
        self.track = Some(track);
        self.current_time_seconds = 0.0;
        self.duration_seconds = 0.0;
        self.is_playing = true;
        self.is_seeking = false;
    }

    pub fn stop(&mut self) {
        *self = Self::default();
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track.as_ref().map(|t| t.id.as_str())
    }

    pub fn title(&self) -> &str {
        self.track.as_ref().map(|t| t.title.as_str()).unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.track.is_some()
    }

    /// Apply a polled position. Returns `false` when the seek latch swallowed it.
    pub fn update_progress(&mut self, current: f64, duration: f64) -> bool {
        if self.is_seeking || self.track.is_none() {
            return false;
        }
        self.current_time_seconds = current.max(0.0);
        if duration > 0.0 {
            self.duration_seconds = duration;
        }
        true
    }

    pub fn set_seeking(&mut self, seeking: bool) {
        self.is_seeking = seeking;
    }

    /// Position chosen by the user; bypasses the seek latch.
    pub fn seek_to(&mut self, seconds: f64) {
        let upper = if self.duration_seconds > 0.0 { self.duration_seconds } else { f64::MAX };
        self.current_time_seconds = seconds.clamp(0.0, upper);
    }

    pub fn set_playing(&mut self, is_playing: bool) {
        self.is_playing = is_playing;
    }

    pub fn set_duration(&mut self, duration: f64) {
        if duration > 0.0 {
            self.duration_seconds = duration;
        }
    }
}

/// Complete playback information for presenting the player
#[derive(Clone, Debug)]
pub struct PlaybackInfo {
    pub state: PlaybackState,
    pub track: Option<Track>,
    pub progress_seconds: f64,
    pub duration_seconds: f64,
    pub is_playing: bool,
    pub is_seeking: bool,
    pub playlist_id: Option<i64>,
    pub playlist_index: Option<usize>,
    pub playlist_len: usize,
}

impl Default for PlaybackInfo {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            track: None,
            progress_seconds: 0.0,
            duration_seconds: 0.0,
            is_playing: false,
            is_seeking: false,
            playlist_id: None,
            playlist_index: None,
            playlist_len: 0,
        }
    }
}

impl PlaybackInfo {
    pub fn progress_label(&self) -> String {
        format!(
            "{} / {}",
            format_seconds(self.progress_seconds),
            format_seconds(self.duration_seconds)
        )
    }
}

pub fn format_seconds(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
