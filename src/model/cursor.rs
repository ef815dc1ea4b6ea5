//! Position pointer within the snapshot of the driving playlist

use super::types::Track;

/// Which playlist drives sequential playback, and where we are in it.
///
/// With no driving playlist the snapshot is empty and the index is 0. With a
/// non-empty snapshot the index is always in bounds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaylistCursor {
    driving_playlist_id: Option<i64>,
    snapshot_videos: Vec<Track>,
    index: usize,
}

/// Outcome of a step through the snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub index: usize,
    pub track: Track,
    pub wrapped: bool,
}

impl PlaylistCursor {
    /// Start driving `playlist_id` at index 0. Returns `None` and stays reset for an empty playlist.
    pub fn begin(playlist_id: i64, videos: Vec<Track>) -> Option<Self> {
        if videos.is_empty() {
            return None;
        }
        Some(Self {
            driving_playlist_id: Some(playlist_id),
            snapshot_videos: videos,
            index: 0,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn driving_playlist_id(&self) -> Option<i64> {
        self.driving_playlist_id
    }

    pub fn is_driving(&self, playlist_id: i64) -> bool {
        self.driving_playlist_id == Some(playlist_id)
    }

    pub fn is_active(&self) -> bool {
        self.driving_playlist_id.is_some() && !self.snapshot_videos.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.snapshot_videos.len()
    }

    pub fn snapshot(&self) -> &[Track] {
        &self.snapshot_videos
    }

    pub fn current(&self) -> Option<&Track> {
        self.snapshot_videos.get(self.index)
    }

    /// Where `next()` would land, wrapping to the start past the last item.
    pub fn peek_next(&self) -> Option<Step> {
        if !self.is_active() {
            return None;
        }
        let (index, wrapped) = if self.index + 1 < self.len() {
            (self.index + 1, false)
        } else {
            (0, true)
        };
        Some(self.step_to(index, wrapped))
    }

    /// Where `previous()` would land, wrapping to the end before the first item.
    pub fn peek_previous(&self) -> Option<Step> {
        if !self.is_active() {
            return None;
        }
        let (index, wrapped) = match self.index.checked_sub(1) {
            Some(index) => (index, false),
            None => (self.len() - 1, true),
        };
        Some(self.step_to(index, wrapped))
    }

    fn step_to(&self, index: usize, wrapped: bool) -> Step {
        Step {
            index,
            track: self.snapshot_videos[index].clone(),
            wrapped,
        }
    }

    pub fn set_index(&mut self, index: usize) {
        if self.snapshot_videos.is_empty() {
            self.index = 0;
        } else {
            self.index = index.min(self.snapshot_videos.len() - 1);
        }
    }

    /// Replace the snapshot after a structural change, keeping the index in bounds.
    pub fn refresh(&mut self, videos: Vec<Track>) {
        if self.driving_playlist_id.is_none() {
            return;
        }
        self.snapshot_videos = videos;
        let index = self.index;
        self.set_index(index);
    }
}
