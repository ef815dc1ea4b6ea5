//! Playback transitions

use crate::error::{ErrorKind, LibraryError, LibraryResult};
use crate::model::{AppModel, Notice, PlaybackInfo, PlaybackState, PlaylistCursor, Track};
use crate::transport::LoadOptions;

use super::AppController;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Next,
    Previous,
}

impl AppController {
    pub async fn playback_info(&self) -> PlaybackInfo {
        self.model.lock().await.playback_info()
    }

    /// Play a single track outside of any playlist traversal.
    pub async fn play_track(&self, track: Track) -> LibraryResult<()> {
        let mut model = self.model.lock().await;
        tracing::debug!(track_id = %track.id, "Playing standalone track");

        self.record_and_load(&mut model, &track).await?;
        model.set_notice(Notice::info(format!("Playing: {}", track.title)));
        model.load_standalone(track);
        Ok(())
    }

    /// Start the playlist from its first item.
    pub async fn play_playlist(&self, playlist_id: i64) -> LibraryResult<()> {
        let mut model = self.model.lock().await;

        let playlist = match self.store.get_playlist(playlist_id).await {
            Ok(playlist) => playlist,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(playlist_id, "Playlist missing, nothing to play");
                self.close_locked(&mut model);
                model.set_notice(Notice::warning("The playlist is empty or does not exist."));
                return Err(e);
            }
            Err(e) => {
                Self::report(&mut model, &e);
                return Err(e);
            }
        };

        let name = playlist.name.clone();
        let Some(cursor) = PlaylistCursor::begin(playlist_id, playlist.videos) else {
            tracing::info!(playlist_id, "Playlist empty, nothing to play");
            self.close_locked(&mut model);
            model.set_notice(Notice::warning("The playlist is empty or does not exist."));
            return Err(LibraryError::Validation(format!("Playlist {} is empty", playlist_id)));
        };

        let first = cursor.current().cloned().ok_or_else(|| LibraryError::playlist_not_found(playlist_id))?;
        self.record_and_load(&mut model, &first).await?;
        model.load_playlist(cursor);
        tracing::info!(playlist_id, track_id = %first.id, "Playlist playback started");
        model.set_notice(Notice::success(format!("Playing playlist: {}", name)));
        Ok(())
    }

    pub async fn next(&self) -> LibraryResult<()> {
        let mut model = self.model.lock().await;
        self.step_locked(&mut model, Direction::Next).await
    }

    pub async fn previous(&self) -> LibraryResult<()> {
        let mut model = self.model.lock().await;
        self.step_locked(&mut model, Direction::Previous).await
    }

    pub async fn close(&self) {
        let mut model = self.model.lock().await;
        self.close_locked(&mut model);
    }

    pub async fn toggle_playback(&self) -> LibraryResult<()> {
        let mut model = self.model.lock().await;
        if model.state() == PlaybackState::Idle {
            return Ok(());
        }

        let is_playing = model.session().is_playing;
        tracing::debug!(is_playing, "Toggling playback");
        let result = if is_playing {
            self.transport.pause()
        } else {
            self.transport.play()
        };

        match result {
            Ok(()) => {
                if is_playing {
                    model.cancel_progress_task();
                }
                model.set_playing(!is_playing);
                tracing::info!(action = if is_playing { "paused" } else { "resumed" }, "Playback toggled");
                Ok(())
            }
            Err(e) => Err(self.transport_failed(&mut model, e.into())),
        }
    }

    /// Jump to `seconds`, holding the seek latch so the poller cannot overwrite it.
    pub async fn seek(&self, seconds: f64) -> LibraryResult<()> {
        let mut model = self.model.lock().await;
        if model.state() == PlaybackState::Idle {
            return Ok(());
        }

        model.set_seeking(true);
        let result = self.transport.seek(seconds);
        model.set_seeking(false);

        match result {
            Ok(()) => {
                model.seek_to(seconds);
                tracing::debug!(seconds, "Seeked");
                Ok(())
            }
            Err(e) => Err(self.transport_failed(&mut model, e.into())),
        }
    }

    /// Latch the session while the user drags the scrubber.
    pub async fn begin_seek(&self) {
        let mut model = self.model.lock().await;
        if model.state() != PlaybackState::Idle {
            model.set_seeking(true);
        }
    }

    /// Release the scrub latch, committing the final position.
    pub async fn end_seek(&self, seconds: f64) -> LibraryResult<()> {
        let mut model = self.model.lock().await;
        if model.state() == PlaybackState::Idle {
            model.set_seeking(false);
            return Ok(());
        }

        let result = self.transport.seek(seconds);
        model.set_seeking(false);
        match result {
            Ok(()) => {
                model.seek_to(seconds);
                Ok(())
            }
            Err(e) => Err(self.transport_failed(&mut model, e.into())),
        }
    }

    // ========================================================================
    // Transition building blocks (caller holds the model lock)
    // ========================================================================

    pub(crate) async fn step_locked(&self, model: &mut AppModel, direction: Direction) -> LibraryResult<()> {
        let step = match direction {
            Direction::Next => model.cursor().peek_next(),
            Direction::Previous => model.cursor().peek_previous(),
        };

        let Some(step) = step else {
            tracing::debug!(?direction, "No driving playlist, closing player");
            self.close_locked(model);
            return Ok(());
        };

        self.record_and_load(model, &step.track).await?;
        model.load_index(step.index);
        tracing::info!(?direction, index = step.index, track_id = %step.track.id, wrapped = step.wrapped, "Playlist step");

        let notice = match (direction, step.wrapped) {
            (Direction::Next, true) => Notice::info("Playlist finished, restarting from the beginning."),
            (Direction::Previous, true) => Notice::info("Start of playlist reached, jumping to the last item."),
            _ => Notice::info(format!("Playing: {}", step.track.title)),
        };
        model.set_notice(notice);
        Ok(())
    }

    /// Log the play and hand the track to the transport.
    ///
    /// The history write comes first so that a storage failure leaves the
    /// session untouched; a transport failure closes the player.
    pub(crate) async fn record_and_load(&self, model: &mut AppModel, track: &Track) -> LibraryResult<()> {
        let recorded = self.store.add_history_entry(track.clone()).await;
        crate::log_store_result!("add_history_entry", recorded);
        if let Err(e) = recorded {
            Self::report(model, &e);
            return Err(e);
        }

        model.cancel_progress_task();
        match self.transport.load(&track.id, &LoadOptions::default()) {
            Ok(load) => {
                model.set_current_load(load);
                Ok(())
            }
            Err(e) => Err(self.transport_failed(model, e.into())),
        }
    }

    pub(crate) fn close_locked(&self, model: &mut AppModel) {
        let was_loaded = model.state() != PlaybackState::Idle;
        if let Err(e) = self.transport.stop() {
            tracing::warn!(error = %e, "Transport stop failed while closing");
        }
        model.end_session();
        if was_loaded {
            tracing::info!("Player closed");
            model.set_notice(Notice::info("Playback ended."));
        }
    }

    /// A failing widget is treated as an implicit close so the player never gets stuck.
    pub(crate) fn transport_failed(&self, model: &mut AppModel, error: LibraryError) -> LibraryError {
        self.close_locked(model);
        Self::report(model, &error);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{track, Harness, TransportCall};
    use crate::error::ErrorKind;
    use crate::model::PlaybackState;

    #[tokio::test]
    async fn play_track_logs_history_every_time() {
        let h = Harness::new();
        h.controller.play_track(track("a")).await.unwrap();
        h.controller.play_track(track("a")).await.unwrap();

        assert_eq!(h.store.list_history().await.unwrap().len(), 2);
        assert_eq!(h.transport.loaded_ids(), vec!["a", "a"]);
        let info = h.controller.playback_info().await;
        assert_eq!(info.state, PlaybackState::PlayingStandalone);
        assert!(info.is_playing);
    }

    #[tokio::test]
    async fn road_trip_wraps_to_first_track() {
        let h = Harness::new();
        let id = h.playlist("Road Trip", &["a", "b", "c"]).await;

        h.controller.play_playlist(id).await.unwrap();
        assert_eq!((h.playing().await.as_deref(), h.index().await), (Some("a"), 0));

        h.controller.next().await.unwrap();
        assert_eq!((h.playing().await.as_deref(), h.index().await), (Some("b"), 1));

        h.controller.next().await.unwrap();
        assert_eq!((h.playing().await.as_deref(), h.index().await), (Some("c"), 2));

        h.controller.next().await.unwrap();
        assert_eq!((h.playing().await.as_deref(), h.index().await), (Some("a"), 0));
        assert!(h.notice().await.contains("restarting"));
    }

    #[tokio::test]
    async fn previous_at_start_wraps_to_last() {
        let h = Harness::new();
        let id = h.playlist("Mix", &["a", "b", "c"]).await;
        h.controller.play_playlist(id).await.unwrap();

        h.controller.previous().await.unwrap();
        assert_eq!((h.playing().await.as_deref(), h.index().await), (Some("c"), 2));

        h.controller.previous().await.unwrap();
        assert_eq!((h.playing().await.as_deref(), h.index().await), (Some("b"), 1));
    }

    #[tokio::test]
    async fn next_and_previous_outside_playlist_close() {
        let h = Harness::new();
        h.controller.play_track(track("a")).await.unwrap();
        h.controller.next().await.unwrap();
        assert_eq!(h.controller.playback_info().await.state, PlaybackState::Idle);

        h.controller.play_track(track("b")).await.unwrap();
        h.controller.previous().await.unwrap();
        assert_eq!(h.controller.playback_info().await.state, PlaybackState::Idle);
        assert_eq!(h.transport.calls().last(), Some(&TransportCall::Stop));
    }

    #[tokio::test]
    async fn playing_standalone_clears_the_cursor() {
        let h = Harness::new();
        let id = h.playlist("Mix", &["a", "b"]).await;
        h.controller.play_playlist(id).await.unwrap();
        h.controller.play_track(track("z")).await.unwrap();

        let info = h.controller.playback_info().await;
        assert_eq!(info.state, PlaybackState::PlayingStandalone);
        assert_eq!(info.playlist_id, None);
        assert!(h.snapshot_ids().await.is_empty());
        assert_eq!(h.index().await, 0);
    }

    #[tokio::test]
    async fn empty_or_missing_playlist_goes_idle() {
        let h = Harness::new();
        let empty = h.playlist("Empty", &[]).await;
        h.controller.play_track(track("a")).await.unwrap();

        let err = h.controller.play_playlist(empty).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(h.controller.playback_info().await.state, PlaybackState::Idle);
        assert!(h.notice().await.contains("empty or does not exist"));

        h.controller.play_track(track("b")).await.unwrap();
        let err = h.controller.play_playlist(999).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(h.controller.playback_info().await.state, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn transport_load_failure_closes_player() {
        let h = Harness::new();
        h.controller.play_track(track("a")).await.unwrap();
        h.transport.set_fail_load(true);

        let err = h.controller.play_track(track("b")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(h.controller.playback_info().await.state, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn storage_failure_leaves_session_untouched() {
        let h = Harness::new();
        let id = h.playlist("Mix", &["a", "b"]).await;
        h.controller.play_playlist(id).await.unwrap();
        h.store.drop_table("history").await.unwrap();

        let err = h.controller.next().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!((h.playing().await.as_deref(), h.index().await), (Some("a"), 0));
        assert_eq!(h.transport.loaded_ids(), vec!["a"]);
        assert!(h.notice().await.contains("Could not save"));
    }

    #[tokio::test]
    async fn toggle_pauses_and_resumes() {
        let h = Harness::new();
        h.controller.toggle_playback().await.unwrap();
        assert!(h.transport.calls().is_empty());

        h.controller.play_track(track("a")).await.unwrap();
        h.controller.toggle_playback().await.unwrap();
        assert!(!h.controller.playback_info().await.is_playing);
        h.controller.toggle_playback().await.unwrap();
        assert!(h.controller.playback_info().await.is_playing);

        let calls = h.transport.calls();
        assert_eq!(&calls[calls.len() - 2..], &[TransportCall::Pause, TransportCall::Play]);
    }

    #[tokio::test]
    async fn seek_moves_position_and_releases_latch() {
        let h = Harness::new();
        h.controller.play_track(track("a")).await.unwrap();
        h.controller.seek(42.0).await.unwrap();

        let info = h.controller.playback_info().await;
        assert_eq!(info.progress_seconds, 42.0);
        assert!(!info.is_seeking);
        assert_eq!(h.transport.calls().last(), Some(&TransportCall::Seek(42.0)));
    }

    #[tokio::test]
    async fn scrub_latch_holds_until_end_seek() {
        let h = Harness::new();
        h.controller.play_track(track("a")).await.unwrap();

        h.controller.begin_seek().await;
        assert!(h.controller.playback_info().await.is_seeking);

        h.controller.end_seek(10.0).await.unwrap();
        let info = h.controller.playback_info().await;
        assert!(!info.is_seeking);
        assert_eq!(info.progress_seconds, 10.0);
    }

    #[tokio::test]
    async fn close_resets_to_idle() {
        let h = Harness::new();
        let id = h.playlist("Mix", &["a", "b"]).await;
        h.controller.play_playlist(id).await.unwrap();
        h.controller.next().await.unwrap();

        h.controller.close().await;
        let info = h.controller.playback_info().await;
        assert_eq!(info.state, PlaybackState::Idle);
        assert_eq!(info.track, None);
        assert_eq!(info.playlist_id, None);
        assert_eq!(h.index().await, 0);
        assert!(h.snapshot_ids().await.is_empty());
    }
}
