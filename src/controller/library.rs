//! Favorites, history and playlist commands, with their effects on the playing session

use chrono::Utc;
use futures::future::try_join_all;
use tokio::task::JoinHandle;

use crate::error::{ErrorKind, LibraryError, LibraryResult};
use crate::external::LibrarySnapshot;
use crate::model::{
    AppModel, FavoriteEntry, HistoryEntry, Notice, Playlist, PlaylistSummary, SearchTrack, Track,
};

use super::AppController;

pub const SEARCH_LIMIT: usize = 20;

impl AppController {
    // ========================================================================
    // Favorites & History
    // ========================================================================

    /// Flip the favorite flag of `track`. Returns the new state.
    pub async fn toggle_favorite(&self, track: Track) -> LibraryResult<bool> {
        let mut model = self.model.lock().await;

        let result: LibraryResult<bool> = async {
            if self.store.is_favorite(&track.id).await? {
                self.store.remove_favorite(&track.id).await?;
                Ok(false)
            } else {
                self.store.add_favorite(track.clone()).await?;
                Ok(true)
            }
        }
        .await;

        match result {
            Ok(favorite) => {
                if favorite {
                    self.favorites.add(track.id.clone()).await;
                    model.set_notice(Notice::success(format!("{} added to favorites!", track.title)));
                } else {
                    self.favorites.remove(&track.id).await;
                    model.set_notice(Notice::info(format!("{} removed from favorites.", track.title)));
                }
                model.set_favorite_flag(&track.id, favorite);
                tracing::info!(track_id = %track.id, favorite, "Favorite toggled");
                Ok(favorite)
            }
            Err(e) => {
                Self::report(&mut model, &e);
                Err(e)
            }
        }
    }

    pub async fn is_favorite(&self, track_id: &str) -> LibraryResult<bool> {
        let _model = self.model.lock().await;
        self.store.is_favorite(track_id).await
    }

    pub async fn list_favorites(&self) -> LibraryResult<Vec<FavoriteEntry>> {
        let mut model = self.model.lock().await;
        self.store
            .list_favorites()
            .await
            .inspect_err(|e| Self::report(&mut model, e))
    }

    pub async fn clear_favorites(&self) -> LibraryResult<usize> {
        let mut model = self.model.lock().await;
        match self.store.clear_favorites().await {
            Ok(removed) => {
                self.favorites.clear().await;
                let ids: Vec<String> = model.search_results().iter().map(|r| r.track.id.clone()).collect();
                for id in ids {
                    model.set_favorite_flag(&id, false);
                }
                model.set_notice(Notice::info(format!("Removed {} favorites.", removed)));
                Ok(removed)
            }
            Err(e) => {
                Self::report(&mut model, &e);
                Err(e)
            }
        }
    }

    pub async fn list_history(&self) -> LibraryResult<Vec<HistoryEntry>> {
        let mut model = self.model.lock().await;
        self.store
            .list_history()
            .await
            .inspect_err(|e| Self::report(&mut model, e))
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    pub async fn create_playlist(&self, name: &str) -> LibraryResult<Playlist> {
        let mut model = self.model.lock().await;
        match self.store.create_playlist(name).await {
            Ok(playlist) => {
                tracing::info!(playlist_id = playlist.id, name = %playlist.name, "Playlist created");
                model.set_notice(Notice::success(format!(
                    "Playlist \"{}\" created.",
                    playlist.name
                )));
                Ok(playlist)
            }
            Err(e) => {
                Self::report(&mut model, &e);
                Err(e)
            }
        }
    }

    pub async fn list_playlists(&self) -> LibraryResult<Vec<PlaylistSummary>> {
        let mut model = self.model.lock().await;
        self.store
            .list_playlists()
            .await
            .inspect_err(|e| Self::report(&mut model, e))
    }

    /// Open a playlist in the detail view.
    pub async fn view_playlist(&self, playlist_id: i64) -> LibraryResult<Playlist> {
        let mut model = self.model.lock().await;
        match self.store.get_playlist(playlist_id).await {
            Ok(playlist) => {
                model.set_viewed_playlist(Some(playlist.clone()));
                Ok(playlist)
            }
            Err(e) => {
                self.forget_playlist(&mut model, playlist_id, &e);
                Self::report(&mut model, &e);
                Err(e)
            }
        }
    }

    /// Append `track`. Returns `false` when it was already in the playlist.
    pub async fn add_video_to_playlist(&self, playlist_id: i64, track: Track) -> LibraryResult<bool> {
        let mut model = self.model.lock().await;

        let added = match self.store.add_video_to_playlist(playlist_id, track.clone()).await {
            Ok(added) => added,
            Err(e) => {
                self.forget_playlist(&mut model, playlist_id, &e);
                Self::report(&mut model, &e);
                return Err(e);
            }
        };

        if !added {
            tracing::debug!(playlist_id, track_id = %track.id, "Track already in playlist");
            model.set_notice(Notice::info(format!("{} is already in the playlist.", track.title)));
            return Ok(false);
        }

        tracing::info!(playlist_id, track_id = %track.id, "Track added to playlist");
        model.set_notice(Notice::success(format!("{} added to the playlist!", track.title)));

        let affects_view = model.viewed_playlist_id() == Some(playlist_id);
        let affects_cursor = model.cursor().is_driving(playlist_id);
        if affects_view || affects_cursor {
            let updated = self.refetch(&mut model, playlist_id).await?;
            // Appends only extend the tail, so the index stays put
            if affects_cursor {
                model.refresh_snapshot(updated.videos.clone());
            }
            if affects_view {
                model.set_viewed_playlist(Some(updated));
            }
        }
        Ok(true)
    }

    /// Remove `track_id` and reconcile the cursor if this playlist is driving playback.
    pub async fn remove_video_from_playlist(&self, playlist_id: i64, track_id: &str) -> LibraryResult<()> {
        let mut model = self.model.lock().await;

        if let Err(e) = self.store.remove_video_from_playlist(playlist_id, track_id).await {
            self.forget_playlist(&mut model, playlist_id, &e);
            Self::report(&mut model, &e);
            return Err(e);
        }
        tracing::info!(playlist_id, track_id, "Track removed from playlist");
        model.set_notice(Notice::info("Video removed from the playlist."));

        let affects_view = model.viewed_playlist_id() == Some(playlist_id);
        let affects_cursor = model.cursor().is_driving(playlist_id);
        if !affects_view && !affects_cursor {
            return Ok(());
        }

        let updated = self.refetch(&mut model, playlist_id).await?;
        if affects_view {
            model.set_viewed_playlist(Some(updated.clone()));
        }
        if affects_cursor {
            self.reconcile_after_removal(&mut model, updated, track_id).await?;
        }
        Ok(())
    }

    async fn reconcile_after_removal(
        &self,
        model: &mut AppModel,
        updated: Playlist,
        removed_id: &str,
    ) -> LibraryResult<()> {
        let previous_index = model.cursor().index();
        let playing_id = model.playing_track_id().map(str::to_string);

        if playing_id.as_deref() != Some(removed_id) {
            model.refresh_snapshot(updated.videos.clone());
            // Another entry went away; keep pointing at what is actually playing
            if let Some(position) = playing_id.as_deref().and_then(|id| updated.position_of(id)) {
                model.set_cursor_index(position);
            }
            return Ok(());
        }

        if updated.videos.is_empty() {
            tracing::info!(playlist_id = updated.id, "Driving playlist emptied, closing player");
            self.close_locked(model);
            return Ok(());
        }

        // Guards a stale read where the removal has not landed yet
        if let Some(position) = updated.position_of(removed_id) {
            model.refresh_snapshot(updated.videos.clone());
            model.set_cursor_index(position);
            return Ok(());
        }

        let index = previous_index.min(updated.videos.len() - 1);
        let track = updated.videos[index].clone();
        tracing::info!(index, track_id = %track.id, "Playing track removed, moving to the same slot");

        // Cursor and session only move once the new track is recorded and loaded
        self.record_and_load(model, &track).await?;
        model.refresh_snapshot(updated.videos);
        model.load_index(index);
        model.set_notice(Notice::info(format!("Playing: {}", track.title)));
        Ok(())
    }

    pub async fn delete_playlist(&self, playlist_id: i64) -> LibraryResult<()> {
        let mut model = self.model.lock().await;

        match self.store.delete_playlist(playlist_id).await {
            Ok(existed) => {
                tracing::info!(playlist_id, existed, "Playlist deleted");
                if model.viewed_playlist_id() == Some(playlist_id) {
                    model.set_viewed_playlist(None);
                }
                if model.cursor().is_driving(playlist_id) {
                    self.close_locked(&mut model);
                }
                model.set_notice(Notice::success("Playlist deleted."));
                Ok(())
            }
            Err(e) => {
                Self::report(&mut model, &e);
                Err(e)
            }
        }
    }

    /// Re-read a playlist after a mutation; a vanished playlist resets whatever pointed at it.
    async fn refetch(&self, model: &mut AppModel, playlist_id: i64) -> LibraryResult<Playlist> {
        match self.store.get_playlist(playlist_id).await {
            Ok(playlist) => Ok(playlist),
            Err(e) => {
                self.forget_playlist(model, playlist_id, &e);
                Self::report(model, &e);
                Err(e)
            }
        }
    }

    fn forget_playlist(&self, model: &mut AppModel, playlist_id: i64, error: &LibraryError) {
        if error.kind() != ErrorKind::NotFound {
            return;
        }
        if model.viewed_playlist_id() == Some(playlist_id) {
            model.set_viewed_playlist(None);
        }
        if model.cursor().is_driving(playlist_id) {
            tracing::warn!(playlist_id, "Driving playlist vanished, closing player");
            self.close_locked(model);
        }
    }

    // ========================================================================
    // External collaborators
    // ========================================================================

    pub async fn search(&self, query: &str) -> anyhow::Result<usize> {
        let query = query.trim();
        if query.is_empty() {
            let mut model = self.model.lock().await;
            model.set_notice(Notice::warning("Enter a search term."));
            anyhow::bail!("empty search query");
        }

        let Some(catalog) = self.catalog.clone() else {
            let mut model = self.model.lock().await;
            model.set_notice(Notice::warning("Catalog search is not available."));
            anyhow::bail!("no catalog configured");
        };

        tracing::debug!(query, "Performing search");
        match catalog.search(query, SEARCH_LIMIT).await {
            Ok(tracks) => {
                if !self.favorites.is_loaded().await {
                    self.load_favorites_cache().await;
                }
                let mut results = Vec::with_capacity(tracks.len());
                for track in tracks {
                    let favorite = self.favorites.is_favorite(&track.id).await;
                    results.push(SearchTrack { track, favorite });
                }
                let count = results.len();
                tracing::info!(query, count, "Search completed successfully");

                let mut model = self.model.lock().await;
                model.set_search_results(results);
                model.set_notice(Notice::success(format!("Found {} results for \"{}\".", count, query)));
                Ok(count)
            }
            Err(e) => {
                tracing::error!(query, error = %e, "Search failed");
                let mut model = self.model.lock().await;
                model.set_notice(Notice::error("Search failed. Please try again later."));
                Err(e)
            }
        }
    }

    pub async fn library_snapshot(&self) -> LibraryResult<LibrarySnapshot> {
        let favorites = self.store.list_favorites().await?;
        let summaries = self.store.list_playlists().await?;
        let playlists = try_join_all(summaries.iter().map(|s| self.store.get_playlist(s.id))).await?;

        Ok(LibrarySnapshot {
            taken_at: Utc::now(),
            favorites: favorites.into_iter().map(|f| f.track).collect(),
            playlists,
        })
    }

    /// Mirror favorites and playlists remotely in the background. Local state is never touched.
    pub async fn sync_library(&self) -> LibraryResult<Option<JoinHandle<()>>> {
        let Some(remote) = self.remote_sync.clone() else {
            let mut model = self.model.lock().await;
            model.set_notice(Notice::warning("Remote sync is not configured."));
            return Ok(None);
        };

        let snapshot = match self.library_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let mut model = self.model.lock().await;
                Self::report(&mut model, &e);
                return Err(e);
            }
        };

        let model = self.model.clone();
        let handle = tokio::spawn(async move {
            let notice = match remote.push(&snapshot).await {
                Ok(()) => Notice::success("Sync completed!"),
                Err(e) => {
                    tracing::error!(error = %e, "Remote sync failed");
                    Notice::error("Sync failed.")
                }
            };
            model.lock().await.set_notice(notice);
        });
        Ok(Some(handle))
    }
}
