//! Controller module - the sequencing engine
//!
//! All user commands and transport callbacks funnel through [`AppController`],
//! which holds the model lock for the whole of a transition (store awaits
//! included), so two transitions never interleave on the same session.
//!
//! - `input`: Command-shell parsing and dispatch
//! - `playback`: Playback transitions (play, next, previous, seek, close)
//! - `library`: Favorites, history and playlist commands with their side effects
//! - `player_events`: Transport event listener
//! - `progress`: Periodic progress poller

mod input;
mod playback;
mod library;
mod player_events;
mod progress;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::{ErrorKind, LibraryError};
use crate::external::{CatalogSearch, RemoteSync};
use crate::model::{AppModel, FavoritesCache, LibraryStore, Notice};
use crate::transport::Transport;

const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<Mutex<AppModel>>,
    pub(crate) store: LibraryStore,
    pub(crate) favorites: FavoritesCache,
    pub(crate) transport: Arc<dyn Transport>,
    catalog: Option<Arc<dyn CatalogSearch>>,
    remote_sync: Option<Arc<dyn RemoteSync>>,
    progress_interval: Duration,
}

impl AppController {
    pub fn new(model: Arc<Mutex<AppModel>>, store: LibraryStore, transport: Arc<dyn Transport>) -> Self {
        Self {
            model,
            store,
            favorites: FavoritesCache::new(),
            transport,
            catalog: None,
            remote_sync: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogSearch>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_remote_sync(mut self, remote_sync: Arc<dyn RemoteSync>) -> Self {
        self.remote_sync = Some(remote_sync);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub async fn load_favorites_cache(&self) {
        if let Err(e) = self.favorites.load_from_store(&self.store).await {
            tracing::warn!(error = %e, "Could not load favorites cache");
        }
    }

    pub(crate) fn format_error(error: &LibraryError) -> String {
        match error {
            LibraryError::Validation(msg) => msg.clone(),
            LibraryError::NotFound(what) => format!("{} no longer exists.", what),
            LibraryError::Storage(_) | LibraryError::StorageTask(_) => {
                "Could not save your library. Please try again.".to_string()
            }
            LibraryError::Transport(e) => format!("Player error: {}. Playback stopped.", e),
        }
    }

    /// Surface a failure once to the user-facing layer.
    pub(crate) fn report(model: &mut AppModel, error: &LibraryError) {
        tracing::error!(error = %error, kind = ?error.kind(), "Command failed");
        let message = Self::format_error(error);
        let notice = match error.kind() {
            ErrorKind::Validation | ErrorKind::NotFound => Notice::warning(message),
            ErrorKind::Storage | ErrorKind::Transport => Notice::error(message),
        };
        model.set_notice(notice);
    }
}
