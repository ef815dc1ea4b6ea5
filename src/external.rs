//! Contracts for the external collaborators: catalog search and remote sync

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Playlist, Track};

/// Free-text search over the remote video catalog.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>>;
}

/// Point-in-time copy of the collections handed to a remote mirror
#[derive(Clone, Debug, Serialize)]
pub struct LibrarySnapshot {
    pub taken_at: DateTime<Utc>,
    pub favorites: Vec<Track>,
    pub playlists: Vec<Playlist>,
}

/// Best-effort mirror of the local library to a remote account.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    async fn push(&self, snapshot: &LibrarySnapshot) -> Result<()>;
}

/// Mirrors the library into a JSON document on disk.
pub struct JsonFileSync {
    path: PathBuf,
}

impl JsonFileSync {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RemoteSync for JsonFileSync {
    async fn push(&self, snapshot: &LibrarySnapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        tracing::info!(
            path = %self.path.display(),
            favorites = snapshot.favorites.len(),
            playlists = snapshot.playlists.len(),
            "Library mirrored"
        );
        Ok(())
    }
}
