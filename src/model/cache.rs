//! In-memory mirror of favorite ids for flagging search results without a store round-trip

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::LibraryResult;
use super::store::LibraryStore;

#[derive(Clone)]
pub struct FavoritesCache {
    favorite_ids: Arc<RwLock<HashSet<String>>>,
    loaded: Arc<RwLock<bool>>,
}

impl FavoritesCache {
    pub fn new() -> Self {
        Self {
            favorite_ids: Arc::new(RwLock::new(HashSet::new())),
            loaded: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn load_from_store(&self, store: &LibraryStore) -> LibraryResult<()> {
        let ids = store.favorite_ids().await?;
        tracing::debug!(count = ids.len(), "Favorites cache loaded");
        self.update(ids).await;
        Ok(())
    }

    pub async fn update(&self, track_ids: Vec<String>) {
        let mut favorite_ids = self.favorite_ids.write().await;
        *favorite_ids = track_ids.into_iter().collect();
        let mut loaded = self.loaded.write().await;
        *loaded = true;
    }

    pub async fn is_loaded(&self) -> bool {
        *self.loaded.read().await
    }

    pub async fn is_favorite(&self, track_id: &str) -> bool {
        let favorite_ids = self.favorite_ids.read().await;
        favorite_ids.contains(track_id)
    }

    pub async fn add(&self, track_id: String) {
        let mut favorite_ids = self.favorite_ids.write().await;
        favorite_ids.insert(track_id);
    }

    pub async fn remove(&self, track_id: &str) {
        let mut favorite_ids = self.favorite_ids.write().await;
        favorite_ids.remove(track_id);
    }

    pub async fn clear(&self) {
        self.favorite_ids.write().await.clear();
    }
}

impl Default for FavoritesCache {
    fn default() -> Self {
        Self::new()
    }
}
