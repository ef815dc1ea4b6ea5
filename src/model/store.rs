//! SQLite-backed library store for favorites, play history and playlists.
//!
//! Every mutation runs inside a single transaction on a blocking worker, so a
//! concurrent reader never sees a half-applied add or remove.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{LibraryError, LibraryResult};
use super::types::{FavoriteEntry, HistoryEntry, Playlist, PlaylistSummary, Track};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS favorites (
        id TEXT PRIMARY KEY NOT NULL,
        title TEXT NOT NULL,
        channel_label TEXT NOT NULL,
        thumbnail_url TEXT NOT NULL,
        added_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id TEXT NOT NULL,
        title TEXT NOT NULL,
        channel_label TEXT NOT NULL,
        thumbnail_url TEXT NOT NULL,
        played_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS playlists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS playlist_videos (
        playlist_id INTEGER NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
        video_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        title TEXT NOT NULL,
        channel_label TEXT NOT NULL,
        thumbnail_url TEXT NOT NULL,
        PRIMARY KEY (playlist_id, video_id)
    );
    CREATE INDEX IF NOT EXISTS index_history_video ON history (video_id);
    CREATE INDEX IF NOT EXISTS index_playlist_videos_position ON playlist_videos (playlist_id, position);
";

/// Durable keyed storage for the three user collections
#[derive(Clone)]
pub struct LibraryStore {
    conn: Arc<Mutex<Connection>>,
    history_limit: Option<usize>,
}

impl LibraryStore {
    pub fn open<P: AsRef<Path>>(db_path: P, history_limit: Option<usize>) -> LibraryResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LibraryError::StorageTask(format!("cannot create {}: {}", parent.display(), e)))?;
            }
        }

        let conn = Connection::open(db_path)?;
        let store = Self::from_connection(conn, history_limit)?;
        tracing::info!(path = %db_path.display(), ?history_limit, "Library store opened");
        Ok(store)
    }

    pub fn open_in_memory(history_limit: Option<usize>) -> LibraryResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, history_limit)
    }

    fn from_connection(conn: Connection, history_limit: Option<usize>) -> LibraryResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            // A limit of zero means "keep everything"
            history_limit: history_limit.filter(|limit| *limit > 0),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> LibraryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> LibraryResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| LibraryError::StorageTask("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await?
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    /// Insert or refresh the favorite keyed by `track.id`.
    pub async fn add_favorite(&self, track: Track) -> LibraryResult<()> {
        let now = now_millis();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO favorites (id, title, channel_label, thumbnail_url, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    channel_label = excluded.channel_label,
                    thumbnail_url = excluded.thumbnail_url",
                params![track.id, track.title, track.channel_label, track.thumbnail_url, now],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn remove_favorite(&self, id: &str) -> LibraryResult<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM favorites WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    pub async fn is_favorite(&self, id: &str) -> LibraryResult<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let found = conn
                .query_row("SELECT 1 FROM favorites WHERE id = ?1", params![id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    /// Favorites in insertion order.
    pub async fn list_favorites(&self) -> LibraryResult<Vec<FavoriteEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, channel_label, thumbnail_url, added_at
                 FROM favorites ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(FavoriteEntry {
                    track: track_from_row(row, 0)?,
                    added_at: from_millis(row.get(4)?),
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    pub async fn favorite_ids(&self) -> LibraryResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM favorites")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    pub async fn clear_favorites(&self) -> LibraryResult<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM favorites", [])?))
            .await
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Append a play event, evicting the oldest entries beyond the retention limit.
    pub async fn add_history_entry(&self, track: Track) -> LibraryResult<HistoryEntry> {
        let now = now_millis();
        let limit = self.history_limit;
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO history (video_id, title, channel_label, thumbnail_url, played_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![track.id, track.title, track.channel_label, track.thumbnail_url, now],
            )?;
            let entry_id = tx.last_insert_rowid();

            if let Some(limit) = limit {
                let evicted = tx.execute(
                    "DELETE FROM history WHERE id NOT IN
                        (SELECT id FROM history ORDER BY id DESC LIMIT ?1)",
                    params![limit as i64],
                )?;
                if evicted > 0 {
                    tracing::debug!(evicted, limit, "History trimmed to retention limit");
                }
            }
            tx.commit()?;

            Ok(HistoryEntry {
                entry_id,
                track,
                played_at: from_millis(now),
            })
        })
        .await
    }

    /// Play history, most recent first.
    pub async fn list_history(&self) -> LibraryResult<Vec<HistoryEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT video_id, title, channel_label, thumbnail_url, played_at, id
                 FROM history ORDER BY id DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(HistoryEntry {
                    track: track_from_row(row, 0)?,
                    played_at: from_millis(row.get(4)?),
                    entry_id: row.get(5)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    pub async fn create_playlist(&self, name: &str) -> LibraryResult<Playlist> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(LibraryError::Validation(
                "Playlist name cannot be empty".to_string(),
            ));
        }

        let now = now_millis();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO playlists (name, created_at) VALUES (?1, ?2)",
                params![name, now],
            )?;
            Ok(Playlist {
                id: conn.last_insert_rowid(),
                name,
                videos: Vec::new(),
                created_at: from_millis(now),
            })
        })
        .await
    }

    pub async fn list_playlists(&self) -> LibraryResult<Vec<PlaylistSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name, p.created_at, COUNT(v.video_id)
                 FROM playlists p
                 LEFT JOIN playlist_videos v ON v.playlist_id = p.id
                 GROUP BY p.id
                 ORDER BY p.id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(PlaylistSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: from_millis(row.get(2)?),
                    video_count: row.get::<_, i64>(3)? as usize,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    pub async fn get_playlist(&self, id: i64) -> LibraryResult<Playlist> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let playlist = load_playlist(&tx, id)?;
            tx.commit()?;
            Ok(playlist)
        })
        .await
    }

    /// Append `track` unless it is already in the playlist. Returns whether it was added.
    pub async fn add_video_to_playlist(&self, playlist_id: i64, track: Track) -> LibraryResult<bool> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            ensure_playlist_exists(&tx, playlist_id)?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO playlist_videos
                    (playlist_id, video_id, position, title, channel_label, thumbnail_url)
                 VALUES (?1, ?2,
                    (SELECT COALESCE(MAX(position), -1) + 1 FROM playlist_videos WHERE playlist_id = ?1),
                    ?3, ?4, ?5)",
                params![playlist_id, track.id, track.title, track.channel_label, track.thumbnail_url],
            )?;
            tx.commit()?;
            Ok(inserted > 0)
        })
        .await
    }

    /// Remove `track_id` from the playlist. Returns whether an entry was removed.
    pub async fn remove_video_from_playlist(&self, playlist_id: i64, track_id: &str) -> LibraryResult<bool> {
        let track_id = track_id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            ensure_playlist_exists(&tx, playlist_id)?;
            let removed = tx.execute(
                "DELETE FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2",
                params![playlist_id, track_id],
            )?;
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
    }

    /// Delete a playlist and its entries. Returns whether it existed.
    pub async fn delete_playlist(&self, id: i64) -> LibraryResult<bool> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM playlist_videos WHERE playlist_id = ?1", params![id])?;
            let deleted = tx.execute("DELETE FROM playlists WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Simulates a broken database for failure-path tests.
    #[cfg(test)]
    pub(crate) async fn drop_table(&self, table: &'static str) -> LibraryResult<()> {
        self.with_conn(move |conn| {
            conn.execute_batch(&format!("DROP TABLE {table}"))?;
            Ok(())
        })
        .await
    }
}

fn ensure_playlist_exists(conn: &Connection, id: i64) -> LibraryResult<()> {
    conn.query_row("SELECT 1 FROM playlists WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?
        .ok_or_else(|| LibraryError::playlist_not_found(id))
}

fn load_playlist(conn: &Connection, id: i64) -> LibraryResult<Playlist> {
    let header = conn
        .query_row(
            "SELECT name, created_at FROM playlists WHERE id = ?1",
            params![id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;
    let (name, created_at) = header.ok_or_else(|| LibraryError::playlist_not_found(id))?;

    let mut stmt = conn.prepare(
        "SELECT video_id, title, channel_label, thumbnail_url
         FROM playlist_videos WHERE playlist_id = ?1 ORDER BY position ASC",
    )?;
    let videos = stmt
        .query_map(params![id], |row| track_from_row(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Playlist {
        id,
        name,
        videos,
        created_at: from_millis(created_at),
    })
}

fn track_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(offset)?,
        title: row.get(offset + 1)?,
        channel_label: row.get(offset + 2)?,
        thumbnail_url: row.get(offset + 3)?,
    })
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn store() -> LibraryStore {
        LibraryStore::open_in_memory(None).expect("in-memory store")
    }

    fn track(id: &str) -> Track {
        Track {
            channel_label: "Channel".to_string(),
            ..Track::new(id, format!("Title {id}"))
        }
    }

    #[tokio::test]
    async fn adding_a_favorite_twice_keeps_one_entry() {
        let store = store();
        store.add_favorite(track("a")).await.unwrap();
        store.add_favorite(track("a")).await.unwrap();

        let favorites = store.list_favorites().await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].track.id, "a");
        assert!(store.is_favorite("a").await.unwrap());
    }

    #[tokio::test]
    async fn removing_an_absent_favorite_is_a_no_op() {
        let store = store();
        store.remove_favorite("missing").await.unwrap();
        assert!(!store.is_favorite("missing").await.unwrap());
    }

    #[tokio::test]
    async fn favorites_keep_insertion_order_and_clear() {
        let store = store();
        for id in ["c", "a", "b"] {
            store.add_favorite(track(id)).await.unwrap();
        }
        store.add_favorite(track("c")).await.unwrap();

        let ids: Vec<_> = store
            .list_favorites()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.track.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        assert_eq!(store.clear_favorites().await.unwrap(), 3);
        assert!(store.list_favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_is_append_only_and_most_recent_first() {
        let store = store();
        store.add_history_entry(track("a")).await.unwrap();
        store.add_history_entry(track("b")).await.unwrap();
        store.add_history_entry(track("a")).await.unwrap();

        let ids: Vec<_> = store
            .list_history()
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.track.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn history_evicts_oldest_beyond_limit() {
        let store = LibraryStore::open_in_memory(Some(2)).unwrap();
        for id in ["a", "b", "c"] {
            store.add_history_entry(track(id)).await.unwrap();
        }

        let ids: Vec<_> = store
            .list_history()
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.track.id)
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn zero_history_limit_keeps_everything() {
        let store = LibraryStore::open_in_memory(Some(0)).unwrap();
        for id in ["a", "b", "c"] {
            store.add_history_entry(track(id)).await.unwrap();
        }
        assert_eq!(store.list_history().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_playlist_name_is_rejected() {
        let store = store();
        let err = store.create_playlist("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.list_playlists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn playlists_get_unique_increasing_ids() {
        let store = store();
        let first = store.create_playlist(" Road Trip ").await.unwrap();
        let second = store.create_playlist("Road Trip").await.unwrap();

        assert_eq!(first.name, "Road Trip");
        assert!(first.videos.is_empty());
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn duplicate_video_is_ignored() {
        let store = store();
        let playlist = store.create_playlist("Mix").await.unwrap();

        assert!(store.add_video_to_playlist(playlist.id, track("a")).await.unwrap());
        assert!(store.add_video_to_playlist(playlist.id, track("b")).await.unwrap());
        assert!(!store.add_video_to_playlist(playlist.id, track("a")).await.unwrap());

        let loaded = store.get_playlist(playlist.id).await.unwrap();
        let ids: Vec<_> = loaded.videos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn removal_keeps_remaining_order_and_appends_go_last() {
        let store = store();
        let playlist = store.create_playlist("Mix").await.unwrap();
        for id in ["a", "b", "c"] {
            store.add_video_to_playlist(playlist.id, track(id)).await.unwrap();
        }

        assert!(store.remove_video_from_playlist(playlist.id, "b").await.unwrap());
        assert!(!store.remove_video_from_playlist(playlist.id, "b").await.unwrap());
        store.add_video_to_playlist(playlist.id, track("d")).await.unwrap();

        let loaded = store.get_playlist(playlist.id).await.unwrap();
        let ids: Vec<_> = loaded.videos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn operations_on_missing_playlist_report_not_found() {
        let store = store();
        assert_eq!(store.get_playlist(42).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            store.add_video_to_playlist(42, track("a")).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            store.remove_video_from_playlist(42, "a").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn delete_playlist_removes_entries_and_is_idempotent() {
        let store = store();
        let playlist = store.create_playlist("Mix").await.unwrap();
        store.add_video_to_playlist(playlist.id, track("a")).await.unwrap();

        assert!(store.delete_playlist(playlist.id).await.unwrap());
        assert!(!store.delete_playlist(playlist.id).await.unwrap());
        assert!(store.list_playlists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn summaries_count_videos() {
        let store = store();
        let a = store.create_playlist("A").await.unwrap();
        let b = store.create_playlist("B").await.unwrap();
        store.add_video_to_playlist(a.id, track("x")).await.unwrap();
        store.add_video_to_playlist(a.id, track("y")).await.unwrap();

        let summaries = store.list_playlists().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!((summaries[0].id, summaries[0].video_count), (a.id, 2));
        assert_eq!((summaries[1].id, summaries[1].video_count), (b.id, 0));
    }

    #[tokio::test]
    async fn library_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("library.db");

        {
            let store = LibraryStore::open(&path, None).unwrap();
            store.add_favorite(track("a")).await.unwrap();
            let playlist = store.create_playlist("Keep").await.unwrap();
            store.add_video_to_playlist(playlist.id, track("b")).await.unwrap();
        }

        let store = LibraryStore::open(&path, None).unwrap();
        assert!(store.is_favorite("a").await.unwrap());
        let playlists = store.list_playlists().await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].video_count, 1);
    }
}
