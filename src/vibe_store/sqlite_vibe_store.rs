use super::{StoredVibe, UserStats, VibeStore};
use crate::sqlite_column;
use crate::sqlite_persistence::{open_versioned, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const USER_STATS_TABLE_V_0: Table = Table {
    name: "user_stats",
    columns: &[
        sqlite_column!("email", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("spotify_id", SqlType::Text),
        sqlite_column!(
            "search_count",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("last_vibe_json", SqlType::Text),
        sqlite_column!(
            "created",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("updated", SqlType::Integer),
    ],
    indices: &[("idx_user_stats_spotify_id", "spotify_id")],
};

pub static VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[USER_STATS_TABLE_V_0],
    migration: None,
}];

#[derive(Clone)]
pub struct SqliteVibeStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVibeStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("vibe store connection lock poisoned"))?;
        f(&conn)
    }
}

#[async_trait]
impl VibeStore for SqliteVibeStore {
    async fn sync_user(&self, email: &str, spotify_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO user_stats (email, spotify_id) VALUES (?1, ?2) \
                     ON CONFLICT(email) DO UPDATE SET spotify_id = excluded.spotify_id, \
                     updated = {}",
                    DEFAULT_TIMESTAMP
                ),
                params![email, spotify_id],
            )
            .context("Failed to upsert user")?;
            Ok(())
        })
    }

    async fn save_generation(&self, email: &str, vibe: &StoredVibe) -> Result<()> {
        let payload = serde_json::to_string(vibe)?;
        self.with_conn(|conn| {
            let updated = conn
                .execute(
                    &format!(
                        "UPDATE user_stats SET search_count = search_count + 1, \
                         last_vibe_json = ?2, updated = {} WHERE email = ?1",
                        DEFAULT_TIMESTAMP
                    ),
                    params![email, payload],
                )
                .context("Failed to save generation")?;
            if updated == 0 {
                debug!(email, "No user row to attach the generation to");
            }
            Ok(())
        })
    }

    async fn last_vibe(&self, email: &str) -> Result<Option<serde_json::Value>> {
        let raw: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT last_vibe_json FROM user_stats WHERE email = ?1",
                    params![email],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten())
        })?;

        raw.map(|json| serde_json::from_str(&json).context("Stored vibe is not valid JSON"))
            .transpose()
    }

    async fn user_stats(&self, email: &str) -> Result<Option<UserStats>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT email, spotify_id, search_count FROM user_stats WHERE email = ?1",
                    params![email],
                    |row| {
                        Ok(UserStats {
                            email: row.get(0)?,
                            spotify_id: row.get(1)?,
                            search_count: row.get(2)?,
                        })
                    },
                )
                .optional()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibe_store::test_support::sample_vibe;
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteVibeStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteVibeStore::new(dir.path().join("vibes.db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn login_creates_row_with_zero_searches() {
        let (_dir, store) = store();
        store.sync_user("a@b.c", "spotify-1").await.unwrap();

        let stats = store.user_stats("a@b.c").await.unwrap().unwrap();
        assert_eq!(stats.spotify_id.as_deref(), Some("spotify-1"));
        assert_eq!(stats.search_count, 0);
        assert!(store.last_vibe("a@b.c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_login_refreshes_platform_id() {
        let (_dir, store) = store();
        store.sync_user("a@b.c", "old").await.unwrap();
        store.sync_user("a@b.c", "new").await.unwrap();

        let stats = store.user_stats("a@b.c").await.unwrap().unwrap();
        assert_eq!(stats.spotify_id.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn generations_overwrite_vibe_and_count() {
        let (_dir, store) = store();
        store.sync_user("a@b.c", "s").await.unwrap();
        store
            .save_generation("a@b.c", &sample_vibe("first"))
            .await
            .unwrap();
        store
            .save_generation("a@b.c", &sample_vibe("second"))
            .await
            .unwrap();

        let vibe = store.last_vibe("a@b.c").await.unwrap().unwrap();
        assert_eq!(vibe["summary"], "second");
        assert_eq!(vibe["tracks"][0]["uri"], "spotify:track:t1");
        assert_eq!(
            store.user_stats("a@b.c").await.unwrap().unwrap().search_count,
            2
        );
    }

    #[tokio::test]
    async fn generation_for_unknown_email_is_ignored() {
        let (_dir, store) = store();
        store
            .save_generation("ghost@b.c", &sample_vibe("x"))
            .await
            .unwrap();
        assert!(store.user_stats("ghost@b.c").await.unwrap().is_none());
        assert!(store.last_vibe("ghost@b.c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vibes.db");
        {
            let store = SqliteVibeStore::new(&path).unwrap();
            store.sync_user("a@b.c", "s").await.unwrap();
        }
        let store = SqliteVibeStore::new(&path).unwrap();
        assert!(store.user_stats("a@b.c").await.unwrap().is_some());
    }
}
