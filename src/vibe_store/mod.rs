//! Durable per-user record: who logged in, how often they generated and
//! what they got last time.

mod hosted_vibe_store;
mod sqlite_vibe_store;

pub use hosted_vibe_store::HostedVibeStore;
pub use sqlite_vibe_store::SqliteVibeStore;

use crate::recommend::VibeStat;
use crate::spotify::ResolvedTrack;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a generation leaves behind, stored as JSON in `last_vibe_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVibe {
    pub summary: String,
    pub vibe_stats: Vec<VibeStat>,
    pub tracks: Vec<ResolvedTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub email: String,
    pub spotify_id: Option<String>,
    pub search_count: i64,
}

/// One row per email. Writes are last-writer-wins with no transaction
/// spanning calls.
#[async_trait]
pub trait VibeStore: Send + Sync {
    /// Creates the row on first login, refreshes the platform id afterwards.
    async fn sync_user(&self, email: &str, spotify_id: &str) -> Result<()>;

    /// Bumps `search_count` and overwrites the last vibe. A no-op for an
    /// email that never logged in.
    async fn save_generation(&self, email: &str, vibe: &StoredVibe) -> Result<()>;

    /// The stored payload as-is; rows written by older clients may hold a
    /// different shape than [`StoredVibe`].
    async fn last_vibe(&self, email: &str) -> Result<Option<serde_json::Value>>;

    async fn user_stats(&self, email: &str) -> Result<Option<UserStats>>;
}
