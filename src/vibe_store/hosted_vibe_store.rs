//! `user_stats` kept in a hosted Postgres behind a PostgREST endpoint
//! (Supabase). The `increment_search_count(user_email)` function must exist
//! on the database side.

use super::{StoredVibe, UserStats, VibeStore};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const TABLE: &str = "user_stats";

pub struct HostedVibeStore {
    client: reqwest::Client,
    rest_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct LastVibeRow {
    last_vibe_json: Option<serde_json::Value>,
}

impl HostedVibeStore {
    /// `project_url` is the project root, e.g. `https://xyz.supabase.co`.
    pub fn new(project_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn eq_filter(email: &str) -> String {
        format!("eq.{}", email)
    }

    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        bail!("{} failed with status {}: {}", what, status, body)
    }
}

#[async_trait]
impl VibeStore for HostedVibeStore {
    async fn sync_user(&self, email: &str, spotify_id: &str) -> Result<()> {
        let request = self
            .client
            .post(format!("{}/{}", self.rest_url, TABLE))
            .query(&[("on_conflict", "email")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&json!([{ "email": email, "spotify_id": spotify_id }]));
        let response = self
            .authorized(request)
            .send()
            .await
            .context("Failed to reach the datastore")?;
        Self::check(response, "User upsert").await?;
        Ok(())
    }

    async fn save_generation(&self, email: &str, vibe: &StoredVibe) -> Result<()> {
        let increment = self
            .client
            .post(format!("{}/rpc/increment_search_count", self.rest_url))
            .json(&json!({ "user_email": email }));
        let response = self
            .authorized(increment)
            .send()
            .await
            .context("Failed to reach the datastore")?;
        Self::check(response, "Search count increment").await?;

        let update = self
            .client
            .patch(format!("{}/{}", self.rest_url, TABLE))
            .query(&[("email", Self::eq_filter(email))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "last_vibe_json": vibe }));
        let response = self
            .authorized(update)
            .send()
            .await
            .context("Failed to reach the datastore")?;
        Self::check(response, "Vibe update").await?;
        Ok(())
    }

    async fn last_vibe(&self, email: &str) -> Result<Option<serde_json::Value>> {
        let request = self
            .client
            .get(format!("{}/{}", self.rest_url, TABLE))
            .query(&[
                ("select", "last_vibe_json".to_string()),
                ("email", Self::eq_filter(email)),
            ]);
        let response = self
            .authorized(request)
            .send()
            .await
            .context("Failed to reach the datastore")?;
        let rows: Vec<LastVibeRow> = Self::check(response, "Vibe lookup")
            .await?
            .json()
            .await
            .context("Failed to parse vibe lookup")?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.last_vibe_json)
            .filter(|value| !value.is_null()))
    }

    async fn user_stats(&self, email: &str) -> Result<Option<UserStats>> {
        let request = self
            .client
            .get(format!("{}/{}", self.rest_url, TABLE))
            .query(&[
                ("select", "email,spotify_id,search_count".to_string()),
                ("email", Self::eq_filter(email)),
            ]);
        let response = self
            .authorized(request)
            .send()
            .await
            .context("Failed to reach the datastore")?;
        let rows: Vec<UserStats> = Self::check(response, "Stats lookup")
            .await?
            .json()
            .await
            .context("Failed to parse stats lookup")?;
        Ok(rows.into_iter().next())
    }
}
