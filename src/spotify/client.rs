//! Spotify Web API client over `reqwest`.

use super::models::{
    AddTracksBody, CreatePlaylistBody, CurrentUser, ErrorBody, PlaylistObject, SearchResponse,
    SnapshotResponse, TokenResponse,
};
use super::{AccessGrant, CreatedPlaylist, MusicPlatform, PlatformError, ResolvedTrack, UserProfile};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const SPOTIFY_SCOPES: &str =
    "playlist-modify-public user-top-read user-read-private user-read-email";

#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Base URLs, overridable so tests and proxies can stand in for Spotify.
#[derive(Debug, Clone)]
pub struct SpotifyEndpoints {
    pub accounts_url: String,
    pub api_url: String,
}

impl Default for SpotifyEndpoints {
    fn default() -> Self {
        Self {
            accounts_url: "https://accounts.spotify.com".to_string(),
            api_url: "https://api.spotify.com/v1".to_string(),
        }
    }
}

pub struct SpotifyClient {
    client: reqwest::Client,
    credentials: SpotifyCredentials,
    accounts_url: String,
    api_url: String,
}

impl SpotifyClient {
    /// `timeout` bounds every call, searches included. A search cut off here
    /// surfaces as [`PlatformError::Timeout`].
    pub fn new(
        credentials: SpotifyCredentials,
        endpoints: SpotifyEndpoints,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
            accounts_url: endpoints.accounts_url.trim_end_matches('/').to_string(),
            api_url: endpoints.api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PlatformError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|e| e.message())
                .unwrap_or(body);
            return Err(PlatformError::Status {
                status: status.as_u16(),
                message,
            });
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| PlatformError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MusicPlatform for SpotifyClient {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
            self.accounts_url,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.credentials.redirect_uri),
            urlencoding::encode(SPOTIFY_SCOPES),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<AccessGrant, PlatformError> {
        let url = format!("{}/api/token", self.accounts_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = Self::decode(response).await?;
        debug!(
            token_type = ?token.token_type,
            scope = ?token.scope,
            "Exchanged authorization code"
        );
        Ok(AccessGrant {
            access_token: token.access_token,
            expires_in: token.expires_in,
            refresh_token: token.refresh_token,
        })
    }

    async fn current_user(&self, token: &str) -> Result<UserProfile, PlatformError> {
        let url = format!("{}/me", self.api_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let user: CurrentUser = Self::decode(response).await?;
        Ok(UserProfile {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
        })
    }

    async fn search_track(
        &self,
        token: &str,
        query: &str,
    ) -> Result<Option<ResolvedTrack>, PlatformError> {
        let url = format!("{}/search", self.api_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()
            .await?;

        let page: SearchResponse = Self::decode(response).await?;
        let first = page
            .tracks
            .ok_or(PlatformError::MissingField("tracks"))?
            .items
            .into_iter()
            .next()
            .flatten();

        first.map(ResolvedTrack::try_from).transpose()
    }

    async fn create_playlist(
        &self,
        token: &str,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<CreatedPlaylist, PlatformError> {
        let url = format!(
            "{}/users/{}/playlists",
            self.api_url,
            urlencoding::encode(user_id)
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&CreatePlaylistBody {
                name,
                description,
                public: true,
            })
            .send()
            .await?;

        let playlist: PlaylistObject = Self::decode(response).await?;
        let url = playlist
            .external_urls
            .and_then(|urls| urls.spotify)
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", playlist.id));
        Ok(CreatedPlaylist {
            id: playlist.id,
            url,
        })
    }

    async fn add_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_url,
            urlencoding::encode(playlist_id)
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&AddTracksBody { uris })
            .send()
            .await?;

        let snapshot: SnapshotResponse = Self::decode(response).await?;
        debug!(
            playlist_id,
            added = uris.len(),
            snapshot = ?snapshot.snapshot_id,
            "Added tracks to playlist"
        );
        Ok(())
    }
}
