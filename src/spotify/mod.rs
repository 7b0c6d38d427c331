//! Music platform access: OAuth, catalog search and playlist export.

mod auth_state;
mod client;
mod export;
pub mod models;

pub use auth_state::{AuthStateStore, PendingAuth, AUTH_STATE_TTL_SECS};
pub use client::{SpotifyClient, SpotifyCredentials, SpotifyEndpoints, SPOTIFY_SCOPES};
pub use export::{export_playlist, ExportedPlaylist, PlaylistDraft, ADD_TRACKS_CHUNK};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A guess matched to a real catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album_art: Option<String>,
    pub uri: String,
}

impl TryFrom<models::Track> for ResolvedTrack {
    type Error = PlatformError;

    fn try_from(track: models::Track) -> Result<Self, Self::Error> {
        let artist = track
            .artists
            .into_iter()
            .next()
            .and_then(|a| a.name)
            .ok_or(PlatformError::MissingField("artists[0].name"))?;
        Ok(ResolvedTrack {
            id: track.id.ok_or(PlatformError::MissingField("id"))?,
            name: track.name.ok_or(PlatformError::MissingField("name"))?,
            artist,
            album_art: track
                .album
                .and_then(|album| album.images.into_iter().next())
                .map(|image| image.url),
            uri: track.uri.ok_or(PlatformError::MissingField("uri"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPlaylist {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("music platform request failed: {0}")]
    Request(String),

    #[error("music platform request timed out")]
    Timeout,

    #[error("music platform answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected music platform response: {0}")]
    Decode(String),

    #[error("music platform response is missing `{0}`")]
    MissingField(&'static str),
}

impl From<reqwest::Error> for PlatformError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PlatformError::Timeout
        } else if e.is_decode() {
            PlatformError::Decode(e.to_string())
        } else {
            PlatformError::Request(e.to_string())
        }
    }
}

/// The remote music service, as seen by the resolver, the OAuth flow and
/// the playlist export.
#[async_trait]
pub trait MusicPlatform: Send + Sync {
    /// URL the user is sent to in order to grant access.
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<AccessGrant, PlatformError>;

    async fn current_user(&self, token: &str) -> Result<UserProfile, PlatformError>;

    /// First track matching `query`, if any.
    async fn search_track(
        &self,
        token: &str,
        query: &str,
    ) -> Result<Option<ResolvedTrack>, PlatformError>;

    async fn create_playlist(
        &self,
        token: &str,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<CreatedPlaylist, PlatformError>;

    /// Appends `uris` in order. Callers keep each call within the
    /// platform's per-request limit.
    async fn add_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(json: &str) -> models::Track {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn resolves_complete_track_taking_first_artist_and_image() {
        let resolved = ResolvedTrack::try_from(track(
            r#"{
                "id": "4uLU6hMCjMI75M1A2tKUQC",
                "name": "Never Gonna Give You Up",
                "artists": [{"name": "Rick Astley"}, {"name": "Someone Else"}],
                "album": {"images": [{"url": "https://i.scdn.co/640", "width": 640, "height": 640}, {"url": "https://i.scdn.co/64"}]},
                "uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
            }"#,
        ))
        .unwrap();

        assert_eq!(resolved.artist, "Rick Astley");
        assert_eq!(resolved.album_art.as_deref(), Some("https://i.scdn.co/640"));
    }

    #[test]
    fn album_art_is_optional() {
        let resolved = ResolvedTrack::try_from(track(
            r#"{"id": "1", "name": "N", "artists": [{"name": "A"}], "album": {"images": []}, "uri": "spotify:track:1"}"#,
        ))
        .unwrap();
        assert!(resolved.album_art.is_none());
    }

    #[test]
    fn missing_identifiers_are_rejected() {
        let no_uri = track(r#"{"id": "1", "name": "N", "artists": [{"name": "A"}]}"#);
        assert!(matches!(
            ResolvedTrack::try_from(no_uri),
            Err(PlatformError::MissingField("uri"))
        ));

        let no_artist = track(r#"{"id": "1", "name": "N", "artists": [], "uri": "u"}"#);
        assert!(matches!(
            ResolvedTrack::try_from(no_artist),
            Err(PlatformError::MissingField(_))
        ));
    }
}
