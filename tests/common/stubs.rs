//! In-process stand-ins for the model provider and the music platform.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use vibecheck_server::llm::{
    CompletionOptions, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
};
use vibecheck_server::spotify::{
    AccessGrant, CreatedPlaylist, MusicPlatform, PlatformError, ResolvedTrack, UserProfile,
};

use super::constants::*;

/// A well-formed model answer with `count` distinct guesses.
pub fn llm_reply(count: usize) -> String {
    let tracks: Vec<_> = (1..=count)
        .map(|i| json!({"artist": format!("Artist {}", i), "track": format!("Song {}", i)}))
        .collect();
    json!({
        "summary": "Late night drive with the windows down.",
        "vibe_stats": [
            {"name": "Nostalgia", "value": 72},
            {"name": "Energy", "value": "55%"}
        ],
        "tracks": tracks,
    })
    .to_string()
}

/// Answers every completion with the same text and records which model
/// served each call.
pub struct StubLlm {
    reply: Result<String, String>,
    models: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn models_called(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(
        &self,
        model: &str,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        self.models.lock().unwrap().push(model.to_string());
        match &self.reply {
            Ok(text) => Ok(CompletionResponse {
                content: text.clone(),
                finish_reason: FinishReason::Stop,
                usage: None,
            }),
            Err(message) => Err(LlmError::Api {
                status: 503,
                message: message.clone(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum SearchBehavior {
    /// Every query matches a track built from the query itself.
    MatchAll,
    /// Queries whose track title is listed come back empty.
    MissTracks(&'static [&'static str]),
    /// Every search hangs well past any resolver timeout.
    Hang,
}

pub struct StubPlatform {
    search: SearchBehavior,
    email: Option<String>,
    searches: Mutex<Vec<String>>,
    playlists: Mutex<Vec<(String, String)>>,
    added: Mutex<Vec<Vec<String>>>,
}

impl StubPlatform {
    pub fn new(search: SearchBehavior) -> Self {
        Self {
            search,
            email: Some(TEST_EMAIL.to_string()),
            searches: Mutex::new(Vec::new()),
            playlists: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
        }
    }

    /// A profile that hides its email address.
    pub fn without_email(mut self) -> Self {
        self.email = None;
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    /// `(user_id, name)` of every playlist created.
    pub fn playlists(&self) -> Vec<(String, String)> {
        self.playlists.lock().unwrap().clone()
    }

    /// URI batches in the order they were appended.
    pub fn added_batches(&self) -> Vec<Vec<String>> {
        self.added.lock().unwrap().clone()
    }

    fn check_token(token: &str) -> Result<(), PlatformError> {
        if token == ACCESS_TOKEN {
            Ok(())
        } else {
            Err(PlatformError::Status {
                status: 401,
                message: "Invalid access token".to_string(),
            })
        }
    }
}

fn track_from_query(query: &str) -> ResolvedTrack {
    let (track, artist) = query
        .strip_prefix("track:")
        .and_then(|rest| rest.split_once(" artist:"))
        .unwrap_or((query, "Unknown"));
    let id: String = track
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    ResolvedTrack {
        id: id.clone(),
        name: track.to_string(),
        artist: artist.to_string(),
        album_art: Some(format!("https://img.test/{}.jpg", id)),
        uri: format!("spotify:track:{}", id),
    }
}

#[async_trait]
impl MusicPlatform for StubPlatform {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "https://accounts.test/authorize?client_id=stub&response_type=code&state={}",
            state
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<AccessGrant, PlatformError> {
        if code != GOOD_CODE {
            return Err(PlatformError::Status {
                status: 400,
                message: "invalid_grant".to_string(),
            });
        }
        Ok(AccessGrant {
            access_token: ACCESS_TOKEN.to_string(),
            expires_in: Some(3600),
            refresh_token: None,
        })
    }

    async fn current_user(&self, token: &str) -> Result<UserProfile, PlatformError> {
        Self::check_token(token)?;
        Ok(UserProfile {
            id: TEST_SPOTIFY_ID.to_string(),
            email: self.email.clone(),
            display_name: Some("Listener".to_string()),
        })
    }

    async fn search_track(
        &self,
        token: &str,
        query: &str,
    ) -> Result<Option<ResolvedTrack>, PlatformError> {
        self.searches.lock().unwrap().push(query.to_string());
        Self::check_token(token)?;
        match self.search {
            SearchBehavior::MatchAll => Ok(Some(track_from_query(query))),
            SearchBehavior::MissTracks(missing) => {
                let track = track_from_query(query);
                if missing.contains(&track.name.as_str()) {
                    Ok(None)
                } else {
                    Ok(Some(track))
                }
            }
            SearchBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }
        }
    }

    async fn create_playlist(
        &self,
        token: &str,
        user_id: &str,
        name: &str,
        _description: &str,
    ) -> Result<CreatedPlaylist, PlatformError> {
        Self::check_token(token)?;
        self.playlists
            .lock()
            .unwrap()
            .push((user_id.to_string(), name.to_string()));
        Ok(CreatedPlaylist {
            id: "playlist-1".to_string(),
            url: "https://open.spotify.test/playlist/playlist-1".to_string(),
        })
    }

    async fn add_tracks(
        &self,
        token: &str,
        _playlist_id: &str,
        uris: &[String],
    ) -> Result<(), PlatformError> {
        Self::check_token(token)?;
        self.added.lock().unwrap().push(uris.to_vec());
        Ok(())
    }
}
