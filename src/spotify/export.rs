use super::{MusicPlatform, PlatformError};
use serde::Serialize;
use tracing::info;

/// Most URIs Spotify accepts in a single add-items call.
pub const ADD_TRACKS_CHUNK: usize = 100;

#[derive(Debug, Clone)]
pub struct PlaylistDraft {
    pub name: String,
    pub description: String,
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedPlaylist {
    pub playlist_id: String,
    pub url: String,
    pub added: usize,
}

/// Current user, then a new playlist, then its tracks. Nothing is rolled
/// back: a failure after creation leaves a partially filled playlist.
pub async fn export_playlist(
    platform: &dyn MusicPlatform,
    token: &str,
    draft: &PlaylistDraft,
) -> Result<ExportedPlaylist, PlatformError> {
    let user = platform.current_user(token).await?;
    let playlist = platform
        .create_playlist(token, &user.id, &draft.name, &draft.description)
        .await?;

    let mut added = 0;
    for chunk in draft.uris.chunks(ADD_TRACKS_CHUNK) {
        platform.add_tracks(token, &playlist.id, chunk).await?;
        added += chunk.len();
    }

    info!(
        user_id = %user.id,
        playlist_id = %playlist.id,
        added,
        "Exported playlist"
    );
    Ok(ExportedPlaylist {
        playlist_id: playlist.id,
        url: playlist.url,
        added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::{AccessGrant, CreatedPlaylist, ResolvedTrack, UserProfile};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPlatform {
        fail_adds_after: Option<usize>,
        batches: Mutex<Vec<usize>>,
        created: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MusicPlatform for RecordingPlatform {
        fn authorize_url(&self, _state: &str) -> String {
            String::new()
        }

        async fn exchange_code(&self, _code: &str) -> Result<AccessGrant, PlatformError> {
            unreachable!()
        }

        async fn current_user(&self, token: &str) -> Result<UserProfile, PlatformError> {
            if token == "expired" {
                return Err(PlatformError::Status {
                    status: 401,
                    message: "The access token expired".to_string(),
                });
            }
            Ok(UserProfile {
                id: "user-1".to_string(),
                email: None,
                display_name: None,
            })
        }

        async fn search_track(
            &self,
            _token: &str,
            _query: &str,
        ) -> Result<Option<ResolvedTrack>, PlatformError> {
            unreachable!()
        }

        async fn create_playlist(
            &self,
            _token: &str,
            user_id: &str,
            name: &str,
            _description: &str,
        ) -> Result<CreatedPlaylist, PlatformError> {
            self.created
                .lock()
                .unwrap()
                .push((user_id.to_string(), name.to_string()));
            Ok(CreatedPlaylist {
                id: "pl-1".to_string(),
                url: "https://open.spotify.com/playlist/pl-1".to_string(),
            })
        }

        async fn add_tracks(
            &self,
            _token: &str,
            _playlist_id: &str,
            uris: &[String],
        ) -> Result<(), PlatformError> {
            let mut batches = self.batches.lock().unwrap();
            if Some(batches.len()) == self.fail_adds_after {
                return Err(PlatformError::Status {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            batches.push(uris.len());
            Ok(())
        }
    }

    fn draft(count: usize) -> PlaylistDraft {
        PlaylistDraft {
            name: "Mix".to_string(),
            description: "desc".to_string(),
            uris: (0..count).map(|i| format!("spotify:track:{i}")).collect(),
        }
    }

    #[tokio::test]
    async fn adds_tracks_in_chunks() {
        let platform = RecordingPlatform::default();
        let exported = export_playlist(&platform, "token", &draft(250)).await.unwrap();

        assert_eq!(exported.added, 250);
        assert_eq!(exported.playlist_id, "pl-1");
        assert_eq!(*platform.batches.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(
            *platform.created.lock().unwrap(),
            vec![("user-1".to_string(), "Mix".to_string())]
        );
    }

    #[tokio::test]
    async fn auth_failure_stops_before_creating_anything() {
        let platform = RecordingPlatform::default();
        let err = export_playlist(&platform, "expired", &draft(3))
            .await
            .unwrap_err();

        assert!(matches!(err, PlatformError::Status { status: 401, .. }));
        assert!(platform.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_add_leaves_created_playlist_behind() {
        let platform = RecordingPlatform {
            fail_adds_after: Some(1),
            ..Default::default()
        };
        assert!(export_playlist(&platform, "token", &draft(150)).await.is_err());
        assert_eq!(platform.created.lock().unwrap().len(), 1);
        assert_eq!(*platform.batches.lock().unwrap(), vec![100]);
    }
}
