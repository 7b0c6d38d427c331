use super::RequestsLoggingLevel;
use crate::config::{DEFAULT_PLAYLIST_DESCRIPTION, DEFAULT_PLAYLIST_NAME};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Origin of the web front-end: CORS allow-list and OAuth landing page.
    pub frontend_url: String,
    pub default_playlist_name: String,
    pub playlist_description: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 4040,
            frontend_url: "http://localhost:3030".to_string(),
            default_playlist_name: DEFAULT_PLAYLIST_NAME.to_string(),
            playlist_description: DEFAULT_PLAYLIST_DESCRIPTION.to_string(),
        }
    }
}
