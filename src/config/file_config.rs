use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_url: Option<String>,

    pub spotify: Option<SpotifyConfig>,
    pub llm: Option<LlmConfig>,
    pub resolver: Option<ResolverConfig>,
    pub store: Option<StoreConfig>,
    pub export: Option<ExportConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub accounts_url: Option<String>,
    pub api_url: Option<String>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// "gemini" or "openai"
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Rotated in order, see `calls_per_model`.
    pub models: Option<Vec<String>>,
    pub calls_per_model: Option<u32>,
    pub track_count: Option<usize>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_in_flight: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub overall_deadline_ms: Option<u64>,
    pub normalize: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// "sqlite" or "hosted"
    pub backend: Option<String>,
    pub url: Option<String>,
    pub key: Option<String>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub default_playlist_name: Option<String>,
    pub description: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
