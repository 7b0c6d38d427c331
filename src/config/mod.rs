mod file_config;

pub use file_config::{
    ExportConfig, FileConfig, LlmConfig, ResolverConfig, SpotifyConfig, StoreConfig,
};

use crate::llm::GEMINI_API_BASE;
use crate::recommend::DEFAULT_TRACK_COUNT;
use crate::resolver::{ResolverSettings, MAX_IN_FLIGHT};
use crate::server::RequestsLoggingLevel;
use crate::spotify::{SpotifyCredentials, SpotifyEndpoints};
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODELS: [&str; 3] =
    ["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.0-flash"];
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PLAYLIST_NAME: &str = "VibeCheck AI Mix";
pub const DEFAULT_PLAYLIST_DESCRIPTION: &str = "Curated by VibeCheck from your quiz answers.";

/// CLI arguments that can be used for config resolution.
/// Secrets usually arrive here through their environment variables.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_url: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_redirect_uri: Option<String>,
    pub llm_api_key: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Gemini,
    OpenAI,
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub credentials: SpotifyCredentials,
    pub endpoints: SpotifyEndpoints,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub models: Vec<String>,
    pub calls_per_model: u32,
    pub track_count: usize,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreSettings {
    Sqlite {
        path: PathBuf,
    },
    Hosted {
        url: String,
        key: String,
        timeout: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub default_playlist_name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_url: String,
    pub spotify: SpotifySettings,
    pub llm: LlmSettings,
    pub resolver: ResolverSettings,
    pub store: StoreSettings,
    pub export: ExportSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());
        let frontend_url = file
            .frontend_url
            .or_else(|| cli.frontend_url.clone())
            .unwrap_or_else(|| "http://localhost:3030".to_string())
            .trim_end_matches('/')
            .to_string();

        let spotify = Self::resolve_spotify(cli, file.spotify.unwrap_or_default())?;
        let llm = Self::resolve_llm(cli, file.llm.unwrap_or_default())?;
        let resolver = Self::resolve_resolver(file.resolver.unwrap_or_default())?;
        let store = Self::resolve_store(cli, file.db_path, file.store.unwrap_or_default())?;

        let export_file = file.export.unwrap_or_default();
        let export = ExportSettings {
            default_playlist_name: export_file
                .default_playlist_name
                .unwrap_or_else(|| DEFAULT_PLAYLIST_NAME.to_string()),
            description: export_file
                .description
                .unwrap_or_else(|| DEFAULT_PLAYLIST_DESCRIPTION.to_string()),
        };

        Ok(Self {
            port,
            logging_level,
            frontend_url,
            spotify,
            llm,
            resolver,
            store,
            export,
        })
    }

    fn resolve_spotify(cli: &CliConfig, file: SpotifyConfig) -> Result<SpotifySettings> {
        let required = |value: Option<String>, fallback: &Option<String>, what: &str| {
            value
                .or_else(|| fallback.clone())
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    anyhow!(
                        "Spotify {} must be specified via SPOTIFY_{} or [spotify] in config file",
                        what.replace('_', " "),
                        what.to_uppercase()
                    )
                })
        };

        let credentials = SpotifyCredentials {
            client_id: required(file.client_id, &cli.spotify_client_id, "client_id")?,
            client_secret: required(file.client_secret, &cli.spotify_client_secret, "client_secret")?,
            redirect_uri: required(file.redirect_uri, &cli.spotify_redirect_uri, "redirect_uri")?,
        };

        let defaults = SpotifyEndpoints::default();
        Ok(SpotifySettings {
            credentials,
            endpoints: SpotifyEndpoints {
                accounts_url: file.accounts_url.unwrap_or(defaults.accounts_url),
                api_url: file.api_url.unwrap_or(defaults.api_url),
            },
            timeout: Duration::from_secs(file.timeout_sec.unwrap_or(15)),
        })
    }

    fn resolve_llm(cli: &CliConfig, file: LlmConfig) -> Result<LlmSettings> {
        let provider = match file.provider.as_deref().map(str::to_ascii_lowercase) {
            None => LlmProviderKind::Gemini,
            Some(p) if p == "gemini" => LlmProviderKind::Gemini,
            Some(p) if p == "openai" => LlmProviderKind::OpenAI,
            Some(other) => bail!("Unknown LLM provider '{}', expected gemini or openai", other),
        };

        let api_key = file
            .api_key
            .or_else(|| cli.llm_api_key.clone())
            .filter(|k| !k.trim().is_empty());
        if provider == LlmProviderKind::Gemini && api_key.is_none() {
            bail!("Gemini API key must be specified via GEMINI_API_KEY or [llm] api_key");
        }

        let (default_base, default_models): (&str, Vec<String>) = match provider {
            LlmProviderKind::Gemini => (
                GEMINI_API_BASE,
                DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
            ),
            LlmProviderKind::OpenAI => (DEFAULT_OPENAI_BASE, vec![DEFAULT_OPENAI_MODEL.to_string()]),
        };

        let models: Vec<String> = file
            .models
            .unwrap_or(default_models)
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if models.is_empty() {
            bail!("[llm] models must list at least one model");
        }

        let track_count = file.track_count.unwrap_or(DEFAULT_TRACK_COUNT);
        if track_count == 0 {
            bail!("[llm] track_count must be greater than zero");
        }

        Ok(LlmSettings {
            provider,
            base_url: file.base_url.unwrap_or_else(|| default_base.to_string()),
            api_key,
            models,
            calls_per_model: file.calls_per_model.unwrap_or(20),
            track_count,
            temperature: file.temperature.unwrap_or(0.9),
            max_tokens: file.max_tokens,
            timeout: Duration::from_secs(file.timeout_sec.unwrap_or(60)),
        })
    }

    fn resolve_resolver(file: ResolverConfig) -> Result<ResolverSettings> {
        let defaults = ResolverSettings::default();
        let settings = ResolverSettings {
            max_in_flight: file.max_in_flight.unwrap_or(defaults.max_in_flight),
            request_timeout: file
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            overall_deadline: file
                .overall_deadline_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.overall_deadline),
            normalize: file.normalize.unwrap_or(defaults.normalize),
        };
        if settings.max_in_flight == 0 || settings.max_in_flight > MAX_IN_FLIGHT {
            bail!(
                "[resolver] max_in_flight must be between 1 and {}",
                MAX_IN_FLIGHT
            );
        }
        if settings.request_timeout.is_zero() || settings.overall_deadline.is_zero() {
            bail!("[resolver] timeouts must be greater than zero");
        }
        Ok(settings)
    }

    fn resolve_store(
        cli: &CliConfig,
        file_db_path: Option<String>,
        file: StoreConfig,
    ) -> Result<StoreSettings> {
        let url = file.url.or_else(|| cli.supabase_url.clone());
        let key = file.key.or_else(|| cli.supabase_key.clone());

        let hosted = match file.backend.as_deref() {
            Some("hosted") => true,
            Some("sqlite") => false,
            Some(other) => bail!("Unknown store backend '{}', expected sqlite or hosted", other),
            None => url.is_some() && key.is_some(),
        };

        if hosted {
            let (Some(url), Some(key)) = (url, key) else {
                bail!("Hosted store needs SUPABASE_URL and SUPABASE_KEY (or [store] url/key)");
            };
            return Ok(StoreSettings::Hosted {
                url,
                key,
                timeout: Duration::from_secs(file.timeout_sec.unwrap_or(10)),
            });
        }

        let path = file_db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from("vibecheck.db"));
        if path.is_dir() {
            bail!("db_path is a directory: {:?}", path);
        }
        Ok(StoreSettings::Sqlite { path })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
