use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vibecheck_server::config::{AppConfig, CliConfig, FileConfig, LlmProviderKind, StoreSettings};
use vibecheck_server::llm::{CompletionOptions, GeminiProvider, LlmProvider, OpenAIProvider};
use vibecheck_server::recommend::{ModelRotation, Recommender, RecommenderSettings, RotationPolicy};
use vibecheck_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use vibecheck_server::spotify::SpotifyClient;
use vibecheck_server::vibe_store::{HostedVibeStore, SqliteVibeStore, VibeStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(version, about = "VibeCheck recommendation backend")]
struct CliArgs {
    /// Optional TOML file; its values win over flags and environment.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// SQLite file holding user history. Ignored with a hosted store.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 4040)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Web front-end origin, also where the OAuth callback lands.
    #[clap(long, env = "FRONTEND_URL")]
    pub frontend_url: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub spotify_client_id: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,

    #[clap(long, env = "SPOTIFY_REDIRECT_URI")]
    pub spotify_redirect_uri: Option<String>,

    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Hosted store project URL. Selects the hosted store together with the key.
    #[clap(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[clap(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            frontend_url: self.frontend_url.clone(),
            spotify_client_id: self.spotify_client_id.clone(),
            spotify_client_secret: self.spotify_client_secret.clone(),
            spotify_redirect_uri: self.spotify_redirect_uri.clone(),
            llm_api_key: self
                .llm_api_key
                .clone()
                .or_else(|| std::env::var("LLM_API_KEY").ok()),
            supabase_url: self.supabase_url.clone(),
            supabase_key: self.supabase_key.clone(),
        }
    }
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm = &config.llm;
    Ok(match llm.provider {
        LlmProviderKind::Gemini => {
            let key = llm
                .api_key
                .clone()
                .context("Gemini provider configured without an API key")?;
            Arc::new(GeminiProvider::with_base_url(llm.base_url.clone(), key))
        }
        LlmProviderKind::OpenAI => Arc::new(OpenAIProvider::new(
            llm.base_url.clone(),
            llm.api_key.clone(),
        )),
    })
}

fn build_vibe_store(config: &AppConfig) -> Result<Arc<dyn VibeStore>> {
    Ok(match &config.store {
        StoreSettings::Sqlite { path } => {
            info!("Opening SQLite history database at {:?}...", path);
            Arc::new(SqliteVibeStore::new(path)?)
        }
        StoreSettings::Hosted { url, key, timeout } => {
            info!("Using hosted history store at {}", url);
            Arc::new(HostedVibeStore::new(url, key, *timeout)?)
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let provider = build_provider(&config)?;
    info!(
        "Using {} models {:?}, switching every {} calls",
        provider.name(),
        config.llm.models,
        config.llm.calls_per_model
    );
    let rotation = Arc::new(ModelRotation::new(RotationPolicy {
        models: config.llm.models.clone(),
        calls_per_model: config.llm.calls_per_model,
    }));
    let recommender = Arc::new(Recommender::new(
        provider,
        rotation,
        RecommenderSettings {
            track_count: config.llm.track_count,
            completion: CompletionOptions {
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
                timeout: config.llm.timeout,
                json_output: true,
            },
        },
    ));

    let platform = Arc::new(SpotifyClient::new(
        config.spotify.credentials.clone(),
        config.spotify.endpoints.clone(),
        config.spotify.timeout,
    )?);

    let vibe_store = build_vibe_store(&config)?;

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        frontend_url: config.frontend_url.clone(),
        default_playlist_name: config.export.default_playlist_name.clone(),
        playlist_description: config.export.description.clone(),
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(
        server_config,
        platform,
        recommender,
        config.resolver.clone(),
        vibe_store,
    )
    .await
}
