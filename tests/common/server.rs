//! Test server lifecycle management
//!
//! Each test gets its own server on a random port, backed by stub services
//! and a throwaway SQLite history database.

use super::constants::*;
use super::stubs::{llm_reply, SearchBehavior, StubLlm, StubPlatform};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use vibecheck_server::recommend::{
    ModelRotation, Recommender, RecommenderSettings, RotationPolicy,
};
use vibecheck_server::resolver::ResolverSettings;
use vibecheck_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use vibecheck_server::vibe_store::{SqliteVibeStore, VibeStore};

/// Knobs for [`TestServer::spawn_with`].
pub struct TestSetup {
    pub llm: StubLlm,
    pub platform: StubPlatform,
    pub resolver: ResolverSettings,
    pub track_count: usize,
}

impl Default for TestSetup {
    fn default() -> Self {
        Self {
            llm: StubLlm::replying(llm_reply(5)),
            platform: StubPlatform::new(SearchBehavior::MatchAll),
            resolver: ResolverSettings::default(),
            track_count: 5,
        }
    }
}

/// Running server plus handles on its collaborators.
///
/// Dropping it shuts the server down and removes the database.
pub struct TestServer {
    pub base_url: String,
    pub llm: Arc<StubLlm>,
    pub platform: Arc<StubPlatform>,
    pub vibe_store: Arc<dyn VibeStore>,

    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestSetup::default()).await
    }

    pub async fn spawn_with(setup: TestSetup) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let vibe_store: Arc<dyn VibeStore> = Arc::new(
            SqliteVibeStore::new(temp_db_dir.path().join("vibecheck.db"))
                .expect("Failed to open history store"),
        );

        let llm = Arc::new(setup.llm);
        let platform = Arc::new(setup.platform);

        let rotation = Arc::new(ModelRotation::new(RotationPolicy {
            models: STUB_MODELS.iter().map(|m| m.to_string()).collect(),
            calls_per_model: 1,
        }));
        let recommender = Arc::new(Recommender::new(
            llm.clone(),
            rotation,
            RecommenderSettings {
                track_count: setup.track_count,
                ..Default::default()
            },
        ));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            frontend_url: FRONTEND_URL.to_string(),
            ..Default::default()
        };

        let app = make_app(
            config,
            platform.clone(),
            recommender,
            setup.resolver,
            vibe_store.clone(),
        )
        .expect("Failed to build app");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            llm,
            platform,
            vibe_store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }
            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
