use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderValue, Method},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use super::{log_requests, state::*, ApiError, ServerConfig};
use crate::quiz::{question_set, QuizAnswers};
use crate::recommend::VibeStat;
use crate::resolver::{ResolverSettings, TrackResolver, UnresolvedGuess};
use crate::spotify::{export_playlist, AuthStateStore, PendingAuth, PlaylistDraft, ResolvedTrack};
use crate::vibe_store::StoredVibe;

/// Quiz answers accepted by `/generate`.
pub const MAX_ANSWERS: usize = 10;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
    /// Position in the model rotation and calls it served today.
    pub model_index: usize,
    pub model_calls: u32,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize)]
struct LoginResponse {
    auth_url: String,
}

#[derive(Deserialize, Debug)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GenerateBody {
    #[serde(default)]
    token: String,
    #[serde(default)]
    answers: QuizAnswers,
    language: Option<String>,
    email: Option<String>,
}

#[derive(Serialize)]
struct GenerateResponse {
    summary: String,
    vibe_stats: Vec<VibeStat>,
    tracks: Vec<ResolvedTrack>,
    /// Guesses the model produced; `tracks.len()` of them resolved.
    requested: usize,
    unresolved: Vec<UnresolvedGuess>,
}

#[derive(Deserialize, Debug)]
struct ExportBody {
    #[serde(default)]
    token: String,
    #[serde(default)]
    track_uris: Vec<String>,
    playlist_name: Option<String>,
}

#[derive(Serialize)]
struct ExportResponse {
    status: &'static str,
    url: String,
    playlist_id: String,
    added: usize,
}

#[derive(Deserialize, Debug)]
struct EmailQuery {
    email: Option<String>,
}

impl EmailQuery {
    fn required(self) -> Result<String, ApiError> {
        self.email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ApiError::bad_request("email is required"))
    }
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let rotation = state.recommender.rotation().snapshot();
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
        model_index: rotation.index,
        model_calls: rotation.calls,
    })
}

async fn get_questions() -> impl IntoResponse {
    Json(question_set())
}

async fn login(
    State(platform): State<GuardedPlatform>,
    State(auth_states): State<GuardedAuthStateStore>,
) -> impl IntoResponse {
    auth_states.cleanup_expired().await;
    let pending = PendingAuth::generate();
    let auth_url = platform.authorize_url(&pending.state);
    auth_states.store(pending).await;
    let pending = auth_states.len().await;
    debug!(pending, "Login started");
    Json(LoginResponse { auth_url })
}

async fn callback(
    State(state): State<ServerState>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;

    if let Some(error) = params.error {
        warn!("Authorization denied: {}", error);
        return Err(ApiError::bad_request(format!(
            "Spotify authorization failed: {}",
            error
        )));
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;
    let known_state = match params.state {
        Some(s) => state.auth_states.take(&s).await.is_some(),
        None => false,
    };
    if !known_state {
        return Err(ApiError::bad_request("Unknown or expired login state"));
    }

    let grant = state.platform.exchange_code(&code).await?;
    let profile = state.platform.current_user(&grant.access_token).await?;
    let email = profile.email.clone().ok_or_else(|| {
        ApiError::Internal("Spotify profile does not expose an email address".to_string())
    })?;

    state.vibe_store.sync_user(&email, &profile.id).await?;
    info!(spotify_id = %profile.id, "User logged in");

    let target = format!(
        "{}/quiz?token={}&email={}",
        state.config.frontend_url,
        urlencoding::encode(&grant.access_token),
        urlencoding::encode(&email)
    );
    Ok(Redirect::to(&target).into_response())
}

async fn generate(
    State(state): State<ServerState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(body) = body?;

    if body.token.trim().is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }
    if body.answers.is_empty() || body.answers.len() > MAX_ANSWERS {
        return Err(ApiError::bad_request(format!(
            "answers must hold between 1 and {} entries",
            MAX_ANSWERS
        )));
    }
    let language = body.language.as_deref().unwrap_or("en");

    let recommendation = state.recommender.recommend(&body.answers, language).await?;
    let report = state
        .resolver
        .resolve(&body.token, &recommendation.tracks)
        .await;
    let unresolved = report.unresolved(&recommendation.tracks);
    let tracks = report.into_tracks();

    debug!(
        requested = recommendation.tracks.len(),
        resolved = tracks.len(),
        "Generation resolved"
    );

    let vibe = StoredVibe {
        summary: recommendation.summary,
        vibe_stats: recommendation.vibe_stats,
        tracks,
    };

    if let Some(email) = body.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        state.vibe_store.save_generation(email, &vibe).await?;
    }

    Ok(Json(GenerateResponse {
        summary: vibe.summary,
        vibe_stats: vibe.vibe_stats,
        tracks: vibe.tracks,
        requested: recommendation.tracks.len(),
        unresolved,
    }))
}

async fn export(
    State(state): State<ServerState>,
    body: Result<Json<ExportBody>, JsonRejection>,
) -> Result<Json<ExportResponse>, ApiError> {
    let Json(body) = body?;

    if body.token.trim().is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }
    if body.track_uris.is_empty() {
        return Err(ApiError::bad_request("track_uris must not be empty"));
    }

    let draft = PlaylistDraft {
        name: body
            .playlist_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| state.config.default_playlist_name.clone()),
        description: state.config.playlist_description.clone(),
        uris: body.track_uris,
    };

    let exported = export_playlist(state.platform.as_ref(), &body.token, &draft).await?;
    Ok(Json(ExportResponse {
        status: "success",
        url: exported.url,
        playlist_id: exported.playlist_id,
        added: exported.added,
    }))
}

async fn last_vibe(
    State(vibe_store): State<GuardedVibeStore>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<Option<serde_json::Value>>, ApiError> {
    let Query(query) = query?;
    let email = query.required()?;
    Ok(Json(vibe_store.last_vibe(&email).await?))
}

async fn user_stats(
    State(vibe_store): State<GuardedVibeStore>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let email = query.required()?;
    Ok(Json(vibe_store.user_stats(&email).await?).into_response())
}

fn cors_layer(frontend_url: &str) -> Result<CorsLayer> {
    let origin = reqwest::Url::parse(frontend_url)
        .with_context(|| format!("Invalid frontend url: {}", frontend_url))?
        .origin()
        .ascii_serialization();
    let origin = HeaderValue::from_str(&origin)
        .with_context(|| format!("Invalid frontend origin: {}", origin))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn make_app(
    config: ServerConfig,
    platform: GuardedPlatform,
    recommender: GuardedRecommender,
    resolver_settings: ResolverSettings,
    vibe_store: GuardedVibeStore,
) -> Result<Router> {
    let cors = cors_layer(&config.frontend_url)?;
    let resolver = Arc::new(TrackResolver::new(platform.clone(), resolver_settings));

    let state = ServerState {
        config,
        start_time: Instant::now(),
        recommender,
        resolver,
        platform,
        vibe_store,
        auth_states: Arc::new(AuthStateStore::new()),
    };

    let app: Router = Router::new()
        .route("/", get(home))
        .route("/questions", get(get_questions))
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/generate", post(generate))
        .route("/export", post(export))
        .route("/get-history", get(last_vibe))
        .route("/last-vibe", get(last_vibe))
        .route("/stats", get(user_stats))
        .layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state);

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    platform: GuardedPlatform,
    recommender: GuardedRecommender,
    resolver_settings: ResolverSettings,
    vibe_store: GuardedVibeStore,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, platform, recommender, resolver_settings, vibe_store)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
