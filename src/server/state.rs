use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::recommend::Recommender;
use crate::resolver::TrackResolver;
use crate::spotify::{AuthStateStore, MusicPlatform};
use crate::vibe_store::VibeStore;

use super::ServerConfig;

pub type GuardedRecommender = Arc<Recommender>;
pub type GuardedResolver = Arc<TrackResolver>;
pub type GuardedPlatform = Arc<dyn MusicPlatform>;
pub type GuardedVibeStore = Arc<dyn VibeStore>;
pub type GuardedAuthStateStore = Arc<AuthStateStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub recommender: GuardedRecommender,
    pub resolver: GuardedResolver,
    pub platform: GuardedPlatform,
    pub vibe_store: GuardedVibeStore,
    pub auth_states: GuardedAuthStateStore,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedRecommender {
    fn from_ref(input: &ServerState) -> Self {
        input.recommender.clone()
    }
}

impl FromRef<ServerState> for GuardedPlatform {
    fn from_ref(input: &ServerState) -> Self {
        input.platform.clone()
    }
}

impl FromRef<ServerState> for GuardedVibeStore {
    fn from_ref(input: &ServerState) -> Self {
        input.vibe_store.clone()
    }
}

impl FromRef<ServerState> for GuardedAuthStateStore {
    fn from_ref(input: &ServerState) -> Self {
        input.auth_states.clone()
    }
}
