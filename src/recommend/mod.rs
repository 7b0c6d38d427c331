//! Recommendation stage: quiz answers in, song guesses out.

mod parse;
mod prompt;
mod rotation;

pub use parse::{parse_recommendation, ParseError};
pub use prompt::{build_messages, language_name, vibe_paragraph, SYSTEM_INSTRUCTION};
pub use rotation::{ModelRotation, RotationPolicy, RotationState};

use crate::llm::{CompletionOptions, LlmError, LlmProvider};
use crate::quiz::QuizAnswers;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_TRACK_COUNT: usize = 15;

/// An unverified (artist, title) pair. Only ever used as a search hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongGuess {
    pub artist: String,
    pub track: String,
}

impl SongGuess {
    pub fn new(artist: impl Into<String>, track: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            track: track.into(),
        }
    }

    pub(crate) fn dedup_key(&self) -> (String, String) {
        (
            self.artist.trim().to_lowercase(),
            self.track.trim().to_lowercase(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibeStat {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub vibe_stats: Vec<VibeStat>,
    pub tracks: Vec<SongGuess>,
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("the model provider failed: {0}")]
    Provider(#[from] LlmError),

    #[error(transparent)]
    MalformedOutput(#[from] ParseError),
}

#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    pub track_count: usize,
    pub completion: CompletionOptions,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            track_count: DEFAULT_TRACK_COUNT,
            completion: CompletionOptions::default(),
        }
    }
}

/// Asks the model provider for a playlist, one attempt per call.
pub struct Recommender {
    provider: Arc<dyn LlmProvider>,
    rotation: Arc<ModelRotation>,
    settings: RecommenderSettings,
}

impl Recommender {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        rotation: Arc<ModelRotation>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            provider,
            rotation,
            settings,
        }
    }

    pub fn rotation(&self) -> &ModelRotation {
        &self.rotation
    }

    pub async fn recommend(
        &self,
        answers: &QuizAnswers,
        language: &str,
    ) -> Result<RecommendationResult, RecommendError> {
        let model = self.rotation.next_model();
        let messages = build_messages(answers, language, self.settings.track_count);

        debug!(
            provider = self.provider.name(),
            model = %model,
            answers = answers.len(),
            "Requesting recommendation"
        );

        let completion = self
            .provider
            .complete(&model, &messages, &self.settings.completion)
            .await
            .map_err(|e| {
                warn!(model = %model, "Recommendation request failed: {}", e);
                e
            })?;

        let result = parse_recommendation(&completion.content, self.settings.track_count)
            .map_err(|e| {
                warn!(model = %model, "Unusable model output: {}", e);
                e
            })?;

        info!(
            model = %model,
            guesses = result.tracks.len(),
            "Recommendation ready"
        );
        Ok(result)
    }
}
