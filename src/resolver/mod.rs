//! Bulk best-effort resolution of song guesses into catalog tracks.
//!
//! Every guess gets exactly one search, run inside a bounded task group:
//! at most `max_in_flight` searches are in flight, each is cut off after
//! `request_timeout`, and the group as a whole is joined under
//! `overall_deadline`. Tasks still pending at the deadline are aborted.
//! Failures never escape; they are recorded per input index.

mod normalize;

pub use normalize::{build_query, normalize_term};

use crate::recommend::SongGuess;
use crate::spotify::{MusicPlatform, PlatformError, ResolvedTrack};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Upper bound on concurrent searches, whatever the settings ask for.
pub const MAX_IN_FLIGHT: usize = 64;

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub max_in_flight: usize,
    pub request_timeout: Duration,
    pub overall_deadline: Duration,
    pub normalize: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 15,
            request_timeout: Duration::from_secs(5),
            overall_deadline: Duration::from_secs(30),
            normalize: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuessOutcome {
    Resolved(ResolvedTrack),
    /// The search succeeded with zero hits.
    NoMatch,
    /// Non-success status, transport error or unusable payload.
    Failed(String),
    /// The search outlived the per-request timeout.
    TimedOut,
    /// The task was still pending at the overall deadline, or died.
    NotReturned,
}

impl GuessOutcome {
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            GuessOutcome::Resolved(_) => None,
            GuessOutcome::NoMatch => Some("no_match"),
            GuessOutcome::Failed(_) => Some("search_failed"),
            GuessOutcome::TimedOut => Some("timed_out"),
            GuessOutcome::NotReturned => Some("not_returned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedGuess {
    pub artist: String,
    pub track: String,
    pub reason: &'static str,
}

/// One outcome per input guess, at the guess's index.
#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    outcomes: Vec<GuessOutcome>,
}

impl ResolutionReport {
    pub fn outcomes(&self) -> &[GuessOutcome] {
        &self.outcomes
    }

    pub fn resolved_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, GuessOutcome::Resolved(_)))
            .count()
    }

    /// Guesses that produced no track, with the reason. `guesses` must be
    /// the slice the report was built from.
    pub fn unresolved(&self, guesses: &[SongGuess]) -> Vec<UnresolvedGuess> {
        self.outcomes
            .iter()
            .zip(guesses)
            .filter_map(|(outcome, guess)| {
                outcome.reason().map(|reason| UnresolvedGuess {
                    artist: guess.artist.clone(),
                    track: guess.track.clone(),
                    reason,
                })
            })
            .collect()
    }

    /// The resolved tracks, in the order the guesses came in.
    pub fn into_tracks(self) -> Vec<ResolvedTrack> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                GuessOutcome::Resolved(track) => Some(track),
                _ => None,
            })
            .collect()
    }
}

pub struct TrackResolver {
    platform: Arc<dyn MusicPlatform>,
    settings: ResolverSettings,
}

impl TrackResolver {
    pub fn new(platform: Arc<dyn MusicPlatform>, settings: ResolverSettings) -> Self {
        Self { platform, settings }
    }

    pub async fn resolve(&self, token: &str, guesses: &[SongGuess]) -> ResolutionReport {
        if guesses.is_empty() {
            return ResolutionReport::default();
        }

        let permits = self.settings.max_in_flight.clamp(1, MAX_IN_FLIGHT);
        let semaphore = Arc::new(Semaphore::new(permits));
        let token: Arc<str> = Arc::from(token);
        let request_timeout = self.settings.request_timeout;
        let mut tasks = JoinSet::new();

        for (index, guess) in guesses.iter().enumerate() {
            let query = build_query(guess, self.settings.normalize);
            let platform = Arc::clone(&self.platform);
            let semaphore = Arc::clone(&semaphore);
            let token = Arc::clone(&token);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, GuessOutcome::NotReturned);
                };
                let outcome =
                    match tokio::time::timeout(request_timeout, platform.search_track(&token, &query))
                        .await
                    {
                        Ok(Ok(Some(track))) => GuessOutcome::Resolved(track),
                        Ok(Ok(None)) => GuessOutcome::NoMatch,
                        Ok(Err(PlatformError::Timeout)) => GuessOutcome::TimedOut,
                        Ok(Err(e)) => GuessOutcome::Failed(e.to_string()),
                        Err(_) => GuessOutcome::TimedOut,
                    };
                debug!(index, query = %query, outcome = ?outcome.reason(), "Search finished");
                (index, outcome)
            });
        }

        let mut outcomes = vec![GuessOutcome::NotReturned; guesses.len()];
        let deadline = tokio::time::Instant::now() + self.settings.overall_deadline;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, outcome)))) => outcomes[index] = outcome,
                Ok(Some(Err(e))) => warn!("Search task did not complete: {}", e),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        pending = tasks.len(),
                        "Resolution deadline reached, aborting remaining searches"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        let report = ResolutionReport { outcomes };
        info!(
            guesses = guesses.len(),
            resolved = report.resolved_count(),
            "Resolution finished"
        );
        report
    }
}
