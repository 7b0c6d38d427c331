//! Soft quota spreading across a list of model identifiers.
//!
//! The decision is a pure function of the current state and the current time,
//! [`RotationState::advance`]; [`ModelRotation`] only owns the state.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RotationPolicy {
    pub models: Vec<String>,
    /// Calls served by a model before moving to the next one.
    pub calls_per_model: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationState {
    pub day: NaiveDate,
    pub index: usize,
    pub calls: u32,
}

impl RotationState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            day: now.date_naive(),
            index: 0,
            calls: 0,
        }
    }

    /// Accounts one call made at `now`, returning the next state and the
    /// index of the model that serves the call.
    ///
    /// A new UTC day restarts from the first model. Once a model has served
    /// `calls_per_model` calls the next one takes over, wrapping around.
    pub fn advance(&self, now: DateTime<Utc>, policy: &RotationPolicy) -> (RotationState, usize) {
        let model_count = policy.models.len().max(1);
        let today = now.date_naive();

        let mut next = if today != self.day {
            RotationState::new(now)
        } else {
            *self
        };

        if next.index >= model_count {
            next.index = 0;
            next.calls = 0;
        }

        if policy.calls_per_model > 0 && next.calls >= policy.calls_per_model {
            next.index = (next.index + 1) % model_count;
            next.calls = 0;
        }

        next.calls += 1;
        (next, next.index)
    }
}

/// Process-wide rotation context handed to the recommender.
pub struct ModelRotation {
    policy: RotationPolicy,
    state: Mutex<RotationState>,
}

impl ModelRotation {
    pub fn new(policy: RotationPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(RotationState::new(Utc::now())),
        }
    }

    /// Picks the model for a call happening now.
    pub fn next_model(&self) -> String {
        self.next_model_at(Utc::now())
    }

    pub fn next_model_at(&self, now: DateTime<Utc>) -> String {
        // A poisoned lock only means a panic mid-update of plain counters.
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let (next, index) = state.advance(now, &self.policy);
        *state = next;
        self.policy
            .models
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> RotationState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
