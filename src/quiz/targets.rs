use super::QuizAnswers;
use serde::Serialize;

const NEUTRAL: f64 = 0.5;
const SCALE_MAX: f64 = 10.0;

/// Numeric audio-feature targets derived from the scale questions.
///
/// Every value is in `[0, 1]`; a missing or unreadable answer leaves the
/// neutral 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VibeTargets {
    pub energy: f64,
    pub valence: f64,
    pub danceability: f64,
    pub acousticness: f64,
}

impl Default for VibeTargets {
    fn default() -> Self {
        Self {
            energy: NEUTRAL,
            valence: NEUTRAL,
            danceability: NEUTRAL,
            acousticness: NEUTRAL,
        }
    }
}

fn scale_target(answers: &QuizAnswers, key: &str) -> Option<f64> {
    let value = answers.get(key)?.as_scale()?;
    if !value.is_finite() {
        return None;
    }
    Some((value / SCALE_MAX).clamp(0.0, 1.0))
}

impl VibeTargets {
    pub fn from_answers(answers: &QuizAnswers) -> Self {
        let mut targets = Self::default();
        if let Some(energy) = scale_target(answers, "energy") {
            targets.energy = energy;
        }
        if let Some(valence) = scale_target(answers, "positivity") {
            targets.valence = valence;
        }
        // The library/party axis drives both: parties are danceable, libraries acoustic.
        if let Some(crowd) = scale_target(answers, "crowd") {
            targets.danceability = crowd;
            targets.acousticness = 1.0 - crowd;
        }
        targets
    }
}
