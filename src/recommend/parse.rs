//! Parsing of the model output into a [`RecommendationResult`].
//!
//! Accepted shapes: the full `{summary, vibe_stats, tracks}` object, an object
//! with a `songs` list, or a bare array of guesses. Markdown fences around the
//! JSON are tolerated.

use super::{RecommendationResult, SongGuess, VibeStat};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("model output has an unexpected shape: {0}")]
    UnexpectedShape(String),

    #[error("model output contains no usable song guesses")]
    NoGuesses,
}

const TRACK_KEYS: [&str; 4] = ["track", "title", "name", "song"];

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn string_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn parse_guess(value: &Value) -> Option<SongGuess> {
    let object = value.as_object()?;
    let artist = string_field(object, &["artist", "artist_name"]).or_else(|| {
        // {"artists": ["A", "B"]} takes the lead artist.
        object
            .get("artists")
            .and_then(Value::as_array)
            .and_then(|artists| artists.first())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })?;
    let track = string_field(object, &TRACK_KEYS)?;
    Some(SongGuess {
        artist: artist.to_string(),
        track: track.to_string(),
    })
}

fn parse_guesses(values: &[Value], max_tracks: usize) -> Vec<SongGuess> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter_map(parse_guess)
        .filter(|guess| seen.insert(guess.dedup_key()))
        .take(max_tracks)
        .collect()
}

fn parse_stats(value: Option<&Value>) -> Vec<VibeStat> {
    let Some(stats) = value.and_then(Value::as_array) else {
        return vec![];
    };
    stats
        .iter()
        .filter_map(|stat| {
            let object = stat.as_object()?;
            let name = string_field(object, &["name", "label"])?;
            let value = match object.get("value")? {
                Value::Number(n) => n.as_f64()?,
                Value::String(s) => s.trim().trim_end_matches('%').parse().ok()?,
                _ => return None,
            };
            Some(VibeStat {
                name: name.to_string(),
                value: value.clamp(0.0, 100.0),
            })
        })
        .collect()
}

pub fn parse_recommendation(
    text: &str,
    max_tracks: usize,
) -> Result<RecommendationResult, ParseError> {
    let json = strip_code_fences(text);
    let value: Value =
        serde_json::from_str(json).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let result = match value {
        Value::Array(items) => RecommendationResult {
            summary: String::new(),
            vibe_stats: vec![],
            tracks: parse_guesses(&items, max_tracks),
        },
        Value::Object(object) => {
            let tracks = object
                .get("tracks")
                .or_else(|| object.get("songs"))
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ParseError::UnexpectedShape("missing \"tracks\" array".to_string())
                })?;
            RecommendationResult {
                summary: string_field(&object, &["summary"])
                    .unwrap_or_default()
                    .to_string(),
                vibe_stats: parse_stats(object.get("vibe_stats")),
                tracks: parse_guesses(tracks, max_tracks),
            }
        }
        other => {
            return Err(ParseError::UnexpectedShape(format!(
                "expected an object or an array, got {}",
                match other {
                    Value::Null => "null",
                    Value::Bool(_) => "a boolean",
                    Value::Number(_) => "a number",
                    _ => "a string",
                }
            )))
        }
    };

    if result.tracks.is_empty() {
        return Err(ParseError::NoGuesses);
    }
    Ok(result)
}
