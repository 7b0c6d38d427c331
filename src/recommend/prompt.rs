use crate::llm::Message;
use crate::quiz::{QuizAnswers, VibeTargets};

pub const SYSTEM_INSTRUCTION: &str = "You are Fabergé, an elite music curator. \
Analyze vibe paragraphs and return ONLY valid JSON. Never add commentary, \
Markdown or code fences. Only suggest songs that exist on major streaming services.";

/// Keys the narrative paragraph knows how to phrase; anything else is listed verbatim.
const NARRATED_KEYS: [&str; 5] = ["genre", "era", "mood", "setting", "discovery"];

/// Scale answers already expressed through [`VibeTargets`].
const TARGET_KEYS: [&str; 3] = ["energy", "positivity", "crowd"];

pub fn language_name(tag: &str) -> &str {
    match tag.trim().to_ascii_lowercase().as_str() {
        "" | "en" => "English",
        "hi" => "Hindi",
        "ta" => "Tamil",
        "te" => "Telugu",
        "kn" => "Kannada",
        "ml" => "Malayalam",
        "bn" => "Bengali",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "ja" => "Japanese",
        "ko" => "Korean",
        "pt" => "Portuguese",
        _ => tag.trim(),
    }
}

fn answer_or(answers: &QuizAnswers, key: &str, fallback: &str) -> String {
    answers
        .get(key)
        .filter(|a| !a.is_blank())
        .map(|a| a.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

/// Turns the quiz answers into the paragraph the model analyzes.
pub fn vibe_paragraph(answers: &QuizAnswers, language: &str) -> String {
    let mut paragraph = format!(
        "The user wants a {} sound from {}. They are in a {} mood, listening during {}. \
They want {} and the language must be {}.",
        answer_or(answers, "genre", "genre-fluid"),
        answer_or(answers, "era", "any era"),
        answer_or(answers, "mood", "neutral"),
        answer_or(answers, "setting", "their day"),
        answer_or(answers, "discovery", "a healthy mix of familiar and new"),
        language_name(language),
    );

    let extras: Vec<String> = answers
        .iter()
        .filter(|(key, value)| {
            !NARRATED_KEYS.contains(&key.as_str())
                && !TARGET_KEYS.contains(&key.as_str())
                && !value.is_blank()
        })
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect();
    if !extras.is_empty() {
        paragraph.push_str(&format!(" Other preferences: {}.", extras.join("; ")));
    }

    let targets = VibeTargets::from_answers(answers);
    paragraph.push_str(&format!(
        " Target audio profile (0 to 1): energy {:.2}, valence {:.2}, danceability {:.2}, acousticness {:.2}.",
        targets.energy, targets.valence, targets.danceability, targets.acousticness
    ));

    paragraph
}

pub fn build_messages(answers: &QuizAnswers, language: &str, track_count: usize) -> Vec<Message> {
    let prompt = format!(
        r#"ANALYSIS: {paragraph}

TASK: Return a {track_count}-track playlist in JSON:
{{
  "summary": "A 1-sentence poetic summary.",
  "vibe_stats": [{{"name": "Nostalgia", "value": 25}}, ...],
  "tracks": [{{"artist": "Name", "track": "Title"}}, ...]
}}
"vibe_stats" holds 3 to 5 categories whose values are percentages adding up to 100."#,
        paragraph = vibe_paragraph(answers, language),
        track_count = track_count,
    );

    vec![Message::system(SYSTEM_INSTRUCTION), Message::user(prompt)]
}
