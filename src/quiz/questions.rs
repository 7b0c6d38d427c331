use serde::Serialize;

/// A quiz question as served by `GET /questions`.
///
/// Option questions carry `options`; scale questions (1 to 10) carry the
/// `min`/`max` labels instead.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub text: &'static str,
    #[serde(skip_serializing_if = "has_no_options")]
    pub options: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<&'static str>,
}

fn has_no_options(options: &&'static [&'static str]) -> bool {
    options.is_empty()
}

impl Question {
    const fn choice(id: &'static str, text: &'static str, options: &'static [&'static str]) -> Self {
        Question {
            id,
            text,
            options,
            min: None,
            max: None,
        }
    }

    const fn scale(id: &'static str, text: &'static str, min: &'static str, max: &'static str) -> Self {
        Question {
            id,
            text,
            options: &[],
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn is_scale(&self) -> bool {
        self.min.is_some()
    }
}

static QUESTIONS: [Question; 10] = [
    Question::choice(
        "genre",
        "Pick the sound you're chasing right now.",
        &[
            "Indie / Alternative",
            "Hip-Hop / Rap",
            "Electronic / Dance",
            "Pop",
            "Rock / Metal",
            "Lo-fi / Chill",
        ],
    ),
    Question::choice(
        "era",
        "Which era should the playlist live in?",
        &[
            "70s classics",
            "80s synth",
            "90s golden age",
            "2000s throwbacks",
            "2010s",
            "Fresh releases",
        ],
    ),
    Question::choice(
        "mood",
        "How are you feeling?",
        &[
            "Euphoric",
            "Melancholic",
            "Focused",
            "Romantic",
            "Restless",
            "Nostalgic",
        ],
    ),
    Question::choice(
        "setting",
        "Where will this be playing?",
        &[
            "Late-night drive",
            "Workout",
            "Deep work session",
            "House party",
            "Rainy afternoon",
            "Sunday morning",
        ],
    ),
    Question::choice(
        "discovery",
        "How adventurous should we be?",
        &[
            "Only the hits",
            "Mostly familiar",
            "A healthy mix",
            "Hidden gems",
            "Deep underground",
            "Surprise me",
        ],
    ),
    Question::scale(
        "energy",
        "What's the vibe? (1: Low Energy, 10: High Energy)",
        "Zombie",
        "Nuclear",
    ),
    Question::scale(
        "positivity",
        "Mood level? (1: Sad/Reflective, 10: Pure Joy)",
        "Deep Blue",
        "Sunshine",
    ),
    Question::scale(
        "crowd",
        "In a library or at a party? (1: Library, 10: Party)",
        "Library",
        "Party",
    ),
    Question::choice(
        "vocals",
        "Vocals or no vocals?",
        &[
            "Big vocals",
            "Soft vocals",
            "Rap verses",
            "Mostly instrumental",
            "Fully instrumental",
            "Don't care",
        ],
    ),
    Question::choice(
        "tempo",
        "Pick a tempo.",
        &[
            "Slow burn",
            "Laid back",
            "Mid-tempo groove",
            "Upbeat",
            "Fast and loud",
            "All over the place",
        ],
    ),
];

/// The fixed question set, in display order.
pub fn question_set() -> &'static [Question] {
    &QUESTIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn question_ids_are_unique() {
        let ids: HashSet<_> = question_set().iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), question_set().len());
    }

    #[test]
    fn every_question_has_options_or_scale_labels() {
        for question in question_set() {
            if question.is_scale() {
                assert!(question.options.is_empty(), "{}", question.id);
                assert!(question.max.is_some(), "{}", question.id);
            } else {
                assert_eq!(question.options.len(), 6, "{}", question.id);
            }
        }
    }

    #[test]
    fn scale_questions_serialize_without_options() {
        let scale = question_set().iter().find(|q| q.id == "energy").unwrap();
        let json = serde_json::to_value(scale).unwrap();
        assert!(json.get("options").is_none());
        assert_eq!(json["min"], "Zombie");

        let choice = question_set().iter().find(|q| q.id == "genre").unwrap();
        let json = serde_json::to_value(choice).unwrap();
        assert!(json.get("min").is_none());
        assert_eq!(json["options"].as_array().unwrap().len(), 6);
    }
}
