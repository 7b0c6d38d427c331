//! Search query construction from a song guess.

use crate::recommend::SongGuess;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BRACKETED: Regex = Regex::new(r"\s*(\([^)]*\)|\[[^\]]*\])").unwrap();
    static ref FEATURING: Regex =
        Regex::new(r"(?i)\s*(,\s*)?\b(feat\.?|ft\.?|featuring)(\s+.*)?$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Drops `(...)`/`[...]` groups and any `feat.`/`ft.` credit, collapsing
/// whitespace. Falls back to the trimmed input when nothing would be left.
pub fn normalize_term(term: &str) -> String {
    let stripped = BRACKETED.replace_all(term, "");
    let stripped = FEATURING.replace(&stripped, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    if collapsed.is_empty() {
        WHITESPACE.replace_all(term.trim(), " ").into_owned()
    } else {
        collapsed.into_owned()
    }
}

/// Field-filtered catalog query, e.g. `track:Creep artist:Radiohead`.
pub fn build_query(guess: &SongGuess, normalize: bool) -> String {
    let (track, artist) = if normalize {
        (normalize_term(&guess.track), normalize_term(&guess.artist))
    } else {
        (guess.track.trim().to_string(), guess.artist.trim().to_string())
    };
    format!("track:{} artist:{}", track, artist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bracketed_suffixes() {
        assert_eq!(normalize_term("Blinding Lights (Remastered 2020)"), "Blinding Lights");
        assert_eq!(normalize_term("Creep [Live] (Acoustic)"), "Creep");
        assert_eq!(normalize_term("Intro (Part 1) Reprise"), "Intro Reprise");
    }

    #[test]
    fn strips_featuring_credits() {
        assert_eq!(normalize_term("Stay feat. Justin Bieber"), "Stay");
        assert_eq!(normalize_term("Stay ft Justin Bieber"), "Stay");
        assert_eq!(normalize_term("Drake, Featuring Rihanna"), "Drake");
        assert_eq!(normalize_term("Song (feat. Someone)"), "Song");
    }

    #[test]
    fn leaves_words_containing_feat_alone() {
        assert_eq!(normalize_term("Defeat the Night"), "Defeat the Night");
        assert_eq!(normalize_term("Left Foot"), "Left Foot");
    }

    #[test]
    fn keeps_input_when_everything_would_be_stripped() {
        assert_eq!(normalize_term("  (Interlude) "), "(Interlude)");
    }

    #[test]
    fn builds_field_filtered_query() {
        let guess = SongGuess::new("Daft Punk feat. Pharrell", "Get Lucky (Radio Edit)");
        assert_eq!(build_query(&guess, true), "track:Get Lucky artist:Daft Punk");
        assert_eq!(
            build_query(&guess, false),
            "track:Get Lucky (Radio Edit) artist:Daft Punk feat. Pharrell"
        );
    }
}
