//! Shared normalization functions for chart tracks and lyrics payloads.
//! Used by the search-term builder, the resolver fallbacks, and every snapshot loader.
//!
//! CRITICAL: search terms are snapshot join keys. Changing these rules orphans
//! previously persisted metadata rows. Run tests after changes.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Parenthetical asides: "(feat. X)", "(Remix)", "(A) (B)"
pub static PAREN_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// Bracketed asides: "[Remaster]", "[Live]"
pub static BRACKET_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

/// Regex to collapse runs of whitespace into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Subtitle delimiter. Only the first occurrence splits.
pub const SUBTITLE_DELIMITER: &str = " - ";

/// Joins the simplified title and the primary artist in a search term.
pub const SEARCH_TERM_JOINER: &str = " by ";

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Simplify a track title for searching.
///
/// Applied in a fixed sequence:
/// 1. keep the part left of the first `" - "`
/// 2. drop every `(...)` span
/// 3. drop every `[...]` span
/// 4. collapse whitespace and trim
/// 5. lower-case
///
/// e.g. "Title - Subtitle (feat. X) [Remaster]" → "title"
pub fn simplify_track_title(title: &str) -> String {
    let head = title
        .split_once(SUBTITLE_DELIMITER)
        .map_or(title, |(left, _)| left);
    let result = PAREN_SPAN.replace_all(head, "");
    let result = BRACKET_SPAN.replace_all(&result, "");
    MULTI_SPACE
        .replace_all(&result, " ")
        .trim()
        .to_lowercase()
}

/// Extract the primary (first) artist from a comma-joined artist list.
/// e.g., "Bad Bunny, Jhay Cortez" → "Bad Bunny"
pub fn primary_artist(artist_names: &str) -> &str {
    artist_names
        .split(',')
        .next()
        .map(str::trim)
        .unwrap_or_default()
}

/// Build the lower-cased search term for a chart track:
/// simplified title + " by " + primary artist.
pub fn search_term(track_name: &str, artist_names: &str) -> String {
    let artist = primary_artist(artist_names);
    let term = format!("{}{}{}", simplify_track_title(track_name), SEARCH_TERM_JOINER, artist);
    MULTI_SPACE.replace_all(&term, " ").trim().to_lowercase()
}

/// Normalize a nullable lyrics payload: empty or whitespace-only text becomes `None`.
pub fn normalize_lyrics(lyrics: Option<String>) -> Option<String> {
    lyrics.filter(|text| !text.trim().is_empty())
}

/// True when the payload carries usable lyric text.
pub fn has_text(lyrics: Option<&str>) -> bool {
    lyrics.is_some_and(|text| !text.trim().is_empty())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_track_title_full_sequence() {
        assert_eq!(
            simplify_track_title("Title - Subtitle (feat. X) [Remaster]"),
            "title"
        );
    }

    #[test]
    fn test_simplify_track_title_multiple_parens() {
        assert_eq!(simplify_track_title("Song (A) (B)"), "song");
        assert_eq!(simplify_track_title("Song (A) Middle (B) End"), "song middle end");
    }

    #[test]
    fn test_simplify_track_title_only_first_delimiter() {
        assert_eq!(simplify_track_title("A - B - C"), "a");
        // Hyphen without spaces is part of the title
        assert_eq!(simplify_track_title("Jay-Z Song"), "jay-z song");
    }

    #[test]
    fn test_simplify_track_title_brackets_and_whitespace() {
        assert_eq!(simplify_track_title("  Save  Your   Tears [Live] "), "save your tears");
        assert_eq!(simplify_track_title("LA CANCIÓN"), "la canción");
    }

    #[test]
    fn test_primary_artist() {
        assert_eq!(primary_artist("Bad Bunny, Jhay Cortez"), "Bad Bunny");
        assert_eq!(primary_artist("The Weeknd"), "The Weeknd");
        assert_eq!(primary_artist(""), "");
    }

    #[test]
    fn test_search_term() {
        assert_eq!(
            search_term("Save Your Tears (Remix)", "The Weeknd, Ariana Grande"),
            "save your tears by the weeknd"
        );
        assert_eq!(
            search_term("Dákiti - Remastered", "Bad Bunny,Jhay Cortez"),
            "dákiti by bad bunny"
        );
    }

    #[test]
    fn test_normalize_lyrics() {
        assert_eq!(normalize_lyrics(Some(String::new())), None);
        assert_eq!(normalize_lyrics(Some("  \n".to_string())), None);
        assert_eq!(normalize_lyrics(None), None);
        assert_eq!(
            normalize_lyrics(Some("la la".to_string())),
            Some("la la".to_string())
        );
    }

    #[test]
    fn test_has_text() {
        assert!(has_text(Some("x")));
        assert!(!has_text(Some("")));
        assert!(!has_text(None));
    }
}
