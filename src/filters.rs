//! Guards applied to metadata search hits before one is accepted.
//!
//! Reproduced literally from the tuning done against the Genius search API:
//! - translation/platform attributions ("... by Genius English Translations")
//! - remix/mix cross-matches, unless the query itself asks for one
//! - lyrics page paths that are emulations or not lyrics pages at all

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::MetadataRecord;

// ============================================================================
// Regex Patterns
// ============================================================================

/// Attribution suffixes of accounts that host translations or platform copies.
pub static TRANSLATION_ATTRIBUTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bby\s+(?:genius|spotify|lyrxo)\b").unwrap()
});

pub static REMIX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bremix(?:ed)?\b").unwrap(),
        Regex::new(r"(?i)\bmix\b").unwrap(),
    ]
});

/// Path marker for emulated (non-original) lyric pages
pub const EMULATION_MARKER: &str = "emulation";

/// Marker every real lyrics page path carries
pub const LYRICS_MARKER: &str = "lyrics";

// ============================================================================
// Pattern Matching Helpers
// ============================================================================

pub fn is_translation(full_title: &str) -> bool {
    TRANSLATION_ATTRIBUTION.is_match(full_title)
}

pub fn has_remix_pattern(text: &str) -> bool {
    REMIX_PATTERNS.iter().any(|p| p.is_match(text))
}

pub fn has_unusable_path(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains(EMULATION_MARKER) || !lower.contains(LYRICS_MARKER)
}

// ============================================================================
// Hit Acceptance
// ============================================================================

/// Why a hit was skipped. Logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Translation,
    UnrequestedRemix,
    UnusablePath,
}

/// Check one hit. `remix_requested` is true when the original query
/// (search term or raw track name) itself mentions a remix or mix.
pub fn check_hit(hit: &MetadataRecord, remix_requested: bool) -> Result<(), RejectReason> {
    if is_translation(&hit.full_title) {
        return Err(RejectReason::Translation);
    }
    // Title only: artist names like "Little Mix" must not trip the guard
    if !remix_requested && has_remix_pattern(&hit.title) {
        return Err(RejectReason::UnrequestedRemix);
    }
    if has_unusable_path(&hit.url) {
        return Err(RejectReason::UnusablePath);
    }
    Ok(())
}

/// First (lowest index) hit surviving every guard.
pub fn first_accepted(hits: &[MetadataRecord], remix_requested: bool) -> Option<&MetadataRecord> {
    hits.iter().find(|hit| match check_hit(hit, remix_requested) {
        Ok(()) => true,
        Err(reason) => {
            tracing::debug!("skipping hit {} ({:?})", hit.url, reason);
            false
        }
    })
}
