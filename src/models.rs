//! Core data models for the chart lyrics pipeline.
//!
//! This module contains the record kinds persisted as snapshots, the provenance
//! tags attached to resolved lyrics, and the per-run statistics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::normalize::{has_text, normalize_lyrics, search_term};
use crate::reconcile::SnapshotRecord;

// ============================================================================
// Provenance
// ============================================================================

/// Which resolution strategy produced a lyric text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Metadata search with the full search term, then page scrape
    Genius,
    /// Metadata search with the simplified title, then page scrape
    GeniusSimplified,
    /// Secondary lyrics API with the full search term
    RapidApi,
    /// Secondary lyrics API with the simplified title
    RapidApiSimplified,
    /// Direct fetch of a known lyrics page
    GeniusPage,
}

impl Provenance {
    pub const ALL: [Provenance; 5] = [
        Provenance::Genius,
        Provenance::GeniusSimplified,
        Provenance::RapidApi,
        Provenance::RapidApiSimplified,
        Provenance::GeniusPage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Genius => "genius",
            Provenance::GeniusSimplified => "genius_simplified",
            Provenance::RapidApi => "rapidapi",
            Provenance::RapidApiSimplified => "rapidapi_simplified",
            Provenance::GeniusPage => "genius_page",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provenance::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown lyrics source '{}'", s))
    }
}

// ============================================================================
// Track Records
// ============================================================================

/// One distinct chart entry, keyed by `uri`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub uri: String,
    pub artist_names: String, // Comma-joined, credited order
    pub track_name: String,
    pub search_term: String, // simplified title + " by " + primary artist, lower-cased
}

impl TrackRecord {
    /// Build a record from raw chart columns, deriving the search term.
    pub fn from_chart(uri: &str, artist_names: &str, track_name: &str) -> Self {
        Self {
            uri: uri.to_string(),
            artist_names: artist_names.to_string(),
            track_name: track_name.to_string(),
            search_term: search_term(track_name, artist_names),
        }
    }
}

impl SnapshotRecord for TrackRecord {
    fn key(&self) -> &str {
        &self.uri
    }
}

// ============================================================================
// Metadata Records
// ============================================================================

/// One accepted hit from the lyrics metadata API, keyed by lyrics page `url`.
///
/// Everything besides `search_term`, `url` and `hit_idx` is opaque pass-through
/// data copied from the hit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub search_term: String,
    pub url: String,
    pub hit_idx: usize, // Rank of the hit in the search response
    pub genius_id: i64,
    pub api_path: Option<String>,
    pub artist_names: Option<String>,
    pub full_title: String,
    pub title: String,
    pub title_with_featured: Option<String>,
    pub language: Option<String>,
    pub lyrics_state: Option<String>,
    pub path: Option<String>,
    pub release_year: Option<i32>,
    pub release_month: Option<i32>,
    pub release_day: Option<i32>,
    pub release_date_for_display: Option<String>,
    pub header_image_url: Option<String>,
    pub header_image_thumbnail_url: Option<String>,
    pub song_art_image_url: Option<String>,
    pub song_art_image_thumbnail_url: Option<String>,
}

impl SnapshotRecord for MetadataRecord {
    fn key(&self) -> &str {
        &self.url
    }
}

/// Outcome of one metadata search, keyed by `search_term`.
///
/// Several terms may accept the same lyrics page while the metadata snapshot
/// keeps one record per `url`; this record keeps the link for every term.
/// `url == None` means "searched, no accepted hit" and is retried later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTermRecord {
    pub search_term: String,
    pub url: Option<String>,
}

impl SearchTermRecord {
    pub fn new(search_term: &str, url: Option<&str>) -> Self {
        Self {
            search_term: search_term.to_string(),
            url: url.map(str::to_string),
        }
    }
}

impl SnapshotRecord for SearchTermRecord {
    fn key(&self) -> &str {
        &self.search_term
    }

    fn is_resolved(&self) -> bool {
        has_text(self.url.as_deref())
    }

    fn normalize(&mut self) {
        self.url = self.url.take().filter(|url| !url.trim().is_empty());
    }
}

// ============================================================================
// Lyrics Records
// ============================================================================

/// Lyric text scraped for a lyrics page, keyed by `url`.
/// `lyrics == None` means "attempted, unresolved" and is retried on later runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsRecord {
    pub url: String,
    pub lyrics: Option<String>,
    pub lyrics_source: Option<Provenance>,
}

impl SnapshotRecord for LyricsRecord {
    fn key(&self) -> &str {
        &self.url
    }

    fn is_resolved(&self) -> bool {
        has_text(self.lyrics.as_deref())
    }

    fn normalize(&mut self) {
        self.lyrics = normalize_lyrics(self.lyrics.take());
        if self.lyrics.is_none() {
            self.lyrics_source = None;
        }
    }
}

/// Full resolver output for a chart track, keyed by `uri`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartLyricsRecord {
    pub uri: String,
    pub artist_names: String,
    pub track_name: String,
    pub search_term: String,
    pub lyrics_source: Option<Provenance>,
    pub lyrics: Option<String>,
}

impl ChartLyricsRecord {
    pub fn unresolved(track: &TrackRecord) -> Self {
        Self {
            uri: track.uri.clone(),
            artist_names: track.artist_names.clone(),
            track_name: track.track_name.clone(),
            search_term: track.search_term.clone(),
            lyrics_source: None,
            lyrics: None,
        }
    }

    /// Chart record carrying whatever `resolution` found for `track`.
    pub fn from_resolution(track: &TrackRecord, resolution: &Resolution) -> Self {
        Self {
            lyrics_source: resolution.provenance(),
            lyrics: resolution.lyrics().map(str::to_string),
            ..Self::unresolved(track)
        }
    }
}

impl SnapshotRecord for ChartLyricsRecord {
    fn key(&self) -> &str {
        &self.uri
    }

    fn is_resolved(&self) -> bool {
        has_text(self.lyrics.as_deref())
    }

    fn normalize(&mut self) {
        self.lyrics = normalize_lyrics(self.lyrics.take());
        if self.lyrics.is_none() {
            self.lyrics_source = None;
        }
    }
}

/// Chart track joined with its metadata url and page lyrics, keyed by `uri`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackLyricsRecord {
    pub uri: String,
    pub artist_names: String,
    pub track_name: String,
    pub search_term: String,
    pub url: Option<String>,
    pub lyrics: Option<String>,
    pub lyrics_source: Option<Provenance>,
}

impl SnapshotRecord for TrackLyricsRecord {
    fn key(&self) -> &str {
        &self.uri
    }

    fn is_resolved(&self) -> bool {
        has_text(self.lyrics.as_deref())
    }

    fn normalize(&mut self) {
        self.lyrics = normalize_lyrics(self.lyrics.take());
        if self.lyrics.is_none() {
            self.lyrics_source = None;
        }
    }
}

// ============================================================================
// Resolution Results
// ============================================================================

/// Outcome of one resolver invocation. Failing every strategy is not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        lyrics: String,
        provenance: Provenance,
        /// Accepted metadata hit, when a metadata strategy succeeded
        hit: Option<MetadataRecord>,
    },
    Unresolved {
        search_term: String,
    },
}

impl Resolution {
    pub fn lyrics(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { lyrics, .. } => Some(lyrics),
            Resolution::Unresolved { .. } => None,
        }
    }

    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            Resolution::Resolved { provenance, .. } => Some(*provenance),
            Resolution::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run statistics, logged at the end of every driver and optionally
/// written to a JSON file.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RunStats {
    pub snapshot_records: usize,
    pub work_set: usize,

    // Resolution outcomes
    pub resolved: usize,
    pub unresolved: usize,
    pub via_genius: usize,
    pub via_genius_simplified: usize,
    pub via_rapidapi: usize,
    pub via_rapidapi_simplified: usize,
    pub via_genius_page: usize,

    // Merge outcome
    pub added: usize,
    pub updated: usize,
    pub written: bool,

    // Timing
    pub elapsed_seconds: f64,
}

impl RunStats {
    /// Record one resolution outcome
    pub fn record(&mut self, resolution: &Resolution) {
        match resolution.provenance() {
            None => self.unresolved += 1,
            Some(provenance) => {
                self.resolved += 1;
                match provenance {
                    Provenance::Genius => self.via_genius += 1,
                    Provenance::GeniusSimplified => self.via_genius_simplified += 1,
                    Provenance::RapidApi => self.via_rapidapi += 1,
                    Provenance::RapidApiSimplified => self.via_rapidapi_simplified += 1,
                    Provenance::GeniusPage => self.via_genius_page += 1,
                }
            }
        }
    }

    /// Resolution rate over the work set as a percentage
    pub fn resolve_rate(&self) -> f64 {
        if self.work_set == 0 {
            0.0
        } else {
            100.0 * self.resolved as f64 / self.work_set as f64
        }
    }

    /// Log stats in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            tracing::info!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_round_trips_through_str() {
        for p in Provenance::ALL {
            assert_eq!(p.as_str().parse::<Provenance>(), Ok(p));
        }
        assert!("lyrics_ovh".parse::<Provenance>().is_err());
    }

    #[test]
    fn test_track_record_from_chart() {
        let track = TrackRecord::from_chart(
            "spotify:track:1",
            "The Weeknd, Ariana Grande",
            "Save Your Tears (with Ariana Grande) - Remix",
        );
        assert_eq!(track.search_term, "save your tears by the weeknd");
        assert_eq!(track.key(), "spotify:track:1");
    }

    #[test]
    fn test_lyrics_record_normalize_clears_source_for_empty_text() {
        let mut record = LyricsRecord {
            url: "u".to_string(),
            lyrics: Some(String::new()),
            lyrics_source: Some(Provenance::GeniusPage),
        };
        record.normalize();
        assert_eq!(record.lyrics, None);
        assert_eq!(record.lyrics_source, None);
        assert!(!record.is_resolved());
    }

    #[test]
    fn test_run_stats_record() {
        let mut stats = RunStats {
            work_set: 2,
            ..Default::default()
        };
        stats.record(&Resolution::Resolved {
            lyrics: "x".to_string(),
            provenance: Provenance::RapidApi,
            hit: None,
        });
        stats.record(&Resolution::Unresolved {
            search_term: "y".to_string(),
        });
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.via_rapidapi, 1);
        assert!((stats.resolve_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_chart_lyrics_from_resolution() {
        let track = TrackRecord::from_chart("spotify:track:1", "Bad Bunny", "DÁKITI");
        let resolved = ChartLyricsRecord::from_resolution(
            &track,
            &Resolution::Resolved {
                lyrics: "text".to_string(),
                provenance: Provenance::GeniusSimplified,
                hit: None,
            },
        );
        assert_eq!(resolved.lyrics_source, Some(Provenance::GeniusSimplified));
        assert_eq!(resolved.search_term, "dákiti by bad bunny");

        let unresolved = ChartLyricsRecord::from_resolution(
            &track,
            &Resolution::Unresolved {
                search_term: track.search_term.clone(),
            },
        );
        assert_eq!(unresolved, ChartLyricsRecord::unresolved(&track));
    }

    #[test]
    fn test_search_term_record_resolved_by_url() {
        let linked = SearchTermRecord::new("song by a", Some("https://genius.com/a-lyrics"));
        assert!(linked.is_resolved());
        let mut empty = SearchTermRecord::new("song by a", Some(""));
        empty.normalize();
        assert_eq!(empty.url, None);
        assert!(!empty.is_resolved());
    }
}
