//! Genius search API client.
//!
//! Only the fields copied into [`MetadataRecord`] are read; `url`, `title`,
//! `full_title` and `id` are required on every hit, and a response missing
//! them is reported as malformed.

use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::MetadataRecord;
use crate::resolver::MetadataSearch;

pub const GENIUS_API_BASE: &str = "https://api.genius.com";

// ============================================================================
// Wire Format
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    result: HitResult,
}

#[derive(Debug, Deserialize)]
struct HitResult {
    id: i64,
    url: String,
    title: String,
    full_title: String,
    api_path: Option<String>,
    artist_names: Option<String>,
    title_with_featured: Option<String>,
    language: Option<String>,
    lyrics_state: Option<String>,
    path: Option<String>,
    release_date_components: Option<ReleaseDateComponents>,
    release_date_for_display: Option<String>,
    header_image_url: Option<String>,
    header_image_thumbnail_url: Option<String>,
    song_art_image_url: Option<String>,
    song_art_image_thumbnail_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReleaseDateComponents {
    year: Option<i32>,
    month: Option<i32>,
    day: Option<i32>,
}

impl HitResult {
    fn into_record(self, search_term: &str, hit_idx: usize) -> MetadataRecord {
        let date = self.release_date_components.unwrap_or_default();
        MetadataRecord {
            search_term: search_term.to_string(),
            url: self.url,
            hit_idx,
            genius_id: self.id,
            api_path: self.api_path,
            artist_names: self.artist_names,
            full_title: self.full_title,
            title: self.title,
            title_with_featured: self.title_with_featured,
            language: self.language,
            lyrics_state: self.lyrics_state,
            path: self.path,
            release_year: date.year,
            release_month: date.month,
            release_day: date.day,
            release_date_for_display: self.release_date_for_display,
            header_image_url: self.header_image_url,
            header_image_thumbnail_url: self.header_image_thumbnail_url,
            song_art_image_url: self.song_art_image_url,
            song_art_image_thumbnail_url: self.song_art_image_thumbnail_url,
        }
    }
}

/// Parse a search response body into ranked metadata records.
pub fn parse_hits(search_term: &str, body: &str) -> Result<Vec<MetadataRecord>, serde_json::Error> {
    let envelope: SearchEnvelope = serde_json::from_str(body)?;
    Ok(envelope
        .response
        .hits
        .into_iter()
        .enumerate()
        .map(|(idx, hit)| hit.result.into_record(search_term, idx))
        .collect())
}

// ============================================================================
// Client
// ============================================================================

pub struct GeniusClient {
    http: Arc<HttpClient>,
    base_url: String,
    token: String,
}

impl GeniusClient {
    pub fn new(http: Arc<HttpClient>, base_url: &str, token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }
}

impl MetadataSearch for GeniusClient {
    fn search(&self, query: &str) -> Result<Vec<MetadataRecord>, FetchError> {
        let url = format!("{}/search", self.base_url);
        let auth = format!("Bearer {}", self.token);
        let response = self
            .http
            .get(&url, &[("Authorization", auth.as_str())], &[("q", query)])?;
        let body = response.into_string().map_err(|e| FetchError::Malformed {
            url: url.clone(),
            detail: e.to_string(),
        })?;
        parse_hits(query, &body).map_err(|e| FetchError::Malformed {
            url,
            detail: e.to_string(),
        })
    }
}
