//! Lyrics resolution strategy chain.
//!
//! Strategies run in order and stop at the first one yielding lyric text:
//!
//! 1. metadata search with the full search term, then page scrape
//! 2. metadata search with the simplified title, then page scrape
//! 3. secondary lyrics API with the full search term
//! 4. secondary lyrics API with the simplified title
//!
//! Upstream failures never escape: a failed call only means the strategy
//! produced nothing. Exhausting the chain yields [`Resolution::Unresolved`].

use std::sync::Arc;
use tracing::debug;

use crate::error::FetchError;
use crate::filters::{first_accepted, has_remix_pattern};
use crate::genius::GeniusClient;
use crate::http::HttpClient;
use crate::models::{MetadataRecord, Provenance, Resolution, TrackRecord};
use crate::normalize::simplify_track_title;
use crate::page::{PageFetcher, PageLyrics};
use crate::rapidapi::RapidApiClient;

// ============================================================================
// Upstream Seams
// ============================================================================

/// Lyrics metadata search (ranked hits for a free-text query).
pub trait MetadataSearch: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<MetadataRecord>, FetchError>;
}

/// Lyrics page fetch and extraction.
pub trait LyricsPageSource: Send + Sync {
    fn fetch_page(&self, url: &str) -> Result<PageLyrics, FetchError>;
}

/// Secondary lyrics API (search, then fetch by the top result).
pub trait SecondaryLyrics: Send + Sync {
    fn find_lyrics(&self, query: &str) -> Result<Option<String>, FetchError>;
}

// ============================================================================
// Queries
// ============================================================================

/// What to resolve.
#[derive(Debug, Clone, Copy)]
pub enum LyricsQuery<'a> {
    /// Chart track: full search term plus the raw track title
    Search { search_term: &'a str, title: &'a str },
    /// Known lyrics page
    Page { url: &'a str },
}

/// Credentials and endpoints for building a resolver from configuration.
#[derive(Debug, Clone, Default)]
pub struct ResolverSettings {
    pub genius_base_url: String,
    pub genius_token: Option<String>,
    pub rapidapi_host: Option<String>,
    pub rapidapi_base_url: Option<String>,
    pub rapidapi_key: Option<String>,
}

// ============================================================================
// Resolver
// ============================================================================

pub struct LyricsResolver {
    metadata: Option<Box<dyn MetadataSearch>>,
    pages: Box<dyn LyricsPageSource>,
    secondary: Option<Box<dyn SecondaryLyrics>>,
}

impl LyricsResolver {
    pub fn new(pages: Box<dyn LyricsPageSource>) -> Self {
        Self {
            metadata: None,
            pages,
            secondary: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Box<dyn MetadataSearch>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_secondary(mut self, secondary: Box<dyn SecondaryLyrics>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Wire the real upstream clients. Missing credentials disable the
    /// strategies that need them.
    pub fn from_settings(settings: &ResolverSettings, http: Arc<HttpClient>) -> Self {
        let mut resolver = Self::new(Box::new(PageFetcher::new(Arc::clone(&http))));

        match settings.genius_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => {
                resolver = resolver.with_metadata(Box::new(GeniusClient::new(
                    Arc::clone(&http),
                    &settings.genius_base_url,
                    token,
                )));
            }
            None => {
                tracing::warn!("GENIUS_ACCESS_TOKEN not set: metadata search strategies disabled")
            }
        }

        let key = settings.rapidapi_key.as_deref().filter(|k| !k.is_empty());
        match (key, settings.rapidapi_host.as_deref()) {
            (Some(key), Some(host)) => {
                resolver = resolver.with_secondary(Box::new(RapidApiClient::new(
                    http,
                    host,
                    key,
                    settings.rapidapi_base_url.as_deref(),
                )));
            }
            (Some(_), None) => {
                tracing::warn!("RAPID_API_HOST not set: secondary lyrics API disabled")
            }
            (None, _) => tracing::warn!("RAPID_API_KEY not set: secondary lyrics API disabled"),
        }

        resolver
    }

    pub fn has_metadata_search(&self) -> bool {
        self.metadata.is_some()
    }

    /// Run the strategy chain for one query.
    pub fn resolve(&self, query: LyricsQuery<'_>) -> Resolution {
        match query {
            LyricsQuery::Page { url } => match self.page_text(url) {
                Some(lyrics) => Resolution::Resolved {
                    lyrics,
                    provenance: Provenance::GeniusPage,
                    hit: None,
                },
                None => Resolution::Unresolved {
                    search_term: url.to_string(),
                },
            },
            LyricsQuery::Search { search_term, title } => self.resolve_search(search_term, title),
        }
    }

    fn resolve_search(&self, search_term: &str, title: &str) -> Resolution {
        let remix_requested = has_remix_pattern(search_term) || has_remix_pattern(title);
        let simplified = simplify_track_title(title);

        if let Some(resolution) =
            self.via_metadata(search_term, remix_requested, Provenance::Genius)
        {
            return resolution;
        }
        if let Some(resolution) =
            self.via_metadata(&simplified, remix_requested, Provenance::GeniusSimplified)
        {
            return resolution;
        }
        if let Some(resolution) = self.via_secondary(search_term, Provenance::RapidApi) {
            return resolution;
        }
        if let Some(resolution) = self.via_secondary(&simplified, Provenance::RapidApiSimplified) {
            return resolution;
        }

        debug!("all strategies failed for '{}'", search_term);
        Resolution::Unresolved {
            search_term: search_term.to_string(),
        }
    }

    /// Search hits for `query` and return the first one passing the guards.
    pub fn find_hit(&self, query: &str, remix_requested: bool) -> Option<MetadataRecord> {
        let search = self.metadata.as_ref()?;
        if query.trim().is_empty() {
            return None;
        }
        let hits = match search.search(query) {
            Ok(hits) => hits,
            Err(e) => {
                debug!("metadata search failed for '{}': {}", query, e);
                return None;
            }
        };
        if hits.is_empty() {
            debug!("metadata search returned no hits for '{}'", query);
        }
        first_accepted(&hits, remix_requested).cloned()
    }

    /// Accepted hit for a chart track: full search term first, then the
    /// simplified title. The hit is re-labelled with the track's search term.
    pub fn find_track_hit(&self, track: &TrackRecord) -> Option<MetadataRecord> {
        let remix_requested =
            has_remix_pattern(&track.search_term) || has_remix_pattern(&track.track_name);
        let hit = self
            .find_hit(&track.search_term, remix_requested)
            .or_else(|| self.find_hit(&simplify_track_title(&track.track_name), remix_requested))?;
        Some(MetadataRecord {
            search_term: track.search_term.clone(),
            ..hit
        })
    }

    fn page_text(&self, url: &str) -> Option<String> {
        match self.pages.fetch_page(url) {
            Ok(page) => page.into_text().filter(|text| !text.trim().is_empty()),
            Err(e) => {
                debug!("page fetch failed for {}: {}", url, e);
                None
            }
        }
    }

    fn via_metadata(
        &self,
        query: &str,
        remix_requested: bool,
        provenance: Provenance,
    ) -> Option<Resolution> {
        let hit = self.find_hit(query, remix_requested)?;
        let lyrics = self.page_text(&hit.url)?;
        debug!("resolved '{}' via {}", query, provenance);
        Some(Resolution::Resolved {
            lyrics,
            provenance,
            hit: Some(hit),
        })
    }

    fn via_secondary(&self, query: &str, provenance: Provenance) -> Option<Resolution> {
        let secondary = self.secondary.as_ref()?;
        if query.trim().is_empty() {
            return None;
        }
        match secondary.find_lyrics(query) {
            Ok(Some(lyrics)) if !lyrics.trim().is_empty() => {
                debug!("resolved '{}' via {}", query, provenance);
                Some(Resolution::Resolved {
                    lyrics,
                    provenance,
                    hit: None,
                })
            }
            Ok(_) => None,
            Err(e) => {
                debug!("secondary lyrics lookup failed for '{}': {}", query, e);
                None
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
