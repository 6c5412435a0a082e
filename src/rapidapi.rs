//! Secondary lyrics API reached through RapidAPI.
//!
//! Two POST calls per lookup: search by free text, then fetch lyrics by the
//! identifier of the top search result. Identifiers may be strings or numbers.

use serde_json::Value;
use std::sync::Arc;

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::resolver::SecondaryLyrics;

pub struct RapidApiClient {
    http: Arc<HttpClient>,
    base_url: String,
    host: String,
    key: String,
}

impl RapidApiClient {
    /// `host` is the RapidAPI host header value; the base url is derived from it
    /// unless `base_url` overrides it.
    pub fn new(http: Arc<HttpClient>, host: &str, key: &str, base_url: Option<&str>) -> Self {
        let base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://{}", host));
        Self {
            http,
            base_url,
            host: host.to_string(),
            key: key.to_string(),
        }
    }

    fn post(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<Value, FetchError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let headers = [
            ("X-RapidAPI-Key", self.key.as_str()),
            ("X-RapidAPI-Host", self.host.as_str()),
        ];
        let response = self.http.post_form(&url, &headers, form)?;
        HttpClient::read_json(&url, response)
    }
}

/// Identifier of the top search result.
pub fn top_result_id(search: &Value) -> Option<String> {
    match search.get("result")?.get(0)?.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Lyric text of a fetch-by-id response.
pub fn lyrics_text(body: &Value) -> Option<String> {
    body.get("result")?
        .get("lyrics")?
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

impl SecondaryLyrics for RapidApiClient {
    fn find_lyrics(&self, query: &str) -> Result<Option<String>, FetchError> {
        let search = self.post("search", &[("q", query)])?;
        let Some(id) = top_result_id(&search) else {
            tracing::debug!("secondary search returned no results for '{}'", query);
            return Ok(None);
        };
        let body = self.post("lyrics", &[("id", id.as_str())])?;
        Ok(lyrics_text(&body))
    }
}
