//! Lyrics page scraping.
//!
//! Lyric text lives in one or more container elements. Each container's text
//! nodes are joined with newlines, and containers are joined with newlines in
//! document order. Pages without containers may carry a placeholder message
//! instead: "instrumental" placeholders are final results, "not released yet"
//! placeholders are not.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::Arc;

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::resolver::LyricsPageSource;

static LYRICS_CONTAINER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[data-lyrics-container="true"], div[class^="Lyrics__Container"]"#)
        .unwrap()
});

static PLACEHOLDER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[class^="LyricsPlaceholder__Message"]"#).unwrap());

/// Attribute marking non-lyric chrome nested inside a container
const EXCLUDE_ATTR: &str = "data-exclude-from-selection";

/// What a lyrics page yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLyrics {
    Lyrics(String),
    /// Placeholder text of an instrumental track
    Instrumental(String),
    Unreleased,
    Missing,
}

impl PageLyrics {
    /// Usable lyric text, if any. Instrumental placeholders count.
    pub fn into_text(self) -> Option<String> {
        match self {
            PageLyrics::Lyrics(text) | PageLyrics::Instrumental(text) => Some(text),
            PageLyrics::Unreleased | PageLyrics::Missing => None,
        }
    }
}

fn container_text(container: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in container.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        let excluded = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != container.id())
            .any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| el.attr(EXCLUDE_ATTR) == Some("true"))
            });
        if !excluded {
            parts.push(text);
        }
    }
    parts.join("\n")
}

/// Extract lyrics from a lyrics page document.
pub fn extract_lyrics(html: &str) -> PageLyrics {
    let document = Html::parse_document(html);

    let containers: Vec<String> = document
        .select(&LYRICS_CONTAINER)
        .map(container_text)
        .filter(|text| !text.trim().is_empty())
        .collect();
    if !containers.is_empty() {
        return PageLyrics::Lyrics(containers.join("\n"));
    }

    for placeholder in document.select(&PLACEHOLDER) {
        let message = placeholder.text().collect::<Vec<_>>().join(" ");
        let message = message.split_whitespace().collect::<Vec<_>>().join(" ");
        let lower = message.to_lowercase();
        if lower.contains("instrumental") {
            return PageLyrics::Instrumental(message);
        }
        if lower.contains("not been released")
            || lower.contains("yet to be released")
            || lower.contains("unreleased")
        {
            return PageLyrics::Unreleased;
        }
    }

    PageLyrics::Missing
}

// ============================================================================
// Fetcher
// ============================================================================

/// Fetches lyrics pages over plain GET.
pub struct PageFetcher {
    http: Arc<HttpClient>,
}

impl PageFetcher {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

impl LyricsPageSource for PageFetcher {
    fn fetch_page(&self, url: &str) -> Result<PageLyrics, FetchError> {
        let html = self.http.get_text(url, &[])?;
        Ok(extract_lyrics(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_containers_in_order() {
        let html = r#"<html><body>
            <div data-lyrics-container="true" class="Lyrics__Container-sc-1ynbvzw-6 YYrds">[Verse 1]<br>I saw you dancing<br><a href="/x"><span>in a crowded room</span></a></div>
            <div class="SongPage__Sidebar">Ad</div>
            <div data-lyrics-container="true">[Chorus]<br>Save your tears</div>
        </body></html>"#;
        assert_eq!(
            extract_lyrics(html),
            PageLyrics::Lyrics(
                "[Verse 1]\nI saw you dancing\nin a crowded room\n[Chorus]\nSave your tears"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_legacy_class_container() {
        let html = r#"<div class="Lyrics__Container-sc-1ynbvzw-6 YYrds">Line one<br>Line two</div>"#;
        assert_eq!(
            extract_lyrics(html),
            PageLyrics::Lyrics("Line one\nLine two".to_string())
        );
    }

    #[test]
    fn test_skips_excluded_chrome() {
        let html = r#"<div data-lyrics-container="true"><div data-exclude-from-selection="true"><span>12 Contributors</span></div>Real line</div>"#;
        assert_eq!(extract_lyrics(html), PageLyrics::Lyrics("Real line".to_string()));
    }

    #[test]
    fn test_instrumental_placeholder_is_final() {
        let html = r#"<div class="LyricsPlaceholder__Message-uen8er-3 jlYyFx">This song is an instrumental</div>"#;
        let page = extract_lyrics(html);
        assert_eq!(page, PageLyrics::Instrumental("This song is an instrumental".to_string()));
        assert_eq!(page.into_text().as_deref(), Some("This song is an instrumental"));
    }

    #[test]
    fn test_unreleased_placeholder_is_unresolved() {
        let html = r#"<div class="LyricsPlaceholder__Message-uen8er-3">Lyrics for this song have yet to be released. Please check back once the song has been released.</div>"#;
        assert_eq!(extract_lyrics(html), PageLyrics::Unreleased);

        let html = r#"<div class="LyricsPlaceholder__Message-uen8er-3">This song has not been released yet.</div>"#;
        assert_eq!(extract_lyrics(html), PageLyrics::Unreleased);
    }

    #[test]
    fn test_page_without_markers_is_missing() {
        assert_eq!(extract_lyrics("<html><body><p>404</p></body></html>"), PageLyrics::Missing);
        assert_eq!(
            extract_lyrics(r#"<div data-lyrics-container="true">   </div>"#),
            PageLyrics::Missing
        );
    }
}
