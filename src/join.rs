//! Joining tracks with their metadata url and scraped lyrics.
//!
//! tracks --(search_term)--> url --(url)--> lyrics, both joins left joins.
//! A term's url comes from its search term link; terms without one fall back
//! to the first metadata record carrying that term.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::models::{
    LyricsRecord, MetadataRecord, SearchTermRecord, TrackLyricsRecord, TrackRecord,
};
use crate::normalize::normalize_lyrics;
use crate::reconcile::{Snapshot, SnapshotRecord};

pub fn join_track_lyrics(
    tracks: &Snapshot<TrackRecord>,
    terms: &Snapshot<SearchTermRecord>,
    metadata: &Snapshot<MetadataRecord>,
    lyrics: &Snapshot<LyricsRecord>,
) -> Vec<TrackLyricsRecord> {
    let mut url_by_term: FxHashMap<&str, &str> = FxHashMap::default();
    for link in terms.iter() {
        if let Some(url) = link.url.as_deref() {
            url_by_term.insert(link.search_term.as_str(), url);
        }
    }
    for record in metadata.iter() {
        url_by_term
            .entry(record.search_term.as_str())
            .or_insert(record.url.as_str());
    }

    tracks
        .iter()
        .map(|track| {
            let url = url_by_term.get(track.search_term.as_str()).copied();
            let page = url.and_then(|u| lyrics.get(u));
            let text = normalize_lyrics(page.and_then(|p| p.lyrics.clone()));
            TrackLyricsRecord {
                uri: track.uri.clone(),
                artist_names: track.artist_names.clone(),
                track_name: track.track_name.clone(),
                search_term: track.search_term.clone(),
                url: url.map(str::to_string),
                lyrics_source: text.as_ref().and(page.and_then(|p| p.lyrics_source)),
                lyrics: text,
            }
        })
        .collect()
}

/// Share of keys with and without lyrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Coverage {
    pub with_lyrics: usize,
    pub without_lyrics: usize,
}

impl Coverage {
    pub fn of<R: SnapshotRecord>(snapshot: &Snapshot<R>) -> Self {
        let with_lyrics = snapshot.resolved_count();
        Self {
            with_lyrics,
            without_lyrics: snapshot.len() - with_lyrics,
        }
    }

    pub fn total(&self) -> usize {
        self.with_lyrics + self.without_lyrics
    }

    pub fn percent_with(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            100.0 * self.with_lyrics as f64 / self.total() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provenance;

    fn metadata(term: &str, url: &str) -> MetadataRecord {
        MetadataRecord {
            search_term: term.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn page(url: &str, text: &str) -> LyricsRecord {
        LyricsRecord {
            url: url.to_string(),
            lyrics: Some(text.to_string()),
            lyrics_source: Some(Provenance::GeniusPage),
        }
    }

    #[test]
    fn test_left_joins() {
        let tracks = Snapshot::from_records(vec![
            TrackRecord::from_chart("u1", "The Weeknd", "Save Your Tears"),
            TrackRecord::from_chart("u2", "Bad Bunny", "DÁKITI"),
            TrackRecord::from_chart("u3", "Nobody", "Unknown Song"),
        ]);
        let meta = Snapshot::from_records(vec![
            metadata("save your tears by the weeknd", "https://genius.com/a-lyrics"),
            metadata("dákiti by bad bunny", "https://genius.com/b-lyrics"),
        ]);
        let pages = Snapshot::from_records(vec![
            page("https://genius.com/a-lyrics", "I saw you dancing"),
            page("https://genius.com/b-lyrics", ""),
        ]);

        let joined = join_track_lyrics(&tracks, &Snapshot::new(), &meta, &pages);
        assert_eq!(joined.len(), 3);

        assert_eq!(joined[0].lyrics.as_deref(), Some("I saw you dancing"));
        assert_eq!(joined[0].lyrics_source, Some(Provenance::GeniusPage));

        // Empty lyrics normalize to none, url survives the join
        assert_eq!(joined[1].url.as_deref(), Some("https://genius.com/b-lyrics"));
        assert_eq!(joined[1].lyrics, None);
        assert_eq!(joined[1].lyrics_source, None);

        assert_eq!(joined[2].url, None);
        assert_eq!(joined[2].lyrics, None);
    }

    #[test]
    fn test_first_metadata_per_term_wins() {
        let tracks = Snapshot::from_records(vec![TrackRecord::from_chart("u1", "A", "Song")]);
        let meta = Snapshot::from_records(vec![
            metadata("song by a", "https://genius.com/first-lyrics"),
            metadata("song by a", "https://genius.com/second-lyrics"),
        ]);
        let joined = join_track_lyrics(&tracks, &Snapshot::new(), &meta, &Snapshot::new());
        assert_eq!(joined[0].url.as_deref(), Some("https://genius.com/first-lyrics"));
    }

    #[test]
    fn test_terms_sharing_a_page_both_join_to_it() {
        let shared = "https://genius.com/Artist-a-song-lyrics";
        let tracks = Snapshot::from_records(vec![
            TrackRecord::from_chart("u1", "Artist A, Artist B", "Song"),
            TrackRecord::from_chart("u2", "Artist B, Artist A", "Song"),
        ]);
        let terms = Snapshot::from_records(vec![
            SearchTermRecord::new("song by artist a", Some(shared)),
            SearchTermRecord::new("song by artist b", Some(shared)),
        ]);
        // The metadata snapshot holds one record per url
        let meta = Snapshot::from_records(vec![metadata("song by artist a", shared)]);
        let pages = Snapshot::from_records(vec![page(shared, "la la")]);

        let joined = join_track_lyrics(&tracks, &terms, &meta, &pages);
        assert_eq!(joined[0].lyrics.as_deref(), Some("la la"));
        assert_eq!(joined[1].url.as_deref(), Some(shared));
        assert_eq!(joined[1].lyrics.as_deref(), Some("la la"));
    }

    #[test]
    fn test_coverage() {
        let snapshot = Snapshot::from_records(vec![
            page("a", "text"),
            page("b", ""),
            page("c", "more"),
            page("d", "  "),
        ]);
        let coverage = Coverage::of(&snapshot);
        assert_eq!(coverage, Coverage { with_lyrics: 2, without_lyrics: 2 });
        assert!((coverage.percent_with() - 50.0).abs() < f64::EPSILON);
    }
}
