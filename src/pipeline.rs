//! Shared driver plumbing: work sets, the per-key fetch loop and the
//! merge-and-persist step.
//!
//! Control flow of every driver:
//! load snapshot -> work set via `missing_keys` -> resolve each entry ->
//! `merge` -> persist (skipped when the merge changed nothing).

use anyhow::{Context, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::models::{ChartLyricsRecord, MetadataRecord, RunStats, SearchTermRecord, TrackRecord};
use crate::progress::{format_duration, WorkProgress};
use crate::reconcile::{merge, missing_keys, Snapshot};
use crate::store::{write_snapshot, SnapshotTable};

// ============================================================================
// Work Sets
// ============================================================================

fn apply_limit<T>(mut work: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        work.truncate(limit);
    }
    work
}

/// Tracks still needing lyrics: absent from the chart lyrics snapshot or
/// present without lyrics. Track order is kept.
pub fn chart_work_set<'a>(
    snapshot: &Snapshot<ChartLyricsRecord>,
    tracks: &'a Snapshot<TrackRecord>,
    limit: Option<usize>,
) -> Vec<&'a TrackRecord> {
    let uris = missing_keys(snapshot, tracks.iter().map(|t| t.uri.as_str()));
    let work = uris.iter().filter_map(|uri| tracks.get(uri)).collect();
    apply_limit(work, limit)
}

/// One track per search term that has no url link yet. The first track
/// carrying a term stands in for every track sharing it.
pub fn metadata_work_set<'a>(
    tracks: &'a Snapshot<TrackRecord>,
    terms: &Snapshot<SearchTermRecord>,
    limit: Option<usize>,
) -> Vec<&'a TrackRecord> {
    let mut first_by_term: FxHashMap<&str, &'a TrackRecord> = FxHashMap::default();
    for track in tracks.iter() {
        first_by_term.entry(track.search_term.as_str()).or_insert(track);
    }
    let pending = missing_keys(terms, tracks.iter().map(|t| t.search_term.as_str()));
    let work = pending
        .iter()
        .filter_map(|term| first_by_term.get(term.as_str()).copied())
        .collect();
    apply_limit(work, limit)
}

/// Split metadata lookups into the url-keyed hit batch and the term link
/// batch. Every looked-up term gets a link; misses link to no url.
pub fn metadata_batches(
    work: &[&TrackRecord],
    hits: Vec<Option<MetadataRecord>>,
) -> (Vec<MetadataRecord>, Vec<SearchTermRecord>) {
    let mut found = Vec::new();
    let mut links = Vec::with_capacity(work.len());
    for (track, hit) in work.iter().zip(hits) {
        links.push(SearchTermRecord::new(
            &track.search_term,
            hit.as_ref().map(|h| h.url.as_str()),
        ));
        found.extend(hit);
    }
    (found, links)
}

// ============================================================================
// Fetch Loop
// ============================================================================

/// Apply `fetch` to every item, sequentially or on a dedicated pool of
/// `workers` threads. Results come back in input order.
pub fn run_work_set<T, O, F>(
    phase: &str,
    items: &[T],
    workers: usize,
    fetch: F,
) -> Result<Vec<O>>
where
    T: Sync,
    O: Send,
    F: Fn(&T) -> O + Sync,
{
    let progress = WorkProgress::new(phase, items.len() as u64);

    let step = |item: &T| {
        let out = fetch(item);
        progress.inc();
        out
    };

    let results: Vec<O> = if workers > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("Failed to build fetch worker pool")?;
        pool.install(|| items.par_iter().map(step).collect())
    } else {
        items.iter().map(step).collect()
    };

    progress.finish();
    Ok(results)
}

/// Merge `batch` into `old` and write the result unless nothing changed.
pub fn merge_and_persist<R: SnapshotTable>(
    path: &Path,
    old: Option<Snapshot<R>>,
    batch: Vec<R>,
    stats: &mut RunStats,
) -> Result<Snapshot<R>> {
    let (merged, outcome) = merge(old.unwrap_or_default(), batch);
    stats.added = outcome.added;
    stats.updated = outcome.updated;

    if outcome.is_noop() {
        info!("Nothing new for {}; not writing", path.display());
        return Ok(merged);
    }

    info!(
        "{}: {} added, {} updated, {} total",
        path.display(),
        outcome.added,
        outcome.updated,
        merged.len()
    );
    write_snapshot(path, &merged)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    stats.written = true;
    Ok(merged)
}

/// Log the run statistics, optionally write them as JSON, and print a summary.
pub fn report_run(
    name: &str,
    stats: &mut RunStats,
    stats_path: Option<&Path>,
    start: Instant,
) -> Result<()> {
    let elapsed = start.elapsed();
    stats.elapsed_seconds = elapsed.as_secs_f64();
    stats.log_phase(name);
    if let Some(path) = stats_path {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
    }

    println!("\n{:=<60}", "");
    println!("{} complete!", name);
    println!("  Work set: {}", stats.work_set);
    if stats.resolved + stats.unresolved > 0 {
        println!("  Resolved: {} ({:.1}%)", stats.resolved, stats.resolve_rate());
    }
    println!("  Added: {}  Updated: {}", stats.added, stats.updated);
    println!("  Elapsed: {}", format_duration(elapsed));
    println!("{:=<60}", "");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LyricsRecord, Provenance};
    use crate::reconcile::SnapshotRecord;
    use crate::store::load_required;
    use tempfile::tempdir;

    fn record(url: &str, lyrics: Option<&str>) -> LyricsRecord {
        LyricsRecord {
            url: url.to_string(),
            lyrics: lyrics.map(str::to_string),
            lyrics_source: lyrics.map(|_| Provenance::GeniusPage),
        }
    }

    #[test]
    fn test_run_work_set_preserves_order() {
        let items: Vec<u32> = (0..64).collect();
        let sequential = run_work_set("test", &items, 0, |n| n * 2).unwrap();
        let parallel = run_work_set("test", &items, 4, |n| n * 2).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel[10], 20);
    }

    #[test]
    fn test_merge_and_persist_skips_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lyrics.sqlite3");
        let mut stats = RunStats::default();

        merge_and_persist::<LyricsRecord>(&path, None, Vec::new(), &mut stats).unwrap();
        assert!(!stats.written);
        assert!(!path.exists());
    }

    #[test]
    fn test_merge_and_persist_writes_updates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lyrics.sqlite3");
        let mut stats = RunStats::default();

        let first = merge_and_persist(&path, None, vec![record("a", None)], &mut stats).unwrap();
        assert_eq!((stats.added, stats.updated, stats.written), (1, 0, true));

        let mut stats = RunStats::default();
        let batch = vec![record("a", Some("text"))];
        merge_and_persist(&path, Some(first), batch, &mut stats).unwrap();
        assert_eq!((stats.added, stats.updated), (0, 1));

        let loaded = load_required::<LyricsRecord>(&path).unwrap();
        assert_eq!(loaded.get("a").and_then(|r| r.lyrics.as_deref()), Some("text"));
    }

    fn meta(term: &str, url: &str) -> MetadataRecord {
        MetadataRecord {
            search_term: term.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_chart_work_set_retries_only_unresolved() {
        let tracks = Snapshot::from_records(vec![
            TrackRecord::from_chart("u1", "A", "One"),
            TrackRecord::from_chart("u2", "B", "Two"),
            TrackRecord::from_chart("u3", "C", "Three"),
            TrackRecord::from_chart("u4", "D", "Four"),
        ]);
        let resolved = ChartLyricsRecord {
            lyrics: Some("words".to_string()),
            lyrics_source: Some(Provenance::Genius),
            ..ChartLyricsRecord::unresolved(&tracks.records()[0])
        };
        let snapshot = Snapshot::from_records(vec![
            resolved,
            ChartLyricsRecord::unresolved(&tracks.records()[1]),
        ]);

        fn uris(work: Vec<&TrackRecord>) -> Vec<String> {
            work.iter().map(|t| t.uri.clone()).collect()
        }
        assert_eq!(uris(chart_work_set(&snapshot, &tracks, None)), vec!["u2", "u3", "u4"]);
        assert_eq!(uris(chart_work_set(&snapshot, &tracks, Some(2))), vec!["u2", "u3"]);
        assert!(chart_work_set(&snapshot, &Snapshot::new(), None).is_empty());
    }

    #[test]
    fn test_metadata_work_set_one_track_per_term() {
        let tracks = Snapshot::from_records(vec![
            TrackRecord::from_chart("u1", "The Weeknd", "Save Your Tears"),
            TrackRecord::from_chart("u2", "The Weeknd, Ariana Grande", "Save Your Tears"),
            TrackRecord::from_chart("u3", "Bad Bunny", "DÁKITI"),
        ]);
        let terms = Snapshot::from_records(vec![
            SearchTermRecord::new("dákiti by bad bunny", Some("https://genius.com/b-lyrics")),
        ]);

        let work = metadata_work_set(&tracks, &terms, None);
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].uri, "u1");
        assert!(metadata_work_set(&tracks, &terms, Some(0)).is_empty());
    }

    #[test]
    fn test_metadata_work_set_retries_terms_without_url() {
        let tracks = Snapshot::from_records(vec![TrackRecord::from_chart("u1", "A", "Song")]);
        let terms = Snapshot::from_records(vec![SearchTermRecord::new("song by a", None)]);
        assert_eq!(metadata_work_set(&tracks, &terms, None).len(), 1);
    }

    #[test]
    fn test_terms_sharing_a_url_converge() {
        let shared = "https://genius.com/A-song-lyrics";
        let tracks = Snapshot::from_records(vec![
            TrackRecord::from_chart("u1", "A, B", "Song"),
            TrackRecord::from_chart("u2", "B, A", "Song"),
            TrackRecord::from_chart("u3", "A", "Other"),
        ]);
        let work = metadata_work_set(&tracks, &Snapshot::new(), None);
        assert_eq!(work.len(), 3);

        let hits = vec![
            Some(meta("song by a", shared)),
            Some(meta("song by b", shared)),
            None,
        ];
        let (found, links) = metadata_batches(&work, hits);
        let (metadata, _) = merge(Snapshot::new(), found);
        let (terms, _) = merge(Snapshot::new(), links);

        // One page, yet both terms are linked to it
        assert_eq!(metadata.len(), 1);
        assert!(terms.get("song by a").unwrap().is_resolved());
        assert!(terms.get("song by b").unwrap().is_resolved());

        let again = metadata_work_set(&tracks, &terms, None);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].search_term, "other by a");
    }
}
