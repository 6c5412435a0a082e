//! Chart CSV input and the deduplicated tracks CSV export.
//!
//! Chart exports carry many columns; only `uri`, `artist_names` and
//! `track_name` are read. Files are read newest first (reverse-sorted names),
//! so the first occurrence of a `uri` comes from the most recent chart.

use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::TrackRecord;
use crate::reconcile::{dedup_first, Snapshot};

#[derive(Debug, Deserialize)]
struct ChartRow {
    uri: String,
    artist_names: String,
    track_name: String,
}

/// CSV files of a chart directory in reverse-sorted file name order.
pub fn list_chart_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(files)
}

/// Track records of one chart file, in row order.
pub fn read_chart_file(path: &Path) -> Result<Vec<TrackRecord>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut tracks = Vec::new();
    for row in reader.deserialize::<ChartRow>() {
        let row = row?;
        if row.uri.trim().is_empty() {
            return Err(StoreError::InvalidRow {
                path: path.to_path_buf(),
                detail: format!("empty uri for '{}'", row.track_name),
            });
        }
        tracks.push(TrackRecord::from_chart(&row.uri, &row.artist_names, &row.track_name));
    }
    Ok(tracks)
}

/// Every distinct track in a chart directory, first occurrence wins.
pub fn load_chart_tracks(dir: &Path) -> Result<Vec<TrackRecord>, StoreError> {
    let mut all = Vec::new();
    for file in list_chart_files(dir)? {
        let tracks = read_chart_file(&file)?;
        tracing::info!("{}: {} rows", file.display(), tracks.len());
        all.extend(tracks);
    }
    let distinct = dedup_first(all);
    tracing::info!("Total unique tracks: {}", distinct.len());
    Ok(distinct)
}

// ============================================================================
// Deduplicated Tracks CSV
// ============================================================================

pub fn read_tracks_csv(path: &Path) -> Result<Vec<TrackRecord>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let tracks = reader
        .deserialize::<TrackRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tracks)
}

/// Columns of the deduplicated tracks export, in `TrackRecord` field order
pub const TRACKS_CSV_HEADER: [&str; 4] = ["uri", "artist_names", "track_name", "search_term"];

/// Append tracks whose `uri` is not yet in the export. An absent or zero-byte
/// export gets the header first, even when there is nothing to append.
/// Returns how many rows were appended.
pub fn append_tracks_csv(path: &Path, tracks: &[TrackRecord]) -> Result<usize, StoreError> {
    let has_rows = path.exists() && std::fs::metadata(path)?.len() > 0;
    let known: FxHashSet<String> = if has_rows {
        read_tracks_csv(path)?.into_iter().map(|t| t.uri).collect()
    } else {
        FxHashSet::default()
    };

    let fresh: Vec<&TrackRecord> = tracks.iter().filter(|t| !known.contains(&t.uri)).collect();
    if has_rows && fresh.is_empty() {
        return Ok(0);
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if !has_rows {
        writer.write_record(TRACKS_CSV_HEADER)?;
    }
    for track in &fresh {
        writer.serialize(track)?;
    }
    writer.flush()?;
    Ok(fresh.len())
}

/// Drop tracks whose `uri` is already in `known`. Returns how many were dropped.
pub fn exclude_known(tracks: &mut Vec<TrackRecord>, known: &Snapshot<TrackRecord>) -> usize {
    let before = tracks.len();
    tracks.retain(|t| !known.contains(&t.uri));
    before - tracks.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "rank,uri,artist_names,track_name,source,peak_rank\n";

    fn write_chart(dir: &Path, name: &str, rows: &[&str]) {
        let mut body = HEADER.to_string();
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_chart_files_reverse_sorted() {
        let dir = tempdir().unwrap();
        write_chart(dir.path(), "regional-mx-weekly-2021-01-07.csv", &[]);
        write_chart(dir.path(), "regional-mx-weekly-2021-01-14.csv", &[]);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let names: Vec<String> = list_chart_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "regional-mx-weekly-2021-01-14.csv".to_string(),
                "regional-mx-weekly-2021-01-07.csv".to_string(),
            ]
        );
    }

    #[test]
    fn test_newest_chart_wins_on_duplicate_uri() {
        let dir = tempdir().unwrap();
        write_chart(
            dir.path(),
            "regional-mx-weekly-2021-01-07.csv",
            &["1,spotify:track:a,Old Name,Old Title,Sony,1"],
        );
        write_chart(
            dir.path(),
            "regional-mx-weekly-2021-01-14.csv",
            &[
                concat!(
                    r#"1,spotify:track:a,"The Weeknd, Ariana Grande","#,
                    "Save Your Tears (Remix),Republic,1"
                ),
                "2,spotify:track:b,Bad Bunny,DÁKITI,Rimas,2",
            ],
        );

        let tracks = load_chart_tracks(dir.path()).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].uri, "spotify:track:a");
        assert_eq!(tracks[0].artist_names, "The Weeknd, Ariana Grande");
        assert_eq!(tracks[0].search_term, "save your tears by the weeknd");
        assert_eq!(tracks[1].search_term, "dákiti by bad bunny");
    }

    #[test]
    fn test_missing_uri_column_is_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("chart.csv"), "artist_names,track_name\nA,B\n").unwrap();
        assert!(load_chart_tracks(dir.path()).is_err());
    }

    #[test]
    fn test_tracks_csv_appends_only_new_uris() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deduped_tracks.csv");
        let a = TrackRecord::from_chart("spotify:track:a", "Artist A", "Song A");
        let b = TrackRecord::from_chart("spotify:track:b", "Artist B", "Song B");

        assert_eq!(append_tracks_csv(&path, &[a.clone()]).unwrap(), 1);
        assert_eq!(append_tracks_csv(&path, &[a.clone(), b.clone()]).unwrap(), 1);
        assert_eq!(append_tracks_csv(&path, &[b.clone()]).unwrap(), 0);

        assert_eq!(read_tracks_csv(&path).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_empty_first_export_keeps_header_for_later_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deduped_tracks_new.csv");
        let a = TrackRecord::from_chart("spotify:track:a", "Artist A", "Song A");
        let b = TrackRecord::from_chart("spotify:track:b", "Artist B", "Song B");

        assert_eq!(append_tracks_csv(&path, &[]).unwrap(), 0);
        assert!(read_tracks_csv(&path).unwrap().is_empty());

        assert_eq!(append_tracks_csv(&path, &[a.clone(), b.clone()]).unwrap(), 2);
        assert_eq!(read_tracks_csv(&path).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_zero_byte_export_gets_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deduped_tracks.csv");
        std::fs::write(&path, "").unwrap();
        let a = TrackRecord::from_chart("spotify:track:a", "Artist A", "Song A");

        assert_eq!(append_tracks_csv(&path, &[a.clone()]).unwrap(), 1);
        assert_eq!(read_tracks_csv(&path).unwrap(), vec![a]);
    }

    #[test]
    fn test_exclude_known_drops_old_chart_uris() {
        let old = Snapshot::from_records(vec![
            TrackRecord::from_chart("spotify:track:a", "Artist A", "Song A"),
        ]);
        let mut tracks = vec![
            TrackRecord::from_chart("spotify:track:a", "Artist A", "Song A (Remix)"),
            TrackRecord::from_chart("spotify:track:c", "Artist C", "Song C"),
        ];
        assert_eq!(exclude_known(&mut tracks, &old), 1);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].uri, "spotify:track:c");
    }
}
