//! SQLite snapshot storage.
//!
//! One snapshot is one SQLite file holding a single table. Writes rebuild the
//! whole file in a temporary sibling and rename it into place, so readers never
//! see a half-written snapshot.

use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::{
    ChartLyricsRecord, LyricsRecord, MetadataRecord, Provenance, SearchTermRecord,
    TrackLyricsRecord, TrackRecord,
};
use crate::progress::WorkProgress;
use crate::reconcile::{Snapshot, SnapshotRecord};

pub const WRITE_BATCH_SIZE: usize = 10_000;

/// Record kind with a SQLite table layout.
pub trait SnapshotTable: SnapshotRecord + Sized {
    const TABLE: &'static str;
    /// Column definitions, in `COLUMNS` order
    const SCHEMA: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
    fn bind(&self) -> Vec<Value>;
}

// ============================================================================
// Column Helpers
// ============================================================================

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

fn opt_int(value: Option<i32>) -> Value {
    value.map_or(Value::Null, |v| Value::Integer(i64::from(v)))
}

fn provenance_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Provenance>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<Provenance>())
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

// ============================================================================
// Table Layouts
// ============================================================================

impl SnapshotTable for TrackRecord {
    const TABLE: &'static str = "tracks";
    const SCHEMA: &'static str = "uri TEXT PRIMARY KEY,
        artist_names TEXT NOT NULL,
        track_name TEXT NOT NULL,
        search_term TEXT NOT NULL";
    const COLUMNS: &'static [&'static str] = &["uri", "artist_names", "track_name", "search_term"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uri: row.get(0)?,
            artist_names: row.get(1)?,
            track_name: row.get(2)?,
            search_term: row.get(3)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            text(&self.uri),
            text(&self.artist_names),
            text(&self.track_name),
            text(&self.search_term),
        ]
    }
}

impl SnapshotTable for MetadataRecord {
    const TABLE: &'static str = "genius_metadata";
    const SCHEMA: &'static str = "search_term TEXT NOT NULL,
        url TEXT PRIMARY KEY,
        hit_idx INTEGER NOT NULL,
        genius_id INTEGER NOT NULL,
        api_path TEXT,
        artist_names TEXT,
        full_title TEXT NOT NULL,
        title TEXT NOT NULL,
        title_with_featured TEXT,
        language TEXT,
        lyrics_state TEXT,
        path TEXT,
        release_year INTEGER,
        release_month INTEGER,
        release_day INTEGER,
        release_date_for_display TEXT,
        header_image_url TEXT,
        header_image_thumbnail_url TEXT,
        song_art_image_url TEXT,
        song_art_image_thumbnail_url TEXT";
    const COLUMNS: &'static [&'static str] = &[
        "search_term",
        "url",
        "hit_idx",
        "genius_id",
        "api_path",
        "artist_names",
        "full_title",
        "title",
        "title_with_featured",
        "language",
        "lyrics_state",
        "path",
        "release_year",
        "release_month",
        "release_day",
        "release_date_for_display",
        "header_image_url",
        "header_image_thumbnail_url",
        "song_art_image_url",
        "song_art_image_thumbnail_url",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let hit_idx: i64 = row.get(2)?;
        Ok(Self {
            search_term: row.get(0)?,
            url: row.get(1)?,
            hit_idx: usize::try_from(hit_idx).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(e))
            })?,
            genius_id: row.get(3)?,
            api_path: row.get(4)?,
            artist_names: row.get(5)?,
            full_title: row.get(6)?,
            title: row.get(7)?,
            title_with_featured: row.get(8)?,
            language: row.get(9)?,
            lyrics_state: row.get(10)?,
            path: row.get(11)?,
            release_year: row.get(12)?,
            release_month: row.get(13)?,
            release_day: row.get(14)?,
            release_date_for_display: row.get(15)?,
            header_image_url: row.get(16)?,
            header_image_thumbnail_url: row.get(17)?,
            song_art_image_url: row.get(18)?,
            song_art_image_thumbnail_url: row.get(19)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            text(&self.search_term),
            text(&self.url),
            Value::Integer(self.hit_idx as i64),
            Value::Integer(self.genius_id),
            opt_text(self.api_path.as_deref()),
            opt_text(self.artist_names.as_deref()),
            text(&self.full_title),
            text(&self.title),
            opt_text(self.title_with_featured.as_deref()),
            opt_text(self.language.as_deref()),
            opt_text(self.lyrics_state.as_deref()),
            opt_text(self.path.as_deref()),
            opt_int(self.release_year),
            opt_int(self.release_month),
            opt_int(self.release_day),
            opt_text(self.release_date_for_display.as_deref()),
            opt_text(self.header_image_url.as_deref()),
            opt_text(self.header_image_thumbnail_url.as_deref()),
            opt_text(self.song_art_image_url.as_deref()),
            opt_text(self.song_art_image_thumbnail_url.as_deref()),
        ]
    }
}

impl SnapshotTable for SearchTermRecord {
    const TABLE: &'static str = "search_terms";
    const SCHEMA: &'static str = "search_term TEXT PRIMARY KEY,
        url TEXT";
    const COLUMNS: &'static [&'static str] = &["search_term", "url"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            search_term: row.get(0)?,
            url: row.get(1)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![text(&self.search_term), opt_text(self.url.as_deref())]
    }
}

impl SnapshotTable for LyricsRecord {
    const TABLE: &'static str = "lyrics";
    const SCHEMA: &'static str = "url TEXT PRIMARY KEY,
        lyrics TEXT,
        lyrics_source TEXT";
    const COLUMNS: &'static [&'static str] = &["url", "lyrics", "lyrics_source"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            lyrics: row.get(1)?,
            lyrics_source: provenance_column(row, 2)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            text(&self.url),
            opt_text(self.lyrics.as_deref()),
            opt_text(self.lyrics_source.map(Provenance::as_str)),
        ]
    }
}

impl SnapshotTable for ChartLyricsRecord {
    const TABLE: &'static str = "chart_lyrics";
    const SCHEMA: &'static str = "uri TEXT PRIMARY KEY,
        artist_names TEXT NOT NULL,
        track_name TEXT NOT NULL,
        search_term TEXT NOT NULL,
        lyrics_source TEXT,
        lyrics TEXT";
    const COLUMNS: &'static [&'static str] = &[
        "uri",
        "artist_names",
        "track_name",
        "search_term",
        "lyrics_source",
        "lyrics",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uri: row.get(0)?,
            artist_names: row.get(1)?,
            track_name: row.get(2)?,
            search_term: row.get(3)?,
            lyrics_source: provenance_column(row, 4)?,
            lyrics: row.get(5)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            text(&self.uri),
            text(&self.artist_names),
            text(&self.track_name),
            text(&self.search_term),
            opt_text(self.lyrics_source.map(Provenance::as_str)),
            opt_text(self.lyrics.as_deref()),
        ]
    }
}

impl SnapshotTable for TrackLyricsRecord {
    const TABLE: &'static str = "track_lyrics";
    const SCHEMA: &'static str = "uri TEXT PRIMARY KEY,
        artist_names TEXT NOT NULL,
        track_name TEXT NOT NULL,
        search_term TEXT NOT NULL,
        url TEXT,
        lyrics TEXT,
        lyrics_source TEXT";
    const COLUMNS: &'static [&'static str] = &[
        "uri",
        "artist_names",
        "track_name",
        "search_term",
        "url",
        "lyrics",
        "lyrics_source",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uri: row.get(0)?,
            artist_names: row.get(1)?,
            track_name: row.get(2)?,
            search_term: row.get(3)?,
            url: row.get(4)?,
            lyrics: row.get(5)?,
            lyrics_source: provenance_column(row, 6)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            text(&self.uri),
            text(&self.artist_names),
            text(&self.track_name),
            text(&self.search_term),
            opt_text(self.url.as_deref()),
            opt_text(self.lyrics.as_deref()),
            opt_text(self.lyrics_source.map(Provenance::as_str)),
        ]
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Load a snapshot. `Ok(None)` when the file does not exist yet; an existing
/// file without records is an error.
pub fn load_snapshot<R: SnapshotTable>(path: &Path) -> Result<Option<Snapshot<R>>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let sql = format!(
        "SELECT {} FROM {} ORDER BY rowid",
        R::COLUMNS.join(", "),
        R::TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map([], |row| R::from_row(row))?
        .collect::<rusqlite::Result<Vec<R>>>()?;

    if records.is_empty() {
        return Err(StoreError::EmptySnapshot(path.to_path_buf()));
    }

    tracing::debug!("loaded {} rows from {}", records.len(), path.display());
    Ok(Some(Snapshot::from_records(records)))
}

/// Load a snapshot that an earlier stage must have produced.
pub fn load_required<R: SnapshotTable>(path: &Path) -> Result<Snapshot<R>, StoreError> {
    load_snapshot(path)?.ok_or_else(|| StoreError::MissingSnapshot(path.to_path_buf()))
}

// ============================================================================
// Writing
// ============================================================================

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write every record of `snapshot` to `path`, replacing any previous file.
pub fn write_snapshot<R: SnapshotTable>(
    path: &Path,
    snapshot: &Snapshot<R>,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    if tmp.exists() {
        std::fs::remove_file(&tmp)?;
    }

    {
        let mut conn = Connection::open(&tmp)?;
        conn.execute_batch(&format!(
            "PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             CREATE TABLE {} ({});",
            R::TABLE,
            R::SCHEMA
        ))?;

        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE,
            R::COLUMNS.join(", "),
            (1..=R::COLUMNS.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let phase = format!("Writing {}", R::TABLE);
        let progress =
            WorkProgress::with_interval(&phase, snapshot.len() as u64, WRITE_BATCH_SIZE as u64);
        for chunk in snapshot.records().chunks(WRITE_BATCH_SIZE) {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(&insert)?;
                for record in chunk {
                    stmt.execute(params_from_iter(record.bind()))?;
                    progress.inc();
                }
            }
            tx.commit()?;
        }
        progress.finish();
    }

    std::fs::rename(&tmp, path)?;
    tracing::info!("wrote {} rows to {}", snapshot.len(), path.display());
    Ok(())
}
