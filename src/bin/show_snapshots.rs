//! show-snapshots: print row counts, coverage and the first rows of every
//! snapshot in the data directory.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};

use chart_lyrics::config::{
    snapshot_path, Variant, CHART_LYRICS, GENIUS_METADATA, LYRICS, SEARCH_TERMS, SNAPSHOT_NAMES,
    TRACKS, TRACK_LYRICS,
};
use chart_lyrics::join::Coverage;
use chart_lyrics::logging;
use chart_lyrics::models::{
    ChartLyricsRecord, LyricsRecord, MetadataRecord, SearchTermRecord, TrackLyricsRecord,
    TrackRecord,
};
use chart_lyrics::store::{load_snapshot, SnapshotTable};

/// Longest JSON line printed per row
const MAX_ROW_CHARS: usize = 160;

#[derive(Parser)]
#[command(name = "show-snapshots")]
#[command(about = "Print a summary of every snapshot in the data directory")]
struct Args {
    /// Directory holding the snapshots
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Chart family: old (no suffix) or new ("_new" suffix)
    #[arg(long, value_enum, default_value_t = Variant::Old)]
    variant: Variant,

    /// Rows to print per snapshot
    #[arg(long, default_value = "15")]
    head: usize,
}

fn truncate(line: &str) -> String {
    match line.char_indices().nth(MAX_ROW_CHARS) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

fn show<R: SnapshotTable + Serialize>(path: &Path, head: usize) -> Result<()> {
    let Some(snapshot) = load_snapshot::<R>(path)
        .with_context(|| format!("Failed to load {}", path.display()))?
    else {
        return Ok(());
    };

    let coverage = Coverage::of(&snapshot);
    println!("{}", path.display());
    println!("  table: {}", R::TABLE);
    println!("  columns: {}", R::COLUMNS.join(", "));
    println!("  rows: {}", snapshot.len());
    println!(
        "  resolved: {} ({:.1}%)",
        coverage.with_lyrics,
        coverage.percent_with()
    );
    for record in snapshot.iter().take(head) {
        println!("  {}", truncate(&serde_json::to_string(record)?));
    }
    println!("{:-<75}\n", "");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();

    for name in SNAPSHOT_NAMES {
        let path = snapshot_path(&args.data_dir, name, args.variant);
        match name {
            TRACKS => show::<TrackRecord>(&path, args.head)?,
            GENIUS_METADATA => show::<MetadataRecord>(&path, args.head)?,
            SEARCH_TERMS => show::<SearchTermRecord>(&path, args.head)?,
            LYRICS => show::<LyricsRecord>(&path, args.head)?,
            CHART_LYRICS => show::<ChartLyricsRecord>(&path, args.head)?,
            TRACK_LYRICS => show::<TrackLyricsRecord>(&path, args.head)?,
            _ => {}
        }
    }
    Ok(())
}
