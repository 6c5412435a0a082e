//! glue: join tracks, search term links, metadata and page lyrics into the
//! track lyrics snapshot, then print how many tracks have lyrics.

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;
use tracing::info;

use chart_lyrics::config::{
    CommonArgs, GENIUS_METADATA, LYRICS, SEARCH_TERMS, TRACKS, TRACK_LYRICS,
};
use chart_lyrics::join::{join_track_lyrics, Coverage};
use chart_lyrics::logging;
use chart_lyrics::models::{
    LyricsRecord, MetadataRecord, RunStats, SearchTermRecord, TrackLyricsRecord, TrackRecord,
};
use chart_lyrics::pipeline::{merge_and_persist, report_run};
use chart_lyrics::progress::set_log_only;
use chart_lyrics::safety::validate_snapshot_output;
use chart_lyrics::store::{load_required, load_snapshot};

#[derive(Parser)]
#[command(name = "glue")]
#[command(about = "Join tracks with metadata and lyrics and upsert the track lyrics snapshot")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();
    set_log_only(args.common.log_only);

    let start = Instant::now();
    let mut stats = RunStats::default();

    let tracks_path = args.common.snapshot_path(TRACKS);
    let terms_path = args.common.snapshot_path(SEARCH_TERMS);
    let metadata_path = args.common.snapshot_path(GENIUS_METADATA);
    let lyrics_path = args.common.snapshot_path(LYRICS);
    let output = args.common.snapshot_path(TRACK_LYRICS);
    validate_snapshot_output(
        &output,
        TRACK_LYRICS,
        &[&tracks_path, &terms_path, &metadata_path, &lyrics_path],
    )?;

    let tracks = load_required::<TrackRecord>(&tracks_path)
        .with_context(|| format!("Failed to load {}", tracks_path.display()))?;
    let terms = load_required::<SearchTermRecord>(&terms_path)
        .with_context(|| format!("Failed to load {}", terms_path.display()))?;
    let metadata = load_required::<MetadataRecord>(&metadata_path)
        .with_context(|| format!("Failed to load {}", metadata_path.display()))?;
    let lyrics = load_required::<LyricsRecord>(&lyrics_path)
        .with_context(|| format!("Failed to load {}", lyrics_path.display()))?;

    let joined = join_track_lyrics(&tracks, &terms, &metadata, &lyrics);
    stats.work_set = joined.len();

    let existing = load_snapshot::<TrackLyricsRecord>(&output)
        .with_context(|| format!("Failed to load snapshot {}", output.display()))?;
    if let Some(old) = &existing {
        stats.snapshot_records = old.len();
        info!("Rows that remain the same: {}", old.resolved_count());
    }

    let merged = merge_and_persist(&output, existing, joined, &mut stats)?;

    let coverage = Coverage::of(&merged);
    println!("URIs with lyrics:");
    println!("{:<8} {:>8} {:>8}", "lyrics", "count", "percent");
    println!(
        "{:<8} {:>8} {:>7.1}%",
        "false",
        coverage.without_lyrics,
        100.0 - coverage.percent_with()
    );
    println!(
        "{:<8} {:>8} {:>7.1}%",
        "true",
        coverage.with_lyrics,
        coverage.percent_with()
    );
    println!("Total {}", coverage.total());
    println!("{:-<75}", "");

    report_run("glue", &mut stats, args.common.stats.as_deref(), start)
}
