//! chart-lyrics: resolve lyrics for every deduplicated chart track through the
//! full strategy chain and upsert them into the chart lyrics snapshot.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use chart_lyrics::chart::read_tracks_csv;
use chart_lyrics::config::{ApiArgs, CommonArgs, CHART_LYRICS};
use chart_lyrics::http::HttpClient;
use chart_lyrics::models::{ChartLyricsRecord, RunStats, TrackRecord};
use chart_lyrics::pipeline::{chart_work_set, merge_and_persist, report_run, run_work_set};
use chart_lyrics::progress::set_log_only;
use chart_lyrics::reconcile::Snapshot;
use chart_lyrics::resolver::{LyricsQuery, LyricsResolver};
use chart_lyrics::safety::validate_snapshot_output;
use chart_lyrics::store::load_snapshot;
use chart_lyrics::{join::Coverage, logging};

#[derive(Parser)]
#[command(name = "chart-lyrics")]
#[command(
    about = "Resolve lyrics for deduplicated chart tracks and upsert the chart lyrics snapshot"
)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    api: ApiArgs,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();
    set_log_only(args.common.log_only);

    let start = Instant::now();
    let mut stats = RunStats::default();

    let input = args.common.tracks_csv();
    if !input.exists() {
        bail!(
            "Missing tracks export {} (run unique-tracks first)",
            input.display()
        );
    }
    let output = args.common.snapshot_path(CHART_LYRICS);
    validate_snapshot_output(&output, CHART_LYRICS, &[&input])?;

    let tracks: Snapshot<TrackRecord> = Snapshot::from_records(
        read_tracks_csv(&input).with_context(|| format!("Failed to read {}", input.display()))?,
    );
    info!("Read {} tracks from {}", tracks.len(), input.display());

    let existing = load_snapshot::<ChartLyricsRecord>(&output)
        .with_context(|| format!("Failed to load snapshot {}", output.display()))?;
    let empty = Snapshot::new();
    let snapshot = existing.as_ref().unwrap_or(&empty);
    stats.snapshot_records = snapshot.len();

    let work_tracks = chart_work_set(snapshot, &tracks, args.api.limit);
    stats.work_set = work_tracks.len();

    info!(
        "{} records in snapshot, {} tracks to resolve",
        stats.snapshot_records, stats.work_set
    );
    if work_tracks.is_empty() {
        info!("Nothing to resolve");
        return report_run("chart-lyrics", &mut stats, args.common.stats.as_deref(), start);
    }

    let http = Arc::new(HttpClient::new(&args.api.http_settings()));
    let resolver = LyricsResolver::from_settings(&args.api.resolver_settings(), http);

    let resolutions = run_work_set("Resolving lyrics", &work_tracks, args.api.workers, |track| {
        resolver.resolve(LyricsQuery::Search {
            search_term: &track.search_term,
            title: &track.track_name,
        })
    })?;

    let batch: Vec<ChartLyricsRecord> = work_tracks
        .iter()
        .zip(resolutions)
        .map(|(track, resolution)| {
            stats.record(&resolution);
            ChartLyricsRecord::from_resolution(track, &resolution)
        })
        .collect();

    let merged = merge_and_persist(&output, existing, batch, &mut stats)?;
    let coverage = Coverage::of(&merged);
    info!(
        "{} of {} tracks have lyrics ({:.1}%)",
        coverage.with_lyrics,
        coverage.total(),
        coverage.percent_with()
    );

    report_run("chart-lyrics", &mut stats, args.common.stats.as_deref(), start)
}
