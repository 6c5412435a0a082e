//! track-metadata: search the lyrics metadata API for every search term that
//! has no accepted hit yet. Hits are upserted by url, and every looked-up term
//! gets a link to its hit's url (or to none, to be retried).

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use chart_lyrics::config::{ApiArgs, CommonArgs, GENIUS_METADATA, SEARCH_TERMS, TRACKS};
use chart_lyrics::http::HttpClient;
use chart_lyrics::logging;
use chart_lyrics::models::{MetadataRecord, RunStats, SearchTermRecord, TrackRecord};
use chart_lyrics::pipeline::{
    merge_and_persist, metadata_batches, metadata_work_set, report_run, run_work_set,
};
use chart_lyrics::progress::set_log_only;
use chart_lyrics::resolver::LyricsResolver;
use chart_lyrics::safety::validate_snapshot_output;
use chart_lyrics::store::{load_required, load_snapshot};

#[derive(Parser)]
#[command(name = "track-metadata")]
#[command(about = "Fetch lyrics metadata for chart tracks and upsert the metadata snapshot")]
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

    let input = args.common.snapshot_path(TRACKS);
    let output = args.common.snapshot_path(GENIUS_METADATA);
    let terms_output = args.common.snapshot_path(SEARCH_TERMS);
    validate_snapshot_output(&output, GENIUS_METADATA, &[&input])?;
    validate_snapshot_output(&terms_output, SEARCH_TERMS, &[&input, &output])?;

    let tracks = load_required::<TrackRecord>(&input)
        .with_context(|| format!("Failed to load tracks snapshot {}", input.display()))?;
    let existing = load_snapshot::<MetadataRecord>(&output)
        .with_context(|| format!("Failed to load snapshot {}", output.display()))?;
    let terms = load_snapshot::<SearchTermRecord>(&terms_output)
        .with_context(|| format!("Failed to load snapshot {}", terms_output.display()))?
        .unwrap_or_default();
    stats.snapshot_records = existing.as_ref().map_or(0, |s| s.len());

    let work = metadata_work_set(&tracks, &terms, args.api.limit);
    stats.work_set = work.len();
    info!(
        "{} metadata records, {} of {} search terms linked, {} to look up",
        stats.snapshot_records,
        terms.resolved_count(),
        terms.len(),
        stats.work_set
    );

    let http = Arc::new(HttpClient::new(&args.api.http_settings()));
    let resolver = LyricsResolver::from_settings(&args.api.resolver_settings(), http);
    if work.is_empty() || !resolver.has_metadata_search() {
        if !work.is_empty() {
            warn!("No metadata search configured; nothing fetched");
        }
        return report_run("track-metadata", &mut stats, args.common.stats.as_deref(), start);
    }

    let hits = run_work_set("Fetching metadata", &work, args.api.workers, |track| {
        resolver.find_track_hit(track)
    })?;

    let (found, links) = metadata_batches(&work, hits);
    stats.resolved = found.len();
    stats.unresolved = stats.work_set - stats.resolved;
    info!("{} of {} search terms got an accepted hit", stats.resolved, stats.work_set);

    merge_and_persist(&output, existing, found, &mut stats)?;
    let mut term_stats = RunStats::default();
    merge_and_persist(&terms_output, Some(terms), links, &mut term_stats)?;
    info!(
        "Search term links: {} added, {} updated",
        term_stats.added, term_stats.updated
    );
    report_run("track-metadata", &mut stats, args.common.stats.as_deref(), start)
}
