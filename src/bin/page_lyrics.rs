//! page-lyrics: scrape the lyrics page of every metadata url without lyrics
//! yet, and upsert the results into the lyrics snapshot.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use chart_lyrics::config::{ApiArgs, CommonArgs, GENIUS_METADATA, LYRICS};
use chart_lyrics::http::HttpClient;
use chart_lyrics::logging;
use chart_lyrics::models::{LyricsRecord, MetadataRecord, RunStats};
use chart_lyrics::pipeline::{merge_and_persist, report_run, run_work_set};
use chart_lyrics::progress::set_log_only;
use chart_lyrics::reconcile::{missing_keys, Snapshot};
use chart_lyrics::resolver::{LyricsQuery, LyricsResolver};
use chart_lyrics::safety::validate_snapshot_output;
use chart_lyrics::store::{load_required, load_snapshot};

#[derive(Parser)]
#[command(name = "page-lyrics")]
#[command(about = "Scrape lyrics pages for metadata urls and upsert the lyrics snapshot")]
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

    let input = args.common.snapshot_path(GENIUS_METADATA);
    let output = args.common.snapshot_path(LYRICS);
    validate_snapshot_output(&output, LYRICS, &[&input])?;

    let metadata = load_required::<MetadataRecord>(&input)
        .with_context(|| format!("Failed to load metadata snapshot {}", input.display()))?;
    let existing = load_snapshot::<LyricsRecord>(&output)
        .with_context(|| format!("Failed to load snapshot {}", output.display()))?;
    let empty = Snapshot::new();
    let snapshot = existing.as_ref().unwrap_or(&empty);
    stats.snapshot_records = snapshot.len();

    let mut work = missing_keys(snapshot, metadata.iter().map(|m| m.url.as_str()));
    if let Some(limit) = args.api.limit {
        work.truncate(limit);
    }
    stats.work_set = work.len();
    info!("Total records to query lyrics: {}", stats.work_set);
    if work.is_empty() {
        return report_run("page-lyrics", &mut stats, args.common.stats.as_deref(), start);
    }

    let http = Arc::new(HttpClient::new(&args.api.http_settings()));
    let resolver = LyricsResolver::from_settings(&args.api.resolver_settings(), http);

    let resolutions = run_work_set("Scraping lyrics", &work, args.api.workers, |url| {
        resolver.resolve(LyricsQuery::Page { url })
    })?;

    let batch: Vec<LyricsRecord> = work
        .into_iter()
        .zip(resolutions)
        .map(|(url, resolution)| {
            stats.record(&resolution);
            if !resolution.is_resolved() {
                info!("{} does not have lyrics on the lyrics site", url);
            }
            LyricsRecord {
                url,
                lyrics_source: resolution.provenance(),
                lyrics: resolution.lyrics().map(str::to_string),
            }
        })
        .collect();

    merge_and_persist(&output, existing, batch, &mut stats)?;
    report_run("page-lyrics", &mut stats, args.common.stats.as_deref(), start)
}
