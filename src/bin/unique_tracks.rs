//! unique-tracks: collect distinct chart tracks into the tracks snapshot and
//! the deduplicated tracks CSV export.

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;
use tracing::info;

use chart_lyrics::chart::{append_tracks_csv, exclude_known, load_chart_tracks};
use chart_lyrics::config::{snapshot_path, CommonArgs, Variant, TRACKS};
use chart_lyrics::logging;
use chart_lyrics::models::{RunStats, TrackRecord};
use chart_lyrics::pipeline::{merge_and_persist, report_run};
use chart_lyrics::progress::set_log_only;
use chart_lyrics::safety::{validate_output_path, validate_snapshot_output};
use chart_lyrics::store::{load_required, load_snapshot};

#[derive(Parser)]
#[command(name = "unique-tracks")]
#[command(about = "Deduplicate chart CSVs into the tracks snapshot and CSV export")]
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

    let chart_dir = args.common.chart_dir();
    let output = args.common.snapshot_path(TRACKS);
    let export = args.common.tracks_csv();
    validate_snapshot_output(&output, TRACKS, &[])?;
    validate_output_path(&export, "deduped_tracks", &[])?;

    let mut tracks = load_chart_tracks(&chart_dir)
        .with_context(|| format!("Failed to read charts from {}", chart_dir.display()))?;

    if args.common.variant == Variant::New {
        let old_path = snapshot_path(&args.common.data_dir, TRACKS, Variant::Old);
        let old = load_required::<TrackRecord>(&old_path).with_context(|| {
            format!("New charts need the old tracks snapshot {}", old_path.display())
        })?;
        let excluded = exclude_known(&mut tracks, &old);
        info!("Excluded {} tracks already in old charts", excluded);
    }
    stats.work_set = tracks.len();

    let existing = load_snapshot::<TrackRecord>(&output)
        .with_context(|| format!("Failed to load snapshot {}", output.display()))?;
    stats.snapshot_records = existing.as_ref().map_or(0, |s| s.len());

    let appended = append_tracks_csv(&export, &tracks)
        .with_context(|| format!("Failed to update {}", export.display()))?;
    if appended == 0 {
        info!("Nothing new to append to {}", export.display());
    } else {
        info!("Appended {} tracks to {}", appended, export.display());
    }

    merge_and_persist(&output, existing, tracks, &mut stats)?;
    report_run("unique-tracks", &mut stats, args.common.stats.as_deref(), start)
}
