//! Command-line configuration shared by every binary.
//!
//! Each binary flattens [`CommonArgs`] into its own parser; binaries that talk
//! to upstream APIs also flatten [`ApiArgs`]. Credentials come from the
//! environment unless given as flags.

use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::genius::GENIUS_API_BASE;
use crate::http::HttpSettings;
use crate::resolver::ResolverSettings;

// ============================================================================
// Snapshot Names
// ============================================================================

pub const TRACKS: &str = "tracks";
pub const GENIUS_METADATA: &str = "genius_metadata";
pub const SEARCH_TERMS: &str = "search_terms";
pub const LYRICS: &str = "lyrics";
pub const CHART_LYRICS: &str = "chart_lyrics";
pub const TRACK_LYRICS: &str = "track_lyrics";

pub const SNAPSHOT_NAMES: [&str; 6] = [
    TRACKS,
    GENIUS_METADATA,
    SEARCH_TERMS,
    LYRICS,
    CHART_LYRICS,
    TRACK_LYRICS,
];

pub const SNAPSHOT_EXTENSION: &str = "sqlite3";

/// Which chart family a run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    Old,
    New,
}

impl Variant {
    /// File name suffix for everything this variant reads and writes.
    pub fn suffix(self) -> &'static str {
        match self {
            Variant::Old => "",
            Variant::New => "_new",
        }
    }
}

// ============================================================================
// Argument Groups
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory holding chart CSVs, snapshots and exports
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Chart family: old (no suffix) or new ("_new" suffix)
    #[arg(long, value_enum, default_value_t = Variant::Old)]
    pub variant: Variant,

    /// Log-only mode: no progress bars, periodic log lines instead
    #[arg(long)]
    pub log_only: bool,

    /// Write run statistics as JSON to this file
    #[arg(long)]
    pub stats: Option<PathBuf>,
}

impl CommonArgs {
    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        snapshot_path(&self.data_dir, name, self.variant)
    }

    pub fn chart_dir(&self) -> PathBuf {
        self.data_dir
            .join(format!("mx_charts_csvs{}", self.variant.suffix()))
    }

    pub fn tracks_csv(&self) -> PathBuf {
        self.data_dir
            .join(format!("deduped_tracks{}.csv", self.variant.suffix()))
    }
}

pub fn snapshot_path(data_dir: &Path, name: &str, variant: Variant) -> PathBuf {
    data_dir.join(format!("{}{}.{}", name, variant.suffix(), SNAPSHOT_EXTENSION))
}

#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// Genius API access token (disables Genius strategies when absent)
    #[arg(long, env = "GENIUS_ACCESS_TOKEN", hide_env_values = true)]
    pub genius_token: Option<String>,

    #[arg(long, env = "GENIUS_API_BASE", default_value = GENIUS_API_BASE)]
    pub genius_base_url: String,

    /// RapidAPI key (disables secondary lyrics strategies when absent)
    #[arg(long, env = "RAPID_API_KEY", hide_env_values = true)]
    pub rapidapi_key: Option<String>,

    /// RapidAPI host header of the secondary lyrics API
    #[arg(long, env = "RAPID_API_HOST")]
    pub rapidapi_host: Option<String>,

    /// Override the secondary lyrics API base url (defaults to https://<host>)
    #[arg(long)]
    pub rapidapi_base_url: Option<String>,

    #[arg(long, default_value = "2")]
    pub requests_per_second: u32,

    /// Retries for transient upstream failures
    #[arg(long, default_value = "1")]
    pub max_retries: u32,

    #[arg(long, default_value = "20")]
    pub timeout_secs: u64,

    /// Parallel fetch workers (0 or 1 = sequential)
    #[arg(long, default_value = "0")]
    pub workers: usize,

    /// Only process the first N work-set entries
    #[arg(long)]
    pub limit: Option<usize>,
}

impl ApiArgs {
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            requests_per_second: self.requests_per_second,
            max_retries: self.max_retries,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            genius_base_url: self.genius_base_url.clone(),
            genius_token: self.genius_token.clone(),
            rapidapi_host: self.rapidapi_host.clone(),
            rapidapi_base_url: self.rapidapi_base_url.clone(),
            rapidapi_key: self.rapidapi_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        api: ApiArgs,
    }

    #[test]
    fn test_variant_paths() {
        let cli = TestCli::parse_from(["test", "--data-dir", "/data", "--variant", "new"]);
        assert_eq!(
            cli.common.snapshot_path(LYRICS),
            PathBuf::from("/data/lyrics_new.sqlite3")
        );
        assert_eq!(cli.common.chart_dir(), PathBuf::from("/data/mx_charts_csvs_new"));
        assert_eq!(cli.common.tracks_csv(), PathBuf::from("/data/deduped_tracks_new.csv"));
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.common.variant, Variant::Old);
        assert_eq!(
            cli.common.snapshot_path(TRACKS),
            PathBuf::from("./tracks.sqlite3")
        );
        let http = cli.api.http_settings();
        assert_eq!(http.requests_per_second, 2);
        assert_eq!(http.max_retries, 1);
        assert_eq!(http.timeout, Duration::from_secs(20));
    }
}
