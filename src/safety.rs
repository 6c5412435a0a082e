//! Safety checks run before a snapshot or export is overwritten.
//!
//! Snapshots are rewritten in full, so writing to the wrong path destroys
//! data. These checks catch an output that collides with a driver's input.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::SNAPSHOT_EXTENSION;

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - output filename must contain `required_pattern` (the snapshot name)
/// - output cannot be any of `source_paths`
/// - a snapshot output must carry the snapshot extension
pub fn validate_output_path(
    output: &Path,
    required_pattern: &str,
    source_paths: &[&Path],
) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    // Chart exports are inputs only
    if output.extension().and_then(|e| e.to_str()) == Some("csv") && output_name.contains("chart") {
        bail!(
            "Safety check failed: output '{}' looks like a chart export",
            output.display()
        );
    }

    Ok(())
}

/// [`validate_output_path`] for snapshot files.
pub fn validate_snapshot_output(output: &Path, name: &str, source_paths: &[&Path]) -> Result<()> {
    validate_output_path(output, name, source_paths)?;
    if output.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
        bail!(
            "Safety check failed: snapshot output '{}' must end in .{}",
            output.display(),
            SNAPSHOT_EXTENSION
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_snapshot_output() {
        let output = PathBuf::from("/data/lyrics_new.sqlite3");
        let source = PathBuf::from("/data/genius_metadata_new.sqlite3");
        assert!(validate_snapshot_output(&output, "lyrics", &[&source]).is_ok());
    }

    #[test]
    fn test_missing_pattern() {
        let output = PathBuf::from("/tmp/output.sqlite3");
        let source = PathBuf::from("/data/tracks.sqlite3");
        let result = validate_output_path(&output, "lyrics", &[&source]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must contain 'lyrics'"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/track_lyrics.sqlite3");
        let result = validate_output_path(&path, "lyrics", &[&path]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }

    #[test]
    fn test_chart_export_blocked() {
        let output = PathBuf::from("/data/mx_charts_csvs/chart_tracks.csv");
        assert!(validate_output_path(&output, "tracks", &[]).is_err());
    }

    #[test]
    fn test_snapshot_extension_required() {
        let output = PathBuf::from("/data/lyrics.csv");
        assert!(validate_snapshot_output(&output, "lyrics", &[]).is_err());
    }
}
