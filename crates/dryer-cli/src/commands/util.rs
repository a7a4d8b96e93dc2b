//! Shared utilities for CLI commands.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use dryer_core::Series;
use dryer_core::pivot::parse_log_timestamp;
use dryer_io::{Loaded, TableError};

/// Parses a `YYYY-MM-DD HH:MM:SS` argument.
pub fn parse_log_time(raw: &str) -> Result<NaiveDateTime, String> {
    parse_log_timestamp(raw).ok_or_else(|| format!("expected YYYY-MM-DD HH:MM:SS, got {raw:?}"))
}

/// Loads a `Date`/`Time` table, failing the command on any file error.
pub fn load_series(path: &Path) -> Result<Loaded<Series>> {
    dryer_io::load_series(path).with_context(|| format!("failed to load {}", path.display()))
}

/// Creates `path` and hands it to `write`.
pub fn save<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(BufWriter<File>) -> Result<(), TableError>,
{
    let file = dryer_io::create_file(path)?;
    write(file).with_context(|| format!("failed to write {}", path.display()))
}

/// File name of `path` without its extension.
pub fn stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_time() {
        assert!(parse_log_time("2024-08-07 22:54:11").is_ok());
        assert!(parse_log_time("07-08-2024 22:54:11").is_err());
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem(Path::new("input/mode.csv")), "mode");
    }
}
