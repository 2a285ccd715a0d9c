//! The human readable "last updated" marker written next to the CSV files.
//!
//! The marker gets committed alongside the reports, so it sometimes comes back with merge
//! conflict markers in it. In that case the greatest line carrying a 2024 timestamp wins. The
//! year is hardcoded, later timestamps are not recognized inside a conflicted file.
use std::{fs, path::Path};

use chrono::{DateTime, Utc};

use crate::cycle_stats::StoreError;

pub const LAST_UPDATE_FILE: &str = "last_update.txt";
pub const LAST_UPDATE_TEMP_FILE: &str = "last_update_temp.txt";

const CONFLICT_MARKER: &str = "<<<<<";
const CONFLICT_RESOLUTION_PREFIX: &str = "2024-";

pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn resolve_last_update(content: &str) -> Option<String> {
    if content.contains(CONFLICT_MARKER) {
        return content
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with(CONFLICT_RESOLUTION_PREFIX))
            .max()
            .map(str::to_string);
    }

    let trimmed = content.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn read_last_update(dir: &Path) -> Result<Option<String>, StoreError> {
    let path = dir.join(LAST_UPDATE_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    Ok(resolve_last_update(&content))
}

/// Writes the marker to a temp file first, then moves it over the previous marker.
pub fn write_last_update(dir: &Path, now: DateTime<Utc>) -> Result<String, StoreError> {
    let timestamp = format_timestamp(now);
    let temp_path = dir.join(LAST_UPDATE_TEMP_FILE);
    fs::write(&temp_path, format!("{timestamp}\n"))?;
    fs::rename(&temp_path, dir.join(LAST_UPDATE_FILE))?;
    Ok(timestamp)
}
