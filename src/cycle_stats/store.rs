use std::{collections::BTreeMap, fs, io, path::Path};

use thiserror::Error;
use tracing::debug;

use super::CycleStats;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access stats file")]
    Io(#[from] io::Error),
    #[error("failed to read or write csv")]
    Csv(#[from] csv::Error),
}

/// Reads every saved row. A missing file means nothing has been saved yet.
pub fn read_cycle_stats(path: &Path) -> Result<Vec<CycleStats>, StoreError> {
    if !path.exists() {
        return Ok(vec![]);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let rows = reader
        .deserialize::<CycleStats>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn latest_cycle(rows: &[CycleStats]) -> Option<u64> {
    rows.iter().map(|row| row.cycle).max()
}

/// Combines saved and freshly fetched rows keyed by cycle, the fresh row wins. Sorted by cycle.
pub fn merge_cycle_stats(existing: Vec<CycleStats>, new: Vec<CycleStats>) -> Vec<CycleStats> {
    let mut by_cycle = BTreeMap::new();
    for row in existing.into_iter().chain(new) {
        by_cycle.insert(row.cycle, row);
    }
    by_cycle.into_values().collect()
}

fn write_cycle_stats(path: &Path, rows: &[CycleStats]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Merges `rows` into the file at `path`, returns the number of rows now in the file.
pub fn append_cycle_stats(path: &Path, rows: Vec<CycleStats>) -> Result<usize, StoreError> {
    let existing = read_cycle_stats(path)?;
    let merged = merge_cycle_stats(existing, rows);
    write_cycle_stats(path, &merged)?;
    debug!(path = %path.display(), rows = merged.len(), "appended cycle stats");
    Ok(merged.len())
}

/// Throws away whatever is at `path` and writes `rows` in its place.
pub fn rewrite_cycle_stats(path: &Path, rows: &[CycleStats]) -> Result<usize, StoreError> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    write_cycle_stats(path, rows)?;
    debug!(path = %path.display(), rows = rows.len(), "rewrote cycle stats");
    Ok(rows.len())
}
