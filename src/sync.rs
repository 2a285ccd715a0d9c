//! The stats job. Fetches per cycle stats and the current snapshot, shows them, and saves them
//! next to a "last updated" marker.
//!
//! Failing to fetch aborts only the aggregator that failed, the job carries on with the next one.
//! Failing to write a file is an error for the whole job.
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info};

use crate::{
    abi::ContractAbis,
    contracts::{QContractsHttp, QReader},
    cycle_stats::{
        self, append_cycle_stats, read_cycle_stats, rewrite_cycle_stats, CycleStats, SyncMode,
    },
    display,
    env::ENV_CONFIG,
    execution_node::ExecutionNodeHttp,
    last_update,
    snapshot::{self, CurrentCycle},
};

pub const CYCLE_STATS_FILE: &str = "cycle_stats.csv";
pub const CURRENT_CYCLE_FILE: &str = "current_cycle.csv";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub burn_address: Address,
    pub mode: SyncMode,
    pub output_dir: PathBuf,
}

#[derive(Debug, Default, PartialEq)]
pub struct SyncSummary {
    /// Rows in the cycle stats file after this run, if it was written.
    pub cycle_rows: Option<usize>,
    pub snapshot: Option<CurrentCycle>,
    pub last_update: Option<String>,
}

async fn fetch_new_cycle_stats(
    reader: &impl QReader,
    mode: SyncMode,
    saved: &[CycleStats],
) -> Result<Option<Vec<CycleStats>>> {
    let current_cycle = reader.current_cycle().await?;
    let last_saved_cycle = cycle_stats::latest_cycle(saved);

    let cycles = match cycle_stats::resolve_cycle_range(mode, last_saved_cycle, current_cycle) {
        Some(cycles) => cycles,
        None => {
            info!(current_cycle, "no new cycles to fetch");
            return Ok(None);
        }
    };

    // The saved row right before the range is the stake baseline.
    let previous_staked = saved
        .iter()
        .find(|row| row.cycle + 1 == *cycles.start())
        .map(|row| row.total_staked_q);

    let all_stats = cycle_stats::fetch_cycle_stats(reader, cycles, previous_staked).await?;
    Ok(Some(all_stats))
}

async fn sync_cycle_stats(reader: &impl QReader, config: &SyncConfig) -> Result<Option<usize>> {
    let path = config.output_dir.join(CYCLE_STATS_FILE);

    let saved = match config.mode {
        SyncMode::Incremental => read_cycle_stats(&path)
            .with_context(|| format!("failed to read saved cycle stats from {}", path.display()))?,
        SyncMode::FullRebuild => vec![],
    };

    let all_stats = match fetch_new_cycle_stats(reader, config.mode, &saved).await {
        Ok(Some(all_stats)) => all_stats,
        Ok(None) => return Ok(None),
        Err(err) => {
            error!("error fetching cycle stats: {err:#}");
            return Ok(None);
        }
    };

    display::print_cycle_stats(&all_stats);

    let rows = match config.mode {
        SyncMode::Incremental => append_cycle_stats(&path, all_stats),
        SyncMode::FullRebuild => rewrite_cycle_stats(&path, &all_stats),
    }
    .with_context(|| format!("failed to write cycle stats to {}", path.display()))?;

    info!(rows, path = %path.display(), "saved cycle stats");
    Ok(Some(rows))
}

async fn sync_snapshot(reader: &impl QReader, config: &SyncConfig) -> Result<Option<CurrentCycle>> {
    let snapshot = match snapshot::fetch_snapshot(reader, config.burn_address).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!("error fetching current cycle snapshot: {err:#}");
            return Ok(None);
        }
    };

    display::print_snapshot(&snapshot);

    let path = config.output_dir.join(CURRENT_CYCLE_FILE);
    snapshot::write_snapshot(&path, &snapshot)
        .with_context(|| format!("failed to write snapshot to {}", path.display()))?;

    info!(path = %path.display(), "saved current cycle snapshot");
    Ok(Some(snapshot))
}

fn log_previous_update(output_dir: &Path) -> Result<()> {
    match last_update::read_last_update(output_dir).context("failed to read last update marker")? {
        Some(previous) => info!(%previous, "previous update"),
        None => info!("no previous update found"),
    }
    Ok(())
}

/// Runs both aggregators against `reader`. The last update marker is only refreshed when at
/// least one of them saved something.
pub async fn run(reader: &impl QReader, config: &SyncConfig) -> Result<SyncSummary> {
    log_previous_update(&config.output_dir)?;

    let cycle_rows = sync_cycle_stats(reader, config).await?;
    let snapshot = sync_snapshot(reader, config).await?;

    let last_update = if cycle_rows.is_some() || snapshot.is_some() {
        let timestamp = last_update::write_last_update(&config.output_dir, Utc::now())
            .context("failed to write last update marker")?;
        info!(%timestamp, "wrote last update marker");
        Some(timestamp)
    } else {
        None
    };

    Ok(SyncSummary {
        cycle_rows,
        snapshot,
        last_update,
    })
}

/// Runs the stats job with the environment's config against the configured RPC endpoint.
pub async fn sync_q_stats(mode: SyncMode) -> Result<()> {
    let abis = ContractAbis::load(&ENV_CONFIG.abi_dir)
        .with_context(|| format!("failed to load contract abis from {}", ENV_CONFIG.abi_dir))?;

    let node = ExecutionNodeHttp::new(&ENV_CONFIG.rpc_url);
    let chain_id = node
        .chain_id()
        .await
        .context("failed to connect to the ethereum network")?;
    info!(chain_id, ?mode, "connected to execution node");

    let burn_address = ENV_CONFIG
        .burn_address
        .parse::<Address>()
        .with_context(|| format!("invalid burn address {}", ENV_CONFIG.burn_address))?;

    let config = SyncConfig {
        burn_address,
        mode,
        output_dir: PathBuf::from(&ENV_CONFIG.output_dir),
    };

    let reader = QContractsHttp::new(node, abis);
    let summary = run(&reader, &config).await?;

    info!(
        cycle_rows = ?summary.cycle_rows,
        snapshot = summary.snapshot.is_some(),
        "q stats sync done"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use anyhow::anyhow;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        contracts::MockQReader,
        cycle_stats::tests::growing_stake_reader,
        units::{EthNewtype, WeiNewtype},
    };

    const BURN_ADDRESS: Address = address!("0x000000000000000000000000000000000000dEaD");

    fn config(mode: SyncMode, output_dir: &Path) -> SyncConfig {
        SyncConfig {
            burn_address: BURN_ADDRESS,
            mode,
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn reader_at_cycle(current_cycle: u64) -> MockQReader {
        let mut reader = growing_stake_reader();
        reader
            .expect_current_cycle()
            .returning(move || Ok(current_cycle));
        reader
            .expect_total_supply()
            .returning(|| Ok(WeiNewtype::from_eth(100)));
        reader
            .expect_balance_of()
            .returning(|_| Ok(WeiNewtype::from_eth(10)));
        reader
    }

    #[tokio::test]
    async fn full_rebuild_writes_every_cycle_test() {
        let dir = tempdir().unwrap();
        let config = config(SyncMode::FullRebuild, dir.path());

        let summary = run(&reader_at_cycle(4), &config).await.unwrap();

        assert_eq!(summary.cycle_rows, Some(5));
        let rows = read_cycle_stats(&dir.path().join(CYCLE_STATS_FILE)).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(dir.path().join(CURRENT_CYCLE_FILE).exists());
        assert!(dir.path().join(last_update::LAST_UPDATE_FILE).exists());
    }

    #[tokio::test]
    async fn full_rebuild_is_repeatable_test() {
        let dir = tempdir().unwrap();
        let config = config(SyncMode::FullRebuild, dir.path());

        run(&reader_at_cycle(6), &config).await.unwrap();
        let summary = run(&reader_at_cycle(2), &config).await.unwrap();

        assert_eq!(summary.cycle_rows, Some(3));
        let rows = read_cycle_stats(&dir.path().join(CYCLE_STATS_FILE)).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn incremental_fetches_only_new_cycles_test() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CYCLE_STATS_FILE);
        let saved: Vec<CycleStats> = (0..=2)
            .map(|cycle| cycle_stats::tests::cycle_stats(cycle, cycle as f64 + 1.0))
            .collect();
        rewrite_cycle_stats(&path, &saved).unwrap();

        let mut reader = growing_stake_reader_for(3..=4);
        reader.expect_current_cycle().returning(|| Ok(4));
        reader
            .expect_total_supply()
            .returning(|| Ok(WeiNewtype::from_eth(100)));
        reader
            .expect_balance_of()
            .returning(|_| Ok(WeiNewtype::from_eth(10)));

        let summary = run(&reader, &config(SyncMode::Incremental, dir.path()))
            .await
            .unwrap();

        assert_eq!(summary.cycle_rows, Some(5));
        let rows = read_cycle_stats(&path).unwrap();
        let cycles: Vec<u64> = rows.iter().map(|row| row.cycle).collect();
        assert_eq!(cycles, vec![0, 1, 2, 3, 4]);
        // Saved stake at cycle 2 was 3 Q, fetched stake at cycle 3 is 4 Q.
        assert_eq!(rows[3].change_in_stake, EthNewtype(1.0));
        assert_eq!(rows[2], saved[2]);
    }

    /// Stake grows by one Q per cycle. Asking for a cycle outside `cycles` fails the test.
    fn growing_stake_reader_for(cycles: std::ops::RangeInclusive<u64>) -> MockQReader {
        let wei = WeiNewtype::from_eth(1).0;
        let mut reader = MockQReader::new();
        let in_range = move |cycle: &u64| cycles.contains(cycle);
        reader
            .expect_cycle_accrued_fees()
            .withf(in_range.clone())
            .returning(move |_| Ok(WeiNewtype(wei)));
        reader
            .expect_reward_per_cycle()
            .withf(in_range.clone())
            .returning(move |_| Ok(WeiNewtype(wei)));
        reader
            .expect_cycle_total_entries()
            .withf(in_range.clone())
            .returning(|_| Ok(200));
        reader
            .expect_native_burned_per_cycle()
            .withf(in_range.clone())
            .returning(|_| Ok(WeiNewtype(0)));
        reader
            .expect_summed_cycle_stakes()
            .withf(in_range)
            .returning(move |cycle| Ok(WeiNewtype((cycle as i128 + 1) * wei)));
        reader
    }

    #[tokio::test]
    async fn incremental_nothing_new_test() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CYCLE_STATS_FILE);
        let saved: Vec<CycleStats> = (0..=4)
            .map(|cycle| cycle_stats::tests::cycle_stats(cycle, 1.0))
            .collect();
        rewrite_cycle_stats(&path, &saved).unwrap();

        let summary = run(&reader_at_cycle(4), &config(SyncMode::Incremental, dir.path()))
            .await
            .unwrap();

        assert_eq!(summary.cycle_rows, None);
        assert!(summary.snapshot.is_some());
        assert_eq!(read_cycle_stats(&path).unwrap(), saved);
    }

    #[tokio::test]
    async fn snapshot_overflow_skips_only_snapshot_test() {
        let dir = tempdir().unwrap();
        let mut reader = growing_stake_reader();
        reader.expect_current_cycle().returning(|| Ok(2));
        reader
            .expect_total_supply()
            .returning(|| Ok(WeiNewtype(i128::MAX)));
        reader
            .expect_balance_of()
            .returning(|_| Ok(WeiNewtype(0)));

        let summary = run(&reader, &config(SyncMode::FullRebuild, dir.path()))
            .await
            .unwrap();

        assert_eq!(summary.cycle_rows, Some(3));
        assert_eq!(summary.snapshot, None);
        assert!(summary.last_update.is_some());
        assert!(!dir.path().join(CURRENT_CYCLE_FILE).exists());
    }

    #[tokio::test]
    async fn failing_reads_skip_everything_test() {
        let dir = tempdir().unwrap();
        let mut reader = MockQReader::new();
        reader
            .expect_current_cycle()
            .returning(|| Err(anyhow!("connection refused")));

        let summary = run(&reader, &config(SyncMode::FullRebuild, dir.path()))
            .await
            .unwrap();

        assert_eq!(summary, SyncSummary::default());
        assert!(!dir.path().join(CYCLE_STATS_FILE).exists());
        assert!(!dir.path().join(CURRENT_CYCLE_FILE).exists());
        assert!(!dir.path().join(last_update::LAST_UPDATE_FILE).exists());
    }
}
