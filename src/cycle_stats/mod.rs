//! Per cycle statistics. Works out which cycles need fetching, reads them from the contracts and
//! turns the raw fixed point values into rows ready for the CSV file.
mod store;

use std::ops::RangeInclusive;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{contracts::QReader, units::EthNewtype};

pub use store::{
    append_cycle_stats, latest_cycle, merge_cycle_stats, read_cycle_stats, rewrite_cycle_stats,
    StoreError,
};

/// Cycle entries are counted with two implied decimals.
const ENTRIES_PER_BATCH: u64 = 100;

pub const REPORT_DECIMALS: i32 = 3;

pub const CYCLE_STATS_HEADERS: [&str; 7] = [
    "Cycle",
    "ETH In Cycle",
    "Q Produced",
    "Total Batches",
    "Total Staked Q",
    "Change in Stake",
    "ETH Burned",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SyncMode {
    /// Fetch only the cycles after the last one saved, then merge them into the file.
    Incremental,
    /// Fetch every cycle from zero and rewrite the file.
    #[default]
    #[value(name = "full")]
    FullRebuild,
}

/// One row of `cycle_stats.csv`. Amounts are rounded to [`REPORT_DECIMALS`].
///
/// Older files named the stake column "Total Q Supply" and had no stake delta, both still read.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CycleStats {
    #[serde(rename = "Cycle")]
    pub cycle: u64,
    #[serde(rename = "ETH In Cycle")]
    pub eth_in_cycle: EthNewtype,
    #[serde(rename = "Q Produced")]
    pub q_produced: EthNewtype,
    #[serde(rename = "Total Batches")]
    pub total_batches: u64,
    #[serde(rename = "Total Staked Q", alias = "Total Q Supply")]
    pub total_staked_q: EthNewtype,
    #[serde(rename = "Change in Stake", default)]
    pub change_in_stake: EthNewtype,
    #[serde(rename = "ETH Burned")]
    pub eth_burned: EthNewtype,
}

pub fn resolve_cycle_range(
    mode: SyncMode,
    last_saved_cycle: Option<u64>,
    current_cycle: u64,
) -> Option<RangeInclusive<u64>> {
    match (mode, last_saved_cycle) {
        (SyncMode::FullRebuild, _) => Some(0..=current_cycle),
        // Without saved rows cycle 0 has not been fetched either, so start there rather than at 1.
        (SyncMode::Incremental, None) => Some(0..=current_cycle),
        (SyncMode::Incremental, Some(last_saved_cycle)) if current_cycle <= last_saved_cycle => {
            None
        }
        (SyncMode::Incremental, Some(last_saved_cycle)) => {
            Some(last_saved_cycle + 1..=current_cycle)
        }
    }
}

pub fn total_batches(total_entries_scaled: u64) -> u64 {
    total_entries_scaled / ENTRIES_PER_BATCH
}

/// Fetches stats for every cycle in `cycles`. The stake change of the first cycle is measured
/// against `previous_staked` when given, otherwise against the stake of the cycle before it.
pub async fn fetch_cycle_stats(
    reader: &impl QReader,
    cycles: RangeInclusive<u64>,
    previous_staked: Option<EthNewtype>,
) -> Result<Vec<CycleStats>> {
    let first_cycle = *cycles.start();
    info!(
        "fetching data for cycles {} to {}",
        first_cycle,
        cycles.end()
    );

    let mut previous_staked = match (first_cycle, previous_staked) {
        (0, _) => None,
        (_, Some(previous_staked)) => Some(previous_staked),
        (first_cycle, None) => {
            let staked = reader.summed_cycle_stakes(first_cycle - 1).await?;
            Some(EthNewtype::from(staked).round_dp(REPORT_DECIMALS))
        }
    };

    let mut all_stats = Vec::new();

    for cycle in cycles {
        debug!(cycle, "fetching data for cycle");

        let eth_in_cycle = reader.cycle_accrued_fees(cycle).await?;
        let q_produced = reader.reward_per_cycle(cycle).await?;
        let total_entries_scaled = reader.cycle_total_entries(cycle).await?;
        let eth_burned = reader.native_burned_per_cycle(cycle).await?;
        let total_staked = reader.summed_cycle_stakes(cycle).await?;

        let total_staked_q = EthNewtype::from(total_staked).round_dp(REPORT_DECIMALS);
        let change_in_stake = previous_staked
            .map(|previous_staked| (total_staked_q - previous_staked).round_dp(REPORT_DECIMALS))
            .unwrap_or_default();
        previous_staked = Some(total_staked_q);

        all_stats.push(CycleStats {
            cycle,
            eth_in_cycle: EthNewtype::from(eth_in_cycle).round_dp(REPORT_DECIMALS),
            q_produced: EthNewtype::from(q_produced).round_dp(REPORT_DECIMALS),
            total_batches: total_batches(total_entries_scaled),
            total_staked_q,
            change_in_stake,
            eth_burned: EthNewtype::from(eth_burned).round_dp(REPORT_DECIMALS),
        });
    }

    Ok(all_stats)
}
