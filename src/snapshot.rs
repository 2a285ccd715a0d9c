//! The "as of now" view of the protocol: supply, stake and burn at the current cycle.
use std::path::Path;

use alloy_primitives::Address;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    contracts::QReader,
    cycle_stats::{StoreError, REPORT_DECIMALS},
    units::EthNewtype,
};

const PERCENTAGE_DECIMALS: i32 = 2;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CurrentCycle {
    #[serde(rename = "Current Cycle")]
    pub current_cycle: u64,
    #[serde(rename = "Total Circulating Supply")]
    pub total_circulating_supply: EthNewtype,
    #[serde(rename = "Total Staked Q")]
    pub total_staked_q: EthNewtype,
    #[serde(rename = "Total Supply")]
    pub total_supply: EthNewtype,
    #[serde(rename = "Total Q Burned")]
    pub total_q_burned: EthNewtype,
    #[serde(rename = "Percentage Staked")]
    pub percentage_staked: f64,
    #[serde(rename = "ETH in Cycle")]
    pub eth_in_cycle: EthNewtype,
}

/// Share of the circulating supply that is staked, in percent. Zero when nothing circulates.
pub fn percentage_staked(staked: EthNewtype, circulating: EthNewtype) -> f64 {
    if circulating.0 == 0.0 {
        return 0.0;
    }

    EthNewtype(staked.0 / circulating.0 * 100.0)
        .round_dp(PERCENTAGE_DECIMALS)
        .0
}

pub async fn fetch_snapshot(reader: &impl QReader, burn_address: Address) -> Result<CurrentCycle> {
    info!("fetching current cycle snapshot");

    let current_cycle = reader.current_cycle().await?;
    let total_supply = reader.total_supply().await?;
    let staked = reader.summed_cycle_stakes(current_cycle).await?;
    let burned = reader.balance_of(burn_address).await?;
    let eth_in_cycle = reader.cycle_accrued_fees(current_cycle).await?;

    // Staked tokens leave the token contract's supply, burned ones stay in it.
    let circulating = total_supply
        .checked_add(staked)
        .and_then(|supply| supply.checked_sub(burned))
        .map(EthNewtype::from)
        .ok_or_else(|| {
            anyhow!("circulating supply out of range: {total_supply} + {staked} - {burned}")
        })?;
    let staked = EthNewtype::from(staked);
    debug!(current_cycle, %circulating, %staked, "fetched snapshot amounts");

    Ok(CurrentCycle {
        current_cycle,
        total_circulating_supply: circulating.round_dp(REPORT_DECIMALS),
        total_staked_q: staked.round_dp(REPORT_DECIMALS),
        total_supply: EthNewtype::from(total_supply).round_dp(REPORT_DECIMALS),
        total_q_burned: EthNewtype::from(burned).round_dp(REPORT_DECIMALS),
        percentage_staked: percentage_staked(staked, circulating),
        eth_in_cycle: EthNewtype::from(eth_in_cycle).round_dp(REPORT_DECIMALS),
    })
}

/// Overwrites the single row snapshot file.
pub fn write_snapshot(path: &Path, snapshot: &CurrentCycle) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.serialize(snapshot)?;
    writer.flush()?;
    Ok(())
}
