//! Terminal tables for freshly fetched stats. Values are printed green, headers and borders plain.
use std::fmt::Display;

use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::{
    cycle_stats::{CycleStats, CYCLE_STATS_HEADERS},
    snapshot::CurrentCycle,
};

fn green(value: impl Display) -> String {
    style(value).green().to_string()
}

pub fn cycle_stats_table(all_stats: &[CycleStats]) -> Option<String> {
    if all_stats.is_empty() {
        return None;
    }

    let mut builder = Builder::default();
    builder.push_record(CYCLE_STATS_HEADERS);
    for stats in all_stats {
        builder.push_record([
            stats.cycle.to_string(),
            green(stats.eth_in_cycle),
            green(stats.q_produced),
            green(stats.total_batches),
            green(stats.total_staked_q),
            green(stats.change_in_stake),
            green(stats.eth_burned),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::ascii());
    Some(table.to_string())
}

pub fn snapshot_table(snapshot: &CurrentCycle) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Metric", "Value"]);
    builder.push_record(["Current Cycle".to_string(), green(snapshot.current_cycle)]);
    builder.push_record([
        "Total Circulating Supply".to_string(),
        green(snapshot.total_circulating_supply),
    ]);
    builder.push_record(["Total Staked Q".to_string(), green(snapshot.total_staked_q)]);
    builder.push_record(["Total Supply".to_string(), green(snapshot.total_supply)]);
    builder.push_record(["Total Q Burned".to_string(), green(snapshot.total_q_burned)]);
    builder.push_record([
        "Percentage Staked".to_string(),
        green(format!("{}%", snapshot.percentage_staked)),
    ]);
    builder.push_record(["ETH in Cycle".to_string(), green(snapshot.eth_in_cycle)]);

    let mut table = builder.build();
    table.with(Style::ascii());
    table.to_string()
}

pub fn print_cycle_stats(all_stats: &[CycleStats]) {
    match cycle_stats_table(all_stats) {
        Some(table) => println!("{table}"),
        None => println!("No stats to display."),
    }
}

pub fn print_snapshot(snapshot: &CurrentCycle) {
    println!("{}", snapshot_table(snapshot));
}
