pub mod abi;
pub mod contracts;
pub mod cycle_stats;
pub mod display;
pub mod env;
pub mod execution_node;
pub mod last_update;
pub mod log;
mod performance;
pub mod snapshot;
mod sync;
pub mod units;

pub use cycle_stats::SyncMode;
pub use sync::{run, sync_q_stats, SyncConfig, SyncSummary, CURRENT_CYCLE_FILE, CYCLE_STATS_FILE};
