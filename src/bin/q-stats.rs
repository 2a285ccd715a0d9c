use anyhow::Result;
use clap::Parser;
use q_stats::{log, SyncMode};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetches Q protocol cycle stats into CSV files", long_about = None)]
struct Args {
    /// full refetches every cycle, incremental only the ones after the last saved cycle.
    #[arg(long, value_enum, default_value_t = SyncMode::FullRebuild)]
    mode: SyncMode,
}

#[tokio::main]
async fn main() -> Result<()> {
    log::init();

    let args = Args::parse();

    q_stats::sync_q_stats(args.mode).await
}
