use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use q_stats::{abi::reformat_abi_dir, log};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Rewrites explorer ABI downloads as plain pretty JSON", long_about = None)]
struct Args {
    #[arg(long, default_value = "abis")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    log::init();

    let args = Args::parse();

    let outcomes = reformat_abi_dir(&args.dir)?;
    info!(files = outcomes.len(), dir = %args.dir.display(), "done reformatting abis");

    Ok(())
}
