mod eth;
mod wei;

pub use eth::EthNewtype;
pub use wei::{WeiNewtype, WeiOutOfRange};

/// Contract amounts are fixed point with 18 decimals, the same scale as wei per ETH.
pub const WEI_PER_ETH: i128 = 1_000_000_000_000_000_000;
