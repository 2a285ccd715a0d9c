use std::fmt;

use alloy_primitives::U256;
use thiserror::Error;

use super::WEI_PER_ETH;

/// A raw, 18 decimal fixed point amount as returned by a contract read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct WeiNewtype(pub i128);

#[derive(Debug, Error, PartialEq)]
#[error("{0} does not fit in a wei amount")]
pub struct WeiOutOfRange(pub U256);

impl WeiNewtype {
    pub fn from_eth(eth: i128) -> Self {
        Self(eth * WEI_PER_ETH)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl TryFrom<U256> for WeiNewtype {
    type Error = WeiOutOfRange;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        u128::try_from(value)
            .ok()
            .and_then(|amount| i128::try_from(amount).ok())
            .map(Self)
            .ok_or(WeiOutOfRange(value))
    }
}

impl fmt::Display for WeiNewtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}
