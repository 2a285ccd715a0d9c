use std::{
    fmt::Display,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

use super::{WeiNewtype, WEI_PER_ETH};

/// A human readable amount, ETH or Q, scaled down from an 18 decimal fixed point amount. Use
/// WeiNewtype to do exact arithmetic, converting to this type only when reporting.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EthNewtype(pub f64);

impl EthNewtype {
    /// Round to `decimal_places`, exact ties go to the even digit.
    pub fn round_dp(self, decimal_places: i32) -> Self {
        let EthNewtype(amount) = self;
        let factor = 10f64.powi(decimal_places);
        EthNewtype((amount * factor).round_ties_even() / factor)
    }
}

impl Add for EthNewtype {
    type Output = Self;

    fn add(self, EthNewtype(rhs): Self) -> Self::Output {
        let EthNewtype(lhs) = self;
        EthNewtype(lhs + rhs)
    }
}

impl Sub for EthNewtype {
    type Output = Self;

    fn sub(self, EthNewtype(rhs): Self) -> Self::Output {
        let EthNewtype(lhs) = self;
        EthNewtype(lhs - rhs)
    }
}

// Debug formatting keeps the trailing `.0` on whole amounts, matching the CSV output.
impl Display for EthNewtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let EthNewtype(amount) = self;
        write!(f, "{amount:?}")
    }
}

/// NOTE: this loses precision.
impl From<WeiNewtype> for EthNewtype {
    fn from(WeiNewtype(amount): WeiNewtype) -> Self {
        EthNewtype(amount as f64 / WEI_PER_ETH as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_from_wei_test() {
        let eth = EthNewtype::from(WeiNewtype(1_500_000_000_000_000_000));
        assert_eq!(eth, EthNewtype(1.5));
    }

    #[test]
    fn round_dp_test() {
        let eth = EthNewtype::from(WeiNewtype(1_234_567_890_000_000_000));
        assert_eq!(eth.round_dp(3), EthNewtype(1.235));
        assert_eq!(EthNewtype(12.3456).round_dp(2), EthNewtype(12.35));
        assert_eq!(EthNewtype(-0.0004).round_dp(3), EthNewtype(-0.0));
    }

    #[test]
    fn round_dp_ties_to_even_test() {
        let eth = EthNewtype::from(WeiNewtype(62_500_000_000_000_000));
        assert_eq!(eth.round_dp(3), EthNewtype(0.062));
        assert_eq!(EthNewtype(12.125).round_dp(2), EthNewtype(12.12));
        assert_eq!(EthNewtype(12.375).round_dp(2), EthNewtype(12.38));
    }

    #[test]
    fn tiny_amounts_round_to_zero_test() {
        let eth = EthNewtype::from(WeiNewtype(499_999_999_999_999)).round_dp(3);
        assert_eq!(eth, EthNewtype(0.0));
    }

    #[test]
    fn display_keeps_decimal_point_test() {
        assert_eq!(EthNewtype(2.0).to_string(), "2.0");
        assert_eq!(EthNewtype(0.1).to_string(), "0.1");
    }

    #[test]
    fn sub_test() {
        assert_eq!(
            (EthNewtype(5.0) - EthNewtype(4.123)).round_dp(3),
            EthNewtype(0.877)
        );
    }
}
