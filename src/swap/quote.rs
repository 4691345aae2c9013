//! Swap quote math
//!
//! Everything here is integer arithmetic on raw token units. Minimum outputs
//! are always rounded down.

use crate::config::BPS_DENOMINATOR;
use crate::{Error, Result};
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Uniswap V2 charges 0.3% on the input amount
const FEE_NUMERATOR: u64 = 997;
const FEE_DENOMINATOR: u64 = 1_000;

/// Slippage tolerance in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageTolerance(u32);

impl SlippageTolerance {
    /// 0.5%
    pub const DEFAULT: Self = Self(50);

    pub fn from_bps(bps: u32) -> Result<Self> {
        if bps >= BPS_DENOMINATOR {
            return Err(Error::InvalidArgument(format!(
                "Slippage of {} bps leaves no minimum output",
                bps
            )));
        }
        Ok(Self(bps))
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// `floor(expected_out * (10000 - bps) / 10000)`
    pub fn minimum_out(&self, expected_out: U256) -> U256 {
        let keep = U256::from(BPS_DENOMINATOR - self.0);
        expected_out.saturating_mul(keep) / U256::from(BPS_DENOMINATOR)
    }
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Constant-product output for an exact input, after the LP fee
///
/// Returns `None` when either reserve is empty.
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Option<U256> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }

    let amount_in_with_fee = amount_in.checked_mul(U256::from(FEE_NUMERATOR))?;
    let numerator = amount_in_with_fee.checked_mul(reserve_out)?;
    let denominator = reserve_in
        .checked_mul(U256::from(FEE_DENOMINATOR))?
        .checked_add(amount_in_with_fee)?;

    Some(numerator / denominator)
}

/// A priced swap, consumed by exactly one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    pub amount_in: U256,
    pub expected_out: U256,
    pub amount_out_minimum: U256,
    pub slippage: SlippageTolerance,
}

impl SwapQuote {
    pub fn new(amount_in: U256, expected_out: U256, slippage: SlippageTolerance) -> Self {
        Self {
            amount_in,
            expected_out,
            amount_out_minimum: slippage.minimum_out(expected_out),
            slippage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_out_half_percent() {
        let tolerance = SlippageTolerance::DEFAULT;
        assert_eq!(tolerance.minimum_out(U256::from(1000u64)), U256::from(995u64));
    }

    #[test]
    fn test_minimum_out_rounds_down() {
        let tolerance = SlippageTolerance::DEFAULT;
        // 999 * 9950 / 10000 = 994.005
        assert_eq!(tolerance.minimum_out(U256::from(999u64)), U256::from(994u64));
        // 1 * 9950 / 10000 = 0.995
        assert_eq!(tolerance.minimum_out(U256::from(1u64)), U256::ZERO);
    }

    #[test]
    fn test_minimum_out_matches_formula_for_wei_amounts() {
        let tolerance = SlippageTolerance::DEFAULT;
        let expected = U256::from(123_456_789_012_345_678u128);
        let min = tolerance.minimum_out(expected);
        assert_eq!(
            min,
            expected * U256::from(9950u64) / U256::from(10_000u64)
        );
        assert!(min <= expected);
    }

    #[test]
    fn test_slippage_bounds() {
        assert!(SlippageTolerance::from_bps(0).is_ok());
        assert!(SlippageTolerance::from_bps(9_999).is_ok());
        assert!(SlippageTolerance::from_bps(10_000).is_err());
    }

    #[test]
    fn test_get_amount_out() {
        // 997000 * 1e6 / (1e9 + 997000) = 996.006..
        let out = get_amount_out(
            U256::from(1_000u64),
            U256::from(1_000_000u64),
            U256::from(1_000_000u64),
        )
        .unwrap();
        assert_eq!(out, U256::from(996u64));
    }

    #[test]
    fn test_get_amount_out_empty_reserves() {
        assert!(get_amount_out(U256::from(1u64), U256::ZERO, U256::from(10u64)).is_none());
        assert!(get_amount_out(U256::from(1u64), U256::from(10u64), U256::ZERO).is_none());
    }

    #[test]
    fn test_quote_derives_minimum() {
        let quote = SwapQuote::new(
            U256::from(10u64),
            U256::from(1000u64),
            SlippageTolerance::DEFAULT,
        );
        assert_eq!(quote.amount_out_minimum, U256::from(995u64));
        assert_eq!(quote.slippage.bps(), 50);
    }
}
