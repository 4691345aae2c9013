//! Balance query client
//!
//! Reads the ERC-20 balance of the watched account through the
//! Etherscan `account/tokenbalance` endpoint.

use crate::clients::etherscan::EtherscanClient;
use crate::tokens::to_decimal;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// Source of the monitored account's balance
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Current balance, normalized by the token's decimals
    async fn fetch_balance(&self) -> Result<Decimal>;
}

/// Balance client backed by the Etherscan API
pub struct EtherscanBalanceClient {
    api: Arc<EtherscanClient>,
    token: Address,
    account: Address,
    decimals: u8,
}

impl EtherscanBalanceClient {
    pub fn new(api: Arc<EtherscanClient>, token: Address, account: Address, decimals: u8) -> Self {
        Self {
            api,
            token,
            account,
            decimals,
        }
    }
}

#[async_trait]
impl BalanceSource for EtherscanBalanceClient {
    async fn fetch_balance(&self) -> Result<Decimal> {
        let result = self
            .api
            .query(
                "token balance",
                &[
                    ("module", "account".to_string()),
                    ("action", "tokenbalance".to_string()),
                    ("contractaddress", self.token.to_string()),
                    ("address", self.account.to_string()),
                    ("tag", "latest".to_string()),
                ],
            )
            .await?;

        let balance = parse_raw_balance(&result, self.decimals)?;
        tracing::debug!(
            account = %self.account,
            token = %self.token,
            balance = %balance,
            "Fetched token balance"
        );
        Ok(balance)
    }
}

/// Parse the raw integer balance and scale it by `decimals`
fn parse_raw_balance(result: &Value, decimals: u8) -> Result<Decimal> {
    let raw = result.as_str().ok_or_else(|| {
        Error::DataUnavailable(format!("Unexpected token balance payload: {}", result))
    })?;

    let raw = U256::from_str(raw.trim())
        .map_err(|e| Error::DataUnavailable(format!("Invalid token balance {:?}: {}", raw, e)))?;

    to_decimal(raw, decimals).map_err(|e| Error::DataUnavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parses_raw_balance_with_18_decimals() {
        let balance = parse_raw_balance(&json!("500000000000000000000"), 18).unwrap();
        assert_eq!(balance, dec!(500));
    }

    #[test]
    fn test_parses_fractional_balance() {
        let balance = parse_raw_balance(&json!("1234500"), 6).unwrap();
        assert_eq!(balance, dec!(1.2345));
    }

    #[test]
    fn test_rejects_non_numeric_balance() {
        let err = parse_raw_balance(&json!("Max rate limit reached"), 18).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(_)));
    }

    #[test]
    fn test_rejects_non_string_payload() {
        let err = parse_raw_balance(&json!({"balance": 1}), 18).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(_)));
    }
}
