//! Gas price client
//!
//! Reads the proposed gas price from the Etherscan gas tracker. There is no
//! fallback value: if the oracle cannot be read the swap attempt is abandoned.

use crate::clients::etherscan::EtherscanClient;
use crate::{Error, Result};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Gas pricing for a single swap attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasParameters {
    /// Suggested fee per unit of gas, in gwei
    pub suggested_price_gwei: Decimal,
}

impl GasParameters {
    pub fn new(suggested_price_gwei: Decimal) -> Self {
        Self {
            suggested_price_gwei,
        }
    }

    /// Price in wei, rounded down
    pub fn price_wei(&self) -> Result<u128> {
        self.suggested_price_gwei
            .checked_mul(Decimal::from(WEI_PER_GWEI))
            .and_then(|wei| wei.floor().to_u128())
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "Gas price {} gwei is out of range",
                    self.suggested_price_gwei
                ))
            })
    }
}

/// Source of suggested gas prices
#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn suggested_gas_price(&self) -> Result<GasParameters>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GasOracleResult {
    propose_gas_price: String,
}

/// Gas oracle backed by the Etherscan gas tracker
pub struct EtherscanGasClient {
    api: Arc<EtherscanClient>,
}

impl EtherscanGasClient {
    pub fn new(api: Arc<EtherscanClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl GasOracle for EtherscanGasClient {
    async fn suggested_gas_price(&self) -> Result<GasParameters> {
        let result = self
            .api
            .query(
                "gas fee",
                &[
                    ("module", "gastracker".to_string()),
                    ("action", "gasoracle".to_string()),
                ],
            )
            .await?;

        let gas = parse_gas_oracle(result)?;
        tracing::debug!(gas_price_gwei = %gas.suggested_price_gwei, "Fetched suggested gas price");
        Ok(gas)
    }
}

fn parse_gas_oracle(result: Value) -> Result<GasParameters> {
    let parsed: GasOracleResult = serde_json::from_value(result)
        .map_err(|e| Error::DataUnavailable(format!("Unexpected gas oracle payload: {}", e)))?;

    let price = Decimal::from_str(parsed.propose_gas_price.trim()).map_err(|e| {
        Error::DataUnavailable(format!(
            "Invalid proposed gas price {:?}: {}",
            parsed.propose_gas_price, e
        ))
    })?;

    if price <= Decimal::ZERO {
        return Err(Error::DataUnavailable(format!(
            "Gas oracle proposed a non-positive price: {}",
            price
        )));
    }

    let gas = GasParameters::new(price);
    gas.price_wei()
        .map_err(|e| Error::DataUnavailable(format!("Gas oracle value rejected: {}", e)))?;
    Ok(gas)
}
