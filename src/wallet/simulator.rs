//! Transaction preflight
//!
//! Runs the swap through `eth_call` before it is signed, so a trade that would
//! revert (expired approval, insufficient balance, price already past the
//! minimum) is dropped without paying for gas.
//!
//! This module is read-only: it never signs or submits transactions.

use alloy::hex;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of simulating a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub success: bool,
    /// Estimated gas used (if successful)
    pub gas_used: Option<u64>,
    /// Revert reason (if failed)
    pub revert_reason: Option<String>,
}

impl SimulationResult {
    pub fn success(gas_used: u64) -> Self {
        Self {
            success: true,
            gas_used: Some(gas_used),
            revert_reason: None,
        }
    }

    pub fn failed(reason: String) -> Self {
        Self {
            success: false,
            gas_used: None,
            revert_reason: Some(reason),
        }
    }
}

/// Error type for simulation transport failures
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Simulation timed out after {0:?}")]
    Timeout(Duration),
}

/// Transaction simulator using eth_call
#[derive(Debug, Clone)]
pub struct TransactionSimulator {
    rpc_url: url::Url,
    timeout: Duration,
}

impl TransactionSimulator {
    /// `timeout` bounds the `eth_call` and gas estimate together
    pub fn new(rpc_url: url::Url, timeout: Duration) -> Self {
        Self { rpc_url, timeout }
    }

    /// Simulate a call from `from` to `to` with `data`
    pub async fn simulate_request(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> Result<SimulationResult, SimulationError> {
        tokio::time::timeout(self.timeout, self.call_and_estimate(from, to, data, value))
            .await
            .map_err(|_| SimulationError::Timeout(self.timeout))?
    }

    async fn call_and_estimate(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> Result<SimulationResult, SimulationError> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());

        let tx = TransactionRequest::default()
            .from(from)
            .to(to)
            .input(data.into())
            .value(value);

        match provider.call(tx.clone()).await {
            Ok(_) => {
                let gas_estimate = provider
                    .estimate_gas(tx)
                    .await
                    .map_err(|e| SimulationError::Network(e.to_string()))?;
                Ok(SimulationResult::success(gas_estimate))
            }
            Err(e) => {
                let message = e.to_string();
                if message.contains("revert") {
                    Ok(SimulationResult::failed(Self::parse_revert_reason(&message)))
                } else {
                    Err(SimulationError::Network(message))
                }
            }
        }
    }

    /// Parse revert reason from RPC error message
    fn parse_revert_reason(error: &str) -> String {
        if error.contains("execution reverted") {
            if let Some(start) = error.find("revert: ") {
                let reason = &error[start + 8..];
                if let Some(end) = reason.find('"') {
                    return reason[..end].to_string();
                }
                return reason.to_string();
            }
            if let Some(start) = error.find("0x") {
                let hex_data = &error[start..];
                let end = hex_data
                    .find(|c: char| !c.is_ascii_hexdigit() && c != 'x')
                    .unwrap_or(hex_data.len());
                let data = &hex_data[..end];
                // Error(string) selector 0x08c379a0, then offset and length words
                if data.starts_with("0x08c379a0") && data.len() > 138 {
                    if let Ok(decoded) = hex::decode(&data[138..]) {
                        let filtered: Vec<u8> = decoded.into_iter().filter(|&b| b != 0).collect();
                        if let Ok(s) = String::from_utf8(filtered) {
                            return s;
                        }
                    }
                }
                return format!("Reverted with data: {}", data);
            }
            return "execution reverted".to_string();
        }

        error.to_string()
    }
}
