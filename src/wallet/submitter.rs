//! Transaction submission
//!
//! Signs and broadcasts a `SwapTransaction`, then blocks the calling cycle
//! until a receipt arrives or the confirmation timeout expires. Once broadcast,
//! a transaction is always tracked to one of those two ends.

use crate::wallet::builder::SwapTransaction;
use crate::wallet::simulator::TransactionSimulator;
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Confirmed outcome of a swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Set when nothing was broadcast
    pub dry_run: bool,
}

/// Executes a built swap transaction
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    /// Returns a receipt only for a confirmed, successful transaction.
    /// Every other ending is `Error::SwapFailed`.
    async fn execute(&self, tx: &SwapTransaction) -> Result<SwapReceipt>;
}

/// Submits swaps to the chain with the held wallet
pub struct ChainSubmitter {
    rpc_url: url::Url,
    wallet: Arc<SecureWallet>,
    /// Bound on signing and broadcasting, before a hash exists
    broadcast_timeout: Duration,
    confirmation_timeout: Duration,
    simulator: Option<TransactionSimulator>,
}

impl ChainSubmitter {
    pub fn new(
        rpc_url: url::Url,
        wallet: Arc<SecureWallet>,
        broadcast_timeout: Duration,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            rpc_url,
            wallet,
            broadcast_timeout,
            confirmation_timeout,
            simulator: None,
        }
    }

    /// Preflight every swap with `eth_call` before signing
    pub fn with_simulator(mut self, simulator: TransactionSimulator) -> Self {
        self.simulator = Some(simulator);
        self
    }
}

#[async_trait]
impl SwapExecutor for ChainSubmitter {
    async fn execute(&self, tx: &SwapTransaction) -> Result<SwapReceipt> {
        let from = self.wallet.address();

        if let Some(simulator) = &self.simulator {
            preflight(simulator, from, tx).await?;
        }

        let provider = ProviderBuilder::new()
            .wallet(self.wallet.wallet().clone())
            .connect_http(self.rpc_url.clone());

        let pending = tokio::time::timeout(
            self.broadcast_timeout,
            provider.send_transaction(tx.to_request(from)),
        )
        .await
        .map_err(|_| {
            Error::SwapFailed(format!(
                "Broadcast timed out after {}ms",
                self.broadcast_timeout.as_millis()
            ))
        })?
        .map_err(|e| Error::SwapFailed(format!("Broadcast rejected: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(
            tx_hash = %tx_hash,
            deadline = tx.deadline,
            timeout_secs = self.confirmation_timeout.as_secs(),
            "Swap broadcast, waiting for receipt"
        );

        let receipt = match tokio::time::timeout(self.confirmation_timeout, pending.get_receipt())
            .await
        {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                return Err(Error::SwapFailed(format!(
                    "Receipt wait for {} failed: {}",
                    tx_hash, e
                )))
            }
            Err(_) => {
                return Err(Error::SwapFailed(format!(
                    "No receipt for {} within {}s",
                    tx_hash,
                    self.confirmation_timeout.as_secs()
                )))
            }
        };

        if !receipt.status() {
            return Err(Error::SwapFailed(format!("Transaction {} reverted", tx_hash)));
        }

        Ok(SwapReceipt {
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            dry_run: false,
        })
    }
}

/// Executor that never broadcasts
///
/// Optionally preflights the swap, then reports it as done so the agent
/// proceeds exactly as it would after a real confirmation.
pub struct DryRunExecutor {
    from: Address,
    simulator: Option<TransactionSimulator>,
}

impl DryRunExecutor {
    pub fn new(from: Address) -> Self {
        Self {
            from,
            simulator: None,
        }
    }

    pub fn with_simulator(mut self, simulator: TransactionSimulator) -> Self {
        self.simulator = Some(simulator);
        self
    }
}

#[async_trait]
impl SwapExecutor for DryRunExecutor {
    async fn execute(&self, tx: &SwapTransaction) -> Result<SwapReceipt> {
        let gas_used = match &self.simulator {
            Some(simulator) => preflight(simulator, self.from, tx).await?,
            None => 0,
        };

        tracing::info!(
            router = %tx.to,
            amount_in = %tx.quote.amount_in,
            amount_out_min = %tx.quote.amount_out_minimum,
            gas_price_wei = tx.gas_price_wei,
            deadline = tx.deadline,
            "Dry run: swap not broadcast"
        );

        Ok(SwapReceipt {
            tx_hash: B256::ZERO,
            block_number: None,
            gas_used,
            dry_run: true,
        })
    }
}

/// Run the swap through `eth_call`; a revert fails the attempt
async fn preflight(
    simulator: &TransactionSimulator,
    from: Address,
    tx: &SwapTransaction,
) -> Result<u64> {
    let result = simulator
        .simulate_request(from, tx.to, tx.calldata.clone(), U256::ZERO)
        .await
        .map_err(|e| Error::SwapFailed(format!("Preflight failed: {}", e)))?;

    if !result.success {
        return Err(Error::SwapFailed(format!(
            "Preflight reverted: {}",
            result.revert_reason.unwrap_or_default()
        )));
    }

    let gas_used = result.gas_used.unwrap_or_default();
    if gas_used > tx.gas_limit {
        return Err(Error::SwapFailed(format!(
            "Preflight needs {} gas, above the {} limit",
            gas_used, tx.gas_limit
        )));
    }

    tracing::debug!(gas_used, "Preflight passed");
    Ok(gas_used)
}
