//! Swap interceptors
//!
//! Every built swap passes through this pipeline before it is handed to the
//! executor. Interceptors can veto the attempt, and they are told about its
//! outcome afterwards.

mod audit_log;
mod gas_ceiling;
mod slippage_guard;

pub use audit_log::AuditLogInterceptor;
pub use gas_ceiling::GasCeilingInterceptor;
pub use slippage_guard::SlippageGuardInterceptor;

use crate::clients::GasParameters;
use crate::wallet::{SwapReceipt, SwapTransaction};
use crate::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Verdict on a pending swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptorDecision {
    Allow,
    Block(String),
}

/// Everything known about a swap attempt before it is submitted
#[derive(Debug, Clone)]
pub struct SwapContext {
    pub attempt_id: Uuid,
    pub gas: GasParameters,
    pub transaction: SwapTransaction,
}

#[async_trait]
pub trait SwapInterceptor: Send + Sync {
    async fn before_swap(&self, context: &SwapContext) -> Result<InterceptorDecision>;

    async fn on_swap_complete(&self, _context: &SwapContext, _outcome: &Result<SwapReceipt>) {}
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::swap::{SlippageTolerance, SwapQuote};
    use crate::wallet::SwapTransactionBuilder;
    use alloy::primitives::{address, U256};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::time::Duration;

    pub fn context_with(slippage_bps: u32, expected_out: U256, gas_gwei: Decimal) -> SwapContext {
        let builder = SwapTransactionBuilder::new(
            address!("aaf409e68d9cdc7b26cf1b3d6e6d4ca09f1aede3"),
            address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
            200_000,
            Duration::from_secs(120),
            1,
        );
        let slippage = SlippageTolerance::from_bps(slippage_bps).unwrap();
        let quote = SwapQuote::new(U256::from(1u64), expected_out, slippage);
        let gas = GasParameters::new(gas_gwei);
        let transaction = builder
            .build(
                &[
                    address!("ea4170a365952c666a9f34950771e51841732de9"),
                    address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
                ],
                &quote,
                &gas,
                Utc::now(),
            )
            .unwrap();

        SwapContext {
            attempt_id: Uuid::new_v4(),
            gas,
            transaction,
        }
    }
}
