//! Swap transaction construction

use crate::clients::GasParameters;
use crate::swap::contracts::UniV2Router;
use crate::swap::SwapQuote;
use crate::{Error, Result};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// A fully priced swap transaction, ready for signing
///
/// Built once per attempt. An expired deadline is never refreshed in place;
/// the next attempt builds a new transaction.
#[derive(Debug, Clone, Serialize)]
pub struct SwapTransaction {
    pub to: Address,
    pub calldata: Bytes,
    pub gas_limit: u64,
    pub gas_price_wei: u128,
    /// Unix timestamp after which the router rejects the swap
    pub deadline: u64,
    pub chain_id: u64,
    pub quote: SwapQuote,
}

impl SwapTransaction {
    /// Convert to an alloy request sent from `from`
    pub fn to_request(&self, from: Address) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(from)
            .with_to(self.to)
            .with_input(self.calldata.clone())
            .with_gas_limit(self.gas_limit)
            .with_gas_price(self.gas_price_wei)
            .with_chain_id(self.chain_id)
    }
}

/// Builds router calls for the configured router and recipient
#[derive(Debug, Clone)]
pub struct SwapTransactionBuilder {
    router: Address,
    recipient: Address,
    gas_limit: u64,
    deadline_window: Duration,
    chain_id: u64,
    receive_native: bool,
}

impl SwapTransactionBuilder {
    pub fn new(
        router: Address,
        recipient: Address,
        gas_limit: u64,
        deadline_window: Duration,
        chain_id: u64,
    ) -> Self {
        Self {
            router,
            recipient,
            gas_limit,
            deadline_window,
            chain_id,
            receive_native: true,
        }
    }

    /// Use `swapExactTokensForTokens` and keep the wrapped output
    pub fn with_wrapped_output(mut self) -> Self {
        self.receive_native = false;
        self
    }

    pub fn recipient(&self) -> Address {
        self.recipient
    }

    /// Build the transaction for `quote` along `path`, submitted at `now`
    pub fn build(
        &self,
        path: &[Address],
        quote: &SwapQuote,
        gas: &GasParameters,
        now: DateTime<Utc>,
    ) -> Result<SwapTransaction> {
        let submitted_at = u64::try_from(now.timestamp())
            .map_err(|_| Error::InvalidArgument(format!("Clock before epoch: {}", now)))?;
        let deadline = submitted_at + self.deadline_window.as_secs();

        if path.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "Swap path needs at least two assets, got {}",
                path.len()
            )));
        }
        let calldata = self.encode_call(path, quote, deadline);

        Ok(SwapTransaction {
            to: self.router,
            calldata,
            gas_limit: self.gas_limit,
            gas_price_wei: gas.price_wei()?,
            deadline,
            chain_id: self.chain_id,
            quote: quote.clone(),
        })
    }

    fn encode_call(&self, path: &[Address], quote: &SwapQuote, deadline: u64) -> Bytes {
        let encoded = if self.receive_native {
            UniV2Router::swapExactTokensForETHCall {
                amountIn: quote.amount_in,
                amountOutMin: quote.amount_out_minimum,
                path: path.to_vec(),
                to: self.recipient,
                deadline: U256::from(deadline),
            }
            .abi_encode()
        } else {
            UniV2Router::swapExactTokensForTokensCall {
                amountIn: quote.amount_in,
                amountOutMin: quote.amount_out_minimum,
                path: path.to_vec(),
                to: self.recipient,
                deadline: U256::from(deadline),
            }
            .abi_encode()
        };
        Bytes::from(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap::SlippageTolerance;
    use alloy::primitives::address;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    const ROUTER: Address = address!("aaf409e68d9cdc7b26cf1b3d6e6d4ca09f1aede3");
    const TOKEN: Address = address!("ea4170a365952c666a9f34950771e51841732de9");
    const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    const RECIPIENT: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

    fn builder() -> SwapTransactionBuilder {
        SwapTransactionBuilder::new(
            ROUTER,
            RECIPIENT,
            200_000,
            Duration::from_secs(120),
            1,
        )
    }

    fn quote() -> SwapQuote {
        SwapQuote::new(
            U256::from(1_000_000_000_000_000_000u128),
            U256::from(1000u64),
            SlippageTolerance::DEFAULT,
        )
    }

    #[test]
    fn test_deadline_is_submission_plus_window() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let tx = builder()
            .build(&[TOKEN, WETH], &quote(), &GasParameters::new(dec!(30)), now)
            .unwrap();

        assert_eq!(tx.deadline, 1_700_000_120);
    }

    #[test]
    fn test_gas_parameters_flow_into_transaction() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let tx = builder()
            .build(&[TOKEN, WETH], &quote(), &GasParameters::new(dec!(30)), now)
            .unwrap();

        assert_eq!(tx.gas_price_wei, 30_000_000_000);
        assert_eq!(tx.gas_limit, 200_000);
        assert_eq!(tx.to, ROUTER);

        let request = tx.to_request(RECIPIENT);
        assert_eq!(request.gas_price, Some(30_000_000_000));
        assert_eq!(request.gas, Some(200_000));
    }

    #[test]
    fn test_calldata_encodes_swap_for_eth() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let tx = builder()
            .build(&[TOKEN, WETH], &quote(), &GasParameters::new(dec!(30)), now)
            .unwrap();

        let decoded = UniV2Router::swapExactTokensForETHCall::abi_decode(&tx.calldata).unwrap();
        assert_eq!(decoded.amountIn, U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(decoded.amountOutMin, U256::from(995u64));
        assert_eq!(decoded.path, vec![TOKEN, WETH]);
        assert_eq!(decoded.to, RECIPIENT);
        assert_eq!(decoded.deadline, U256::from(1_700_000_120u64));
    }

    #[test]
    fn test_rejects_single_asset_path() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let err = builder()
            .build(&[TOKEN], &quote(), &GasParameters::new(dec!(30)), now)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_wrapped_output_uses_token_swap() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let tx = builder()
            .with_wrapped_output()
            .build(&[TOKEN, WETH], &quote(), &GasParameters::new(dec!(30)), now)
            .unwrap();

        assert_eq!(
            &tx.calldata[..4],
            UniV2Router::swapExactTokensForTokensCall::SELECTOR.as_slice()
        );
    }
}
