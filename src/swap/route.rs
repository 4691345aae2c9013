//! Swap route resolution
//!
//! Routes are direct Uniswap V2 pairs, read fresh from chain on every attempt.
//! Reserves move between blocks, so a route is never reused across cycles.

use crate::swap::contracts::{UniV2Factory, UniV2Pair};
use crate::swap::quote::{get_amount_out, SlippageTolerance, SwapQuote};
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use alloy::providers::ProviderBuilder;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// A direct pair between two assets and its current reserves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapRoute {
    pub input_asset: Address,
    pub output_asset: Address,
    pub pair: Address,
    pub reserve_in: U256,
    pub reserve_out: U256,
}

impl SwapRoute {
    /// Orient raw pair reserves to the swap direction
    pub fn from_pair_reserves(
        input_asset: Address,
        output_asset: Address,
        pair: Address,
        token0: Address,
        reserve0: U256,
        reserve1: U256,
    ) -> Result<Self> {
        let (reserve_in, reserve_out) = if token0 == input_asset {
            (reserve0, reserve1)
        } else if token0 == output_asset {
            (reserve1, reserve0)
        } else {
            return Err(Error::RouteUnavailable(format!(
                "Pair {} does not hold {}",
                pair, input_asset
            )));
        };

        Ok(Self {
            input_asset,
            output_asset,
            pair,
            reserve_in,
            reserve_out,
        })
    }

    /// Swap path passed to the router
    pub fn path(&self) -> Vec<Address> {
        vec![self.input_asset, self.output_asset]
    }

    /// Price an exact-input swap along this route
    pub fn quote(&self, amount_in: U256, slippage: SlippageTolerance) -> Result<SwapQuote> {
        let expected_out = get_amount_out(amount_in, self.reserve_in, self.reserve_out)
            .ok_or_else(|| {
                Error::RouteUnavailable(format!("Pair {} has no liquidity", self.pair))
            })?;

        if expected_out.is_zero() {
            return Err(Error::RouteUnavailable(format!(
                "Pair {} returns nothing for {} input",
                self.pair, amount_in
            )));
        }

        Ok(SwapQuote::new(amount_in, expected_out, slippage))
    }
}

/// Resolves the current route between two assets
#[async_trait]
pub trait RouteResolver: Send + Sync {
    async fn resolve(&self, input_asset: Address, output_asset: Address) -> Result<SwapRoute>;
}

/// Resolver reading pair state from a Uniswap V2 factory
///
/// The whole lookup is bounded by `timeout`; an endpoint that stops answering
/// yields `RouteUnavailable` instead of stalling the caller.
pub struct UniswapV2RouteResolver {
    rpc_url: url::Url,
    factory: Address,
    timeout: Duration,
}

impl UniswapV2RouteResolver {
    pub fn new(rpc_url: url::Url, factory: Address, timeout: Duration) -> Self {
        Self {
            rpc_url,
            factory,
            timeout,
        }
    }

    async fn lookup(&self, input_asset: Address, output_asset: Address) -> Result<SwapRoute> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());

        let factory = UniV2Factory::new(self.factory, &provider);
        let pair_address = factory
            .getPair(input_asset, output_asset)
            .call()
            .await
            .map_err(|e| Error::RouteUnavailable(format!("Pair lookup failed: {}", e)))?;

        if pair_address.is_zero() {
            return Err(Error::RouteUnavailable(format!(
                "No pair for {} -> {}",
                input_asset, output_asset
            )));
        }

        let pair = UniV2Pair::new(pair_address, &provider);
        let token0 = pair
            .token0()
            .call()
            .await
            .map_err(|e| Error::RouteUnavailable(format!("token0 lookup failed: {}", e)))?;
        let reserves = pair
            .getReserves()
            .call()
            .await
            .map_err(|e| Error::RouteUnavailable(format!("Reserve lookup failed: {}", e)))?;

        let route = SwapRoute::from_pair_reserves(
            input_asset,
            output_asset,
            pair_address,
            token0,
            U256::from(reserves.reserve0),
            U256::from(reserves.reserve1),
        )?;

        tracing::debug!(
            pair = %route.pair,
            reserve_in = %route.reserve_in,
            reserve_out = %route.reserve_out,
            "Resolved swap route"
        );

        Ok(route)
    }
}

#[async_trait]
impl RouteResolver for UniswapV2RouteResolver {
    async fn resolve(&self, input_asset: Address, output_asset: Address) -> Result<SwapRoute> {
        tokio::time::timeout(self.timeout, self.lookup(input_asset, output_asset))
            .await
            .map_err(|_| {
                Error::RouteUnavailable(format!(
                    "Route lookup timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })?
    }
}
