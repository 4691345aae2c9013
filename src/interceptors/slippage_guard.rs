//! Slippage guard interceptor
//!
//! Blocks swaps whose tolerance exceeds the configured maximum, and swaps
//! whose minimum output rounded down to nothing.

use crate::interceptors::{InterceptorDecision, SwapContext, SwapInterceptor};
use crate::Result;
use async_trait::async_trait;

/// Interceptor that blocks trades with excessive slippage
pub struct SlippageGuardInterceptor {
    /// Maximum allowed slippage in basis points
    max_slippage_bps: u32,
}

impl SlippageGuardInterceptor {
    pub fn new(max_slippage_bps: u32) -> Self {
        Self { max_slippage_bps }
    }
}

#[async_trait]
impl SwapInterceptor for SlippageGuardInterceptor {
    async fn before_swap(&self, context: &SwapContext) -> Result<InterceptorDecision> {
        let quote = &context.transaction.quote;
        let slippage = quote.slippage.bps();

        if slippage > self.max_slippage_bps {
            return Ok(InterceptorDecision::Block(format!(
                "Requested slippage {} bps exceeds maximum allowed {} bps",
                slippage, self.max_slippage_bps
            )));
        }

        if quote.amount_out_minimum.is_zero() {
            return Ok(InterceptorDecision::Block(format!(
                "Minimum output is zero for expected output {}",
                quote.expected_out
            )));
        }

        tracing::debug!(
            slippage_bps = slippage,
            max_slippage_bps = self.max_slippage_bps,
            "Slippage check passed"
        );

        Ok(InterceptorDecision::Allow)
    }
}
