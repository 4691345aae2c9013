//! Gas ceiling interceptor
//!
//! Refuses to submit while the suggested gas price is above a fixed ceiling.
//! The attempt is retried on a later cycle with a freshly fetched price.

use crate::interceptors::{InterceptorDecision, SwapContext, SwapInterceptor};
use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

pub struct GasCeilingInterceptor {
    max_gas_price_gwei: Decimal,
}

impl GasCeilingInterceptor {
    pub fn new(max_gas_price_gwei: Decimal) -> Self {
        Self { max_gas_price_gwei }
    }
}

#[async_trait]
impl SwapInterceptor for GasCeilingInterceptor {
    async fn before_swap(&self, context: &SwapContext) -> Result<InterceptorDecision> {
        let price = context.gas.suggested_price_gwei;
        if price > self.max_gas_price_gwei {
            return Ok(InterceptorDecision::Block(format!(
                "Gas price {} gwei exceeds ceiling of {} gwei",
                price, self.max_gas_price_gwei
            )));
        }
        Ok(InterceptorDecision::Allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::test_support::context_with;
    use alloy::primitives::U256;
    use rust_decimal_macros::dec;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_allows_price_at_ceiling() {
        let interceptor = GasCeilingInterceptor::new(dec!(30));
        let context = context_with(50, U256::from(1000u64), dec!(30));

        let decision = assert_ok!(interceptor.before_swap(&context).await);
        assert_eq!(decision, InterceptorDecision::Allow);
    }

    #[tokio::test]
    async fn test_blocks_price_above_ceiling() {
        let interceptor = GasCeilingInterceptor::new(dec!(30));
        let context = context_with(50, U256::from(1000u64), dec!(30.1));

        let decision = assert_ok!(interceptor.before_swap(&context).await);
        assert!(matches!(decision, InterceptorDecision::Block(_)));
    }
}
