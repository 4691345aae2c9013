//! Swap routing and pricing

pub mod contracts;
mod quote;
mod route;

pub use quote::{get_amount_out, SlippageTolerance, SwapQuote};
pub use route::{RouteResolver, SwapRoute, UniswapV2RouteResolver};
