//! Tax Liquidator
//!
//! A threshold-triggered liquidation agent that:
//! - Polls the token balance of a watched account via an Etherscan-compatible API
//! - Sells a fixed amount on a Uniswap-V2 router once the balance reaches the trigger
//! - Pauses for a cool-down after every confirmed swap
//!
//! # Security Model
//!
//! - The signing key is held as a `SecretString` and only leaves the wallet as a signature
//! - Every built swap passes through the interceptor pipeline before broadcast
//! - Dry-run mode builds and preflights swaps without ever broadcasting

pub mod clients;
pub mod config;
pub mod interceptors;
pub mod runner;
pub mod state;
pub mod swap;
pub mod tokens;
pub mod wallet;

mod error;
#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{Config, Credentials, RpcConfig};
pub use error::{Error, Result};
pub use runner::{AgentSettings, CycleOutcome, LiquidationAgent};
pub use state::{AccountBalanceState, AgentState};
