//! Upstream read clients
//!
//! Both clients share one `EtherscanClient`, and through it one
//! `RequestPacer`, so the API's rate limit applies to the pair of them.

mod balance;
mod etherscan;
mod gas;
mod pacing;

pub use balance::{BalanceSource, EtherscanBalanceClient};
pub use etherscan::{EtherscanClient, EtherscanResponse};
pub use gas::{EtherscanGasClient, GasOracle, GasParameters};
pub use pacing::RequestPacer;
