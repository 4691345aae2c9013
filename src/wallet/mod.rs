//! Wallet, transaction construction and submission
//!
//! The private key NEVER leaves the `signer` module. Everything else sees
//! only the public address or an `EthereumWallet` handle used by the provider.

mod builder;
mod signer;
mod simulator;
mod submitter;

pub use builder::{SwapTransaction, SwapTransactionBuilder};
pub use signer::SecureWallet;
pub use simulator::{SimulationError, SimulationResult, TransactionSimulator};
pub use submitter::{ChainSubmitter, DryRunExecutor, SwapExecutor, SwapReceipt};
