//! Error types for the liquidation agent

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// An upstream read (balance, gas oracle) failed. Retry next cycle.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// No liquidity path between the two assets.
    #[error("Route unavailable: {0}")]
    RouteUnavailable(String),

    /// Broadcast rejected, reverted, or no receipt within the timeout.
    #[error("Swap failed: {0}")]
    SwapFailed(String),

    #[error("Interceptor blocked: {0}")]
    Blocked(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
