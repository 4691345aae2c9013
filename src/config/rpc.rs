//! RPC endpoint configuration
//!
//! Resolution order follows Ethereum ecosystem conventions:
//! 1. `ETH_RPC_URL` - explicit endpoint, highest priority
//! 2. `ALCHEMY_API_KEY` - builds the Alchemy URL for the chain
//! 3. `INFURA_API_KEY` - builds the Infura URL for the chain
//! 4. Public RPC fallback - rate limited, for testing only
//!
//! # Examples
//!
//! ```bash
//! export ETH_RPC_URL="https://eth-mainnet.g.alchemy.com/v2/YOUR_KEY"
//! # or
//! export INFURA_API_KEY="YOUR_KEY"
//! ```

use crate::{Error, Result};

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const SEPOLIA: u64 = 11155111;
}

/// Environment variable names
mod env_vars {
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const INFURA_API_KEY: &str = "INFURA_API_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const ETHEREUM: &str = "https://eth.llamarpc.com";
    pub const SEPOLIA: &str = "https://ethereum-sepolia-rpc.publicnode.com";
}

/// Where the endpoint came from. Logged instead of the URL, which may embed a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcSource {
    Explicit,
    Alchemy,
    Infura,
    Public,
}

/// RPC configuration for the agent's chain
#[derive(Clone)]
pub struct RpcConfig {
    chain_id: u64,
    url: String,
    source: RpcSource,
}

impl RpcConfig {
    /// Resolve the RPC endpoint for `chain_id` from environment variables
    pub fn from_env(chain_id: u64) -> Result<Self> {
        Self::resolve(chain_id, |name| std::env::var(name).ok())
    }

    fn resolve(chain_id: u64, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(env_vars::ETH_RPC_URL) {
            tracing::debug!("Using ETH_RPC_URL");
            return Ok(Self::new(chain_id, url, RpcSource::Explicit));
        }

        if let Some(key) = lookup(env_vars::ALCHEMY_API_KEY) {
            let host = match chain_id {
                chains::ETHEREUM => Some("eth-mainnet"),
                chains::SEPOLIA => Some("eth-sepolia"),
                _ => None,
            };
            if let Some(host) = host {
                tracing::info!("Building RPC URL from ALCHEMY_API_KEY");
                let url = format!("https://{}.g.alchemy.com/v2/{}", host, key);
                return Ok(Self::new(chain_id, url, RpcSource::Alchemy));
            }
        }

        if let Some(key) = lookup(env_vars::INFURA_API_KEY) {
            let host = match chain_id {
                chains::ETHEREUM => Some("mainnet"),
                chains::SEPOLIA => Some("sepolia"),
                _ => None,
            };
            if let Some(host) = host {
                tracing::info!("Building RPC URL from INFURA_API_KEY");
                let url = format!("https://{}.infura.io/v3/{}", host, key);
                return Ok(Self::new(chain_id, url, RpcSource::Infura));
            }
        }

        let public = match chain_id {
            chains::ETHEREUM => public_rpcs::ETHEREUM,
            chains::SEPOLIA => public_rpcs::SEPOLIA,
            other => {
                return Err(Error::Config(format!(
                    "No RPC configured for chain {}; set {}",
                    other,
                    env_vars::ETH_RPC_URL
                )))
            }
        };
        tracing::warn!(chain_id, "No RPC configured, using public RPC (rate limited)");
        Ok(Self::new(chain_id, public.to_string(), RpcSource::Public))
    }

    /// Create with an explicit RPC URL
    pub fn new(chain_id: u64, url: String, source: RpcSource) -> Self {
        Self {
            chain_id,
            url,
            source,
        }
    }

    /// Parsed endpoint URL
    pub fn url(&self) -> Result<url::Url> {
        self.url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn source(&self) -> RpcSource {
        self.source
    }
}

// URLs from Alchemy/Infura embed the API key
impl std::fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConfig")
            .field("chain_id", &self.chain_id)
            .field("source", &self.source)
            .field("url", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_explicit_url_wins() {
        let config = RpcConfig::resolve(
            chains::ETHEREUM,
            lookup(&[
                ("ETH_RPC_URL", "https://custom.rpc"),
                ("INFURA_API_KEY", "abc"),
            ]),
        )
        .unwrap();

        assert_eq!(config.source(), RpcSource::Explicit);
        assert_eq!(config.url().unwrap().as_str(), "https://custom.rpc/");
    }

    #[test]
    fn test_infura_key_builds_mainnet_url() {
        let config =
            RpcConfig::resolve(chains::ETHEREUM, lookup(&[("INFURA_API_KEY", "abc")])).unwrap();

        assert_eq!(config.source(), RpcSource::Infura);
        assert_eq!(
            config.url().unwrap().as_str(),
            "https://mainnet.infura.io/v3/abc"
        );
    }

    #[test]
    fn test_public_rpc_fallback() {
        let config = RpcConfig::resolve(chains::ETHEREUM, lookup(&[])).unwrap();
        assert_eq!(config.source(), RpcSource::Public);
    }

    #[test]
    fn test_unknown_chain_without_url_fails() {
        assert!(RpcConfig::resolve(999, lookup(&[("INFURA_API_KEY", "abc")])).is_err());
    }

    #[test]
    fn test_debug_redacts_url() {
        let config = RpcConfig::new(
            1,
            "https://mainnet.infura.io/v3/secret".to_string(),
            RpcSource::Infura,
        );
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
