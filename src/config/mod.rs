//! Configuration for the liquidation agent
//!
//! Settings come from an optional JSON file, are overlaid by `LIQUIDATOR_*`
//! environment variables and validated once at startup. Nothing is reloaded
//! while the agent runs.

pub mod rpc;

use crate::tokens::{addresses, parse_units, DEFAULT_DECIMALS, MAX_DECIMALS};
use crate::{Error, Result};
use alloy::primitives::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub use rpc::RpcConfig;

/// Etherscan API key environment variable name
pub const ETHERSCAN_API_KEY_ENV: &str = "ETHERSCAN_API_KEY";

/// Signing key environment variable names, in lookup order
pub const PRIVATE_KEY_ENVS: [&str; 2] = ["WALLET_PRIVATE_KEY", "PRIVATE_KEY"];

/// Slippage tolerance is expressed in basis points of this denominator
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Assets involved in the liquidation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Token being sold
    pub token: Address,
    /// Token decimals (raw balance is divided by 10^decimals)
    pub token_decimals: u8,
    /// Asset received (wrapped native token)
    pub output_token: Address,
    /// Output token decimals, used when reporting quotes
    pub output_decimals: u8,
    /// Account whose balance is monitored
    pub watched_account: Address,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            token: addresses::TAX_TOKEN,
            token_decimals: DEFAULT_DECIMALS,
            output_token: addresses::WETH_ETH,
            output_decimals: DEFAULT_DECIMALS,
            // The tax accumulates on the token contract itself
            watched_account: addresses::TAX_TOKEN,
        }
    }
}

/// Exchange contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DexConfig {
    /// Router receiving the swap call
    pub router: Address,
    /// Factory used to look up the direct pair
    pub factory: Address,
    /// Unwrap the output to native ETH (`swapExactTokensForETH`)
    pub receive_native: bool,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            router: addresses::SWAP_ROUTER,
            factory: addresses::UNISWAP_V2_FACTORY,
            receive_native: true,
        }
    }
}

/// Trigger level and sell size
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Balance at or above which a swap is attempted
    pub trigger_amount: Decimal,
    /// Amount sold per swap
    pub fixed_sell_amount: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            trigger_amount: dec!(500),
            fixed_sell_amount: dec!(1),
        }
    }
}

/// Risk management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Slippage tolerance applied to the quote (50 = 0.5%)
    pub slippage_bps: u32,
    /// Upper bound enforced by the slippage guard
    pub max_slippage_bps: u32,
    /// Refuse to submit above this gas price
    pub max_gas_price_gwei: Option<Decimal>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 50,
            max_slippage_bps: 100,
            max_gas_price_gwei: None,
        }
    }
}

/// Cadence and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay between polls while idle (milliseconds)
    pub poll_interval_ms: u64,
    /// Pause after a confirmed swap (seconds)
    pub cooldown_secs: u64,
    /// Swap deadline relative to submission (seconds)
    pub deadline_secs: u64,
    /// Maximum wait for a receipt after broadcast (seconds)
    pub confirmation_timeout_secs: u64,
    /// Minimum spacing between upstream API calls (milliseconds)
    pub request_pacing_ms: u64,
    /// Per-request HTTP timeout (milliseconds)
    pub http_timeout_ms: u64,
    /// Bound on each chain RPC step before broadcast completes (seconds)
    pub rpc_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            cooldown_secs: 20,
            deadline_secs: 120,
            confirmation_timeout_secs: 180,
            request_pacing_ms: 1_000,
            http_timeout_ms: 10_000,
            rpc_timeout_secs: 30,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn deadline_window(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn request_pacing(&self) -> Duration {
        Duration::from_millis(self.request_pacing_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chain_id: u64,
    pub assets: AssetConfig,
    pub dex: DexConfig,
    pub threshold: ThresholdConfig,
    pub risk: RiskConfig,
    pub timing: TimingConfig,
    /// Fixed gas ceiling for the swap transaction
    pub gas_limit: u64,
    /// Etherscan-compatible API endpoint
    pub etherscan_api_url: String,
    /// Run `eth_call` against the swap before signing it
    pub simulate_before_send: bool,
    /// Path to audit log file (JSONL)
    pub audit_log_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: rpc::chains::ETHEREUM,
            assets: AssetConfig::default(),
            dex: DexConfig::default(),
            threshold: ThresholdConfig::default(),
            risk: RiskConfig::default(),
            timing: TimingConfig::default(),
            gas_limit: 200_000,
            etherscan_api_url: "https://api.etherscan.io/v2/api".to_string(),
            simulate_before_send: true,
            audit_log_path: None,
        }
    }
}

impl Config {
    /// Load the config file (if any), apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&content)
                    .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?
            }
            None => Config::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `LIQUIDATOR_*` variables onto the loaded values
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(name);

        override_parsed(&get, "LIQUIDATOR_CHAIN_ID", &mut self.chain_id)?;
        override_parsed(&get, "LIQUIDATOR_TOKEN", &mut self.assets.token)?;
        override_parsed(&get, "LIQUIDATOR_TOKEN_DECIMALS", &mut self.assets.token_decimals)?;
        override_parsed(&get, "LIQUIDATOR_OUTPUT_TOKEN", &mut self.assets.output_token)?;
        override_parsed(&get, "LIQUIDATOR_OUTPUT_DECIMALS", &mut self.assets.output_decimals)?;
        override_parsed(&get, "LIQUIDATOR_WATCHED_ACCOUNT", &mut self.assets.watched_account)?;
        override_parsed(&get, "LIQUIDATOR_ROUTER", &mut self.dex.router)?;
        override_parsed(&get, "LIQUIDATOR_FACTORY", &mut self.dex.factory)?;
        override_parsed(&get, "LIQUIDATOR_RECEIVE_NATIVE", &mut self.dex.receive_native)?;
        override_parsed(&get, "LIQUIDATOR_THRESHOLD", &mut self.threshold.trigger_amount)?;
        override_parsed(&get, "LIQUIDATOR_SELL_AMOUNT", &mut self.threshold.fixed_sell_amount)?;
        override_parsed(&get, "LIQUIDATOR_SLIPPAGE_BPS", &mut self.risk.slippage_bps)?;
        override_parsed(&get, "LIQUIDATOR_MAX_SLIPPAGE_BPS", &mut self.risk.max_slippage_bps)?;
        if let Some(raw) = get("LIQUIDATOR_MAX_GAS_PRICE_GWEI") {
            self.risk.max_gas_price_gwei = Some(parse_value("LIQUIDATOR_MAX_GAS_PRICE_GWEI", &raw)?);
        }
        override_parsed(&get, "LIQUIDATOR_POLL_INTERVAL_MS", &mut self.timing.poll_interval_ms)?;
        override_parsed(&get, "LIQUIDATOR_COOLDOWN_SECS", &mut self.timing.cooldown_secs)?;
        override_parsed(&get, "LIQUIDATOR_DEADLINE_SECS", &mut self.timing.deadline_secs)?;
        override_parsed(
            &get,
            "LIQUIDATOR_CONFIRMATION_TIMEOUT_SECS",
            &mut self.timing.confirmation_timeout_secs,
        )?;
        override_parsed(&get, "LIQUIDATOR_REQUEST_PACING_MS", &mut self.timing.request_pacing_ms)?;
        override_parsed(&get, "LIQUIDATOR_HTTP_TIMEOUT_MS", &mut self.timing.http_timeout_ms)?;
        override_parsed(&get, "LIQUIDATOR_RPC_TIMEOUT_SECS", &mut self.timing.rpc_timeout_secs)?;
        override_parsed(&get, "LIQUIDATOR_GAS_LIMIT", &mut self.gas_limit)?;
        override_parsed(&get, "LIQUIDATOR_ETHERSCAN_API_URL", &mut self.etherscan_api_url)?;
        override_parsed(&get, "LIQUIDATOR_SIMULATE", &mut self.simulate_before_send)?;
        if let Some(path) = get("LIQUIDATOR_AUDIT_LOG") {
            self.audit_log_path = Some(path);
        }

        Ok(())
    }

    /// Reject settings that would only fail later, mid-trade
    pub fn validate(&self) -> Result<()> {
        let assets = &self.assets;
        if assets.token_decimals > MAX_DECIMALS || assets.output_decimals > MAX_DECIMALS {
            return Err(Error::Config(format!(
                "assets.token_decimals and assets.output_decimals must not exceed {}",
                MAX_DECIMALS
            )));
        }

        let threshold = &self.threshold;
        if threshold.trigger_amount <= Decimal::ZERO {
            return Err(Error::Config("threshold.trigger_amount must be positive".into()));
        }
        if threshold.fixed_sell_amount <= Decimal::ZERO {
            return Err(Error::Config("threshold.fixed_sell_amount must be positive".into()));
        }
        parse_units(threshold.fixed_sell_amount, self.assets.token_decimals)
            .map_err(|e| Error::Config(format!("threshold.fixed_sell_amount: {}", e)))?;

        if self.assets.token == self.assets.output_token {
            return Err(Error::Config("assets.token and assets.output_token must differ".into()));
        }
        if self.assets.token.is_zero() || self.assets.output_token.is_zero() {
            return Err(Error::Config("asset addresses must not be zero".into()));
        }
        if self.dex.router.is_zero() || self.dex.factory.is_zero() {
            return Err(Error::Config("dex addresses must not be zero".into()));
        }

        let risk = &self.risk;
        if risk.max_slippage_bps >= BPS_DENOMINATOR {
            return Err(Error::Config(format!(
                "risk.max_slippage_bps must be below {}",
                BPS_DENOMINATOR
            )));
        }
        if risk.slippage_bps > risk.max_slippage_bps {
            return Err(Error::Config(format!(
                "risk.slippage_bps ({}) exceeds risk.max_slippage_bps ({})",
                risk.slippage_bps, risk.max_slippage_bps
            )));
        }
        if let Some(ceiling) = risk.max_gas_price_gwei {
            if ceiling <= Decimal::ZERO {
                return Err(Error::Config("risk.max_gas_price_gwei must be positive".into()));
            }
        }

        let timing = &self.timing;
        if timing.poll_interval_ms == 0 {
            return Err(Error::Config("timing.poll_interval_ms must be positive".into()));
        }
        if timing.deadline_secs == 0 || timing.confirmation_timeout_secs == 0 {
            return Err(Error::Config(
                "timing.deadline_secs and timing.confirmation_timeout_secs must be positive".into(),
            ));
        }
        if timing.http_timeout_ms == 0 {
            return Err(Error::Config("timing.http_timeout_ms must be positive".into()));
        }
        if timing.rpc_timeout_secs == 0 {
            return Err(Error::Config("timing.rpc_timeout_secs must be positive".into()));
        }
        if self.gas_limit == 0 {
            return Err(Error::Config("gas_limit must be positive".into()));
        }

        url::Url::parse(&self.etherscan_api_url)
            .map_err(|e| Error::Config(format!("etherscan_api_url: {}", e)))?;

        Ok(())
    }
}

/// Secrets, kept out of `Config` so they are never serialized
pub struct Credentials {
    pub etherscan_api_key: SecretString,
    pub signing_key: Option<SecretString>,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let etherscan_api_key = lookup(ETHERSCAN_API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| {
                Error::Config(format!("Environment variable {} not set", ETHERSCAN_API_KEY_ENV))
            })?;

        let signing_key = PRIVATE_KEY_ENVS
            .iter()
            .find_map(|name| lookup(name))
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        Ok(Self {
            etherscan_api_key,
            signing_key,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("etherscan_api_key", &"[REDACTED]")
            .field("signing_key", &self.signing_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("{}={:?} is invalid: {}", name, raw, e)))
}

fn override_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    target: &mut T,
) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(name) {
        *target = parse_value(name, &raw)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().expect("default config validates");
        assert_eq!(config.threshold.trigger_amount, dec!(500));
        assert_eq!(config.risk.slippage_bps, 50);
        assert_eq!(config.timing.cooldown(), Duration::from_secs(20));
        assert_eq!(config.timing.deadline_window(), Duration::from_secs(120));
        assert_eq!(config.gas_limit, 200_000);
    }

    #[test]
    fn test_env_overrides_apply() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("LIQUIDATOR_THRESHOLD", "750.5"),
                ("LIQUIDATOR_SELL_AMOUNT", "2"),
                ("LIQUIDATOR_POLL_INTERVAL_MS", "250"),
                ("LIQUIDATOR_MAX_GAS_PRICE_GWEI", "80"),
                (
                    "LIQUIDATOR_ROUTER",
                    "0x7a250d5630b4cf539739df2c5dacb4c659f2488d",
                ),
            ]))
            .unwrap();

        assert_eq!(config.threshold.trigger_amount, dec!(750.5));
        assert_eq!(config.threshold.fixed_sell_amount, dec!(2));
        assert_eq!(config.timing.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.risk.max_gas_price_gwei, Some(dec!(80)));
        assert_eq!(
            config.dex.router,
            Address::from_str("0x7a250d5630b4cf539739df2c5dacb4c659f2488d").unwrap()
        );
    }

    #[test]
    fn test_rpc_timeout_defaults_and_overrides() {
        let mut config = Config::default();
        assert_eq!(config.timing.rpc_timeout(), Duration::from_secs(30));

        config
            .apply_overrides(lookup(&[("LIQUIDATOR_RPC_TIMEOUT_SECS", "5")]))
            .unwrap();
        assert_eq!(config.timing.rpc_timeout(), Duration::from_secs(5));

        config.timing.rpc_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_override_fails_fast() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("LIQUIDATOR_THRESHOLD", "five hundred")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("LIQUIDATOR_THRESHOLD"));
    }

    #[test]
    fn test_validate_rejects_slippage_above_guard() {
        let mut config = Config::default();
        config.risk.slippage_bps = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_sell_amount_finer_than_decimals() {
        let mut config = Config::default();
        config.assets.token_decimals = 2;
        config.threshold.fixed_sell_amount = dec!(0.001);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_decimals_beyond_decimal_scale() {
        let mut config = Config::default();
        config.assets.token_decimals = 29;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.assets.output_decimals = 78;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.assets.token_decimals = MAX_DECIMALS;
        config.validate().expect("28 decimals is representable");
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config = Config::default();
        config.threshold.trigger_amount = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let parsed: Config = serde_json::from_str(
            r#"{"threshold": {"trigger_amount": "1000"}, "timing": {"cooldown_secs": 30}}"#,
        )
        .expect("parse config");

        assert_eq!(parsed.threshold.trigger_amount, dec!(1000));
        assert_eq!(parsed.threshold.fixed_sell_amount, dec!(1));
        assert_eq!(parsed.timing.cooldown(), Duration::from_secs(30));
        assert_eq!(parsed.timing.deadline_window(), Duration::from_secs(120));
        assert_eq!(parsed.dex.router, addresses::SWAP_ROUTER);
        assert!(parsed.risk.max_gas_price_gwei.is_none());
    }

    #[test]
    fn test_credentials_require_etherscan_key() {
        assert!(Credentials::resolve(lookup(&[])).is_err());
        assert!(Credentials::resolve(lookup(&[("ETHERSCAN_API_KEY", " ")])).is_err());
    }

    #[test]
    fn test_credentials_fall_back_to_private_key() {
        let creds = Credentials::resolve(lookup(&[
            ("ETHERSCAN_API_KEY", "key"),
            ("PRIVATE_KEY", "0xabc"),
        ]))
        .unwrap();

        assert_eq!(creds.etherscan_api_key.expose_secret(), "key");
        assert_eq!(
            creds.signing_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("0xabc".to_string())
        );
        assert!(!format!("{:?}", creds).contains("0xabc"));
    }
}
