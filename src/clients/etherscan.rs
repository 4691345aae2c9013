//! Etherscan-compatible HTTP API client
//!
//! Every response is wrapped in the same envelope:
//! `{"status": "1", "message": "OK", "result": ...}`. Any status other than
//! `"1"` is an upstream failure, and `result` then carries an error string
//! instead of data.

use crate::clients::pacing::RequestPacer;
use crate::{Error, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Response envelope shared by all Etherscan modules
#[derive(Debug, Deserialize)]
pub struct EtherscanResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Value,
}

impl EtherscanResponse {
    /// Unwrap the payload, mapping a non-success status to `DataUnavailable`
    pub fn into_result(self, what: &str) -> Result<Value> {
        if self.status != "1" {
            let detail = match &self.result {
                Value::String(s) if !s.is_empty() => format!("{} ({})", self.message, s),
                _ => self.message.clone(),
            };
            return Err(Error::DataUnavailable(format!(
                "Failed to fetch {}: {}",
                what, detail
            )));
        }
        Ok(self.result)
    }
}

/// Thin client over the Etherscan API, shared by the balance and gas clients
pub struct EtherscanClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    chain_id: u64,
    pacer: Arc<RequestPacer>,
}

impl EtherscanClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        chain_id: u64,
        timeout: Duration,
        pacer: Arc<RequestPacer>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            chain_id,
            pacer,
        })
    }

    /// Issue a paced GET for `module`/`action` and return the unwrapped result
    pub async fn query(&self, what: &str, params: &[(&str, String)]) -> Result<Value> {
        self.pacer.pace().await;

        let chain_id = self.chain_id.to_string();
        let mut query: Vec<(&str, &str)> = vec![("chainid", chain_id.as_str())];
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));
        query.push(("apikey", self.api_key.expose_secret()));

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors include the URL, which carries the API key
                Error::DataUnavailable(format!("{} request failed: {}", what, e.without_url()))
            })?;

        if !response.status().is_success() {
            return Err(Error::DataUnavailable(format!(
                "{} request returned HTTP {}",
                what,
                response.status()
            )));
        }

        let envelope: EtherscanResponse = response.json().await.map_err(|e| {
            Error::DataUnavailable(format!("Failed to parse {} response: {}", what, e.without_url()))
        })?;

        envelope.into_result(what)
    }
}

impl std::fmt::Debug for EtherscanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtherscanClient")
            .field("base_url", &self.base_url)
            .field("chain_id", &self.chain_id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_yields_result() {
        let envelope: EtherscanResponse = serde_json::from_value(json!({
            "status": "1",
            "message": "OK",
            "result": "500000000000000000000"
        }))
        .unwrap();

        let result = envelope.into_result("balance").unwrap();
        assert_eq!(result, json!("500000000000000000000"));
    }

    #[test]
    fn test_failure_envelope_is_data_unavailable() {
        let envelope: EtherscanResponse = serde_json::from_value(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Invalid API Key"
        }))
        .unwrap();

        let err = envelope.into_result("balance").unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(_)));
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = EtherscanClient::new(
            "https://api.etherscan.io/v2/api",
            SecretString::from("super-secret"),
            1,
            Duration::from_secs(5),
            Arc::new(RequestPacer::disabled()),
        )
        .unwrap();

        assert!(!format!("{:?}", client).contains("super-secret"));
    }
}
