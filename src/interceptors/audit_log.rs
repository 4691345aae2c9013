//! Audit log interceptor
//!
//! Appends one JSON line per swap event so every liquidation attempt can be
//! reconstructed after the fact.

use crate::interceptors::{InterceptorDecision, SwapContext, SwapInterceptor};
use crate::wallet::SwapReceipt;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    attempt_id: Uuid,
    router: String,
    amount_in: String,
    expected_out: String,
    amount_out_minimum: String,
    gas_price_gwei: String,
    deadline: u64,
    tx_hash: Option<String>,
    block_number: Option<u64>,
    dry_run: Option<bool>,
    error: Option<String>,
    status: &'static str,
}

impl AuditEntry {
    fn from_context(context: &SwapContext, entry_type: &'static str, status: &'static str) -> Self {
        let tx = &context.transaction;
        Self {
            timestamp: Utc::now(),
            entry_type,
            attempt_id: context.attempt_id,
            router: tx.to.to_string(),
            amount_in: tx.quote.amount_in.to_string(),
            expected_out: tx.quote.expected_out.to_string(),
            amount_out_minimum: tx.quote.amount_out_minimum.to_string(),
            gas_price_gwei: context.gas.suggested_price_gwei.to_string(),
            deadline: tx.deadline,
            tx_hash: None,
            block_number: None,
            dry_run: None,
            error: None,
            status,
        }
    }
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Interceptor that logs all swap attempts to a file
pub struct AuditLogInterceptor {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLogInterceptor {
    /// Create a new audit log interceptor
    ///
    /// # Arguments
    /// * `log_path` - Path to the audit log file (JSONL format)
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter::new(log_path.into()))),
        }
    }

    async fn append(&self, entry: &AuditEntry) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

#[async_trait]
impl SwapInterceptor for AuditLogInterceptor {
    async fn before_swap(&self, context: &SwapContext) -> Result<InterceptorDecision> {
        let entry = AuditEntry::from_context(context, "swap_submit", "pending");
        self.append(&entry).await;

        // Audit logging never blocks
        Ok(InterceptorDecision::Allow)
    }

    async fn on_swap_complete(&self, context: &SwapContext, outcome: &Result<SwapReceipt>) {
        let entry = match outcome {
            Ok(receipt) => AuditEntry {
                tx_hash: Some(receipt.tx_hash.to_string()),
                block_number: receipt.block_number,
                dry_run: Some(receipt.dry_run),
                ..AuditEntry::from_context(context, "swap_complete", "success")
            },
            Err(e) => AuditEntry {
                error: Some(e.to_string()),
                ..AuditEntry::from_context(context, "swap_complete", "error")
            },
        };
        self.append(&entry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::test_support::context_with;
    use crate::Error;
    use alloy::primitives::{B256, U256};
    use rust_decimal_macros::dec;
    use serde_json::Value;

    fn read_entries(path: &std::path::Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_records_submit_and_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let interceptor = AuditLogInterceptor::new(&path);
        let context = context_with(50, U256::from(1000u64), dec!(30));

        let decision = interceptor.before_swap(&context).await.unwrap();
        assert_eq!(decision, InterceptorDecision::Allow);

        let receipt = SwapReceipt {
            tx_hash: B256::repeat_byte(0xab),
            block_number: Some(19_000_000),
            gas_used: 120_000,
            dry_run: false,
        };
        interceptor.on_swap_complete(&context, &Ok(receipt)).await;

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["entry_type"], "swap_submit");
        assert_eq!(entries[0]["amount_out_minimum"], "995");
        assert_eq!(entries[1]["status"], "success");
        assert_eq!(entries[1]["block_number"], 19_000_000);
        assert_eq!(entries[0]["attempt_id"], entries[1]["attempt_id"]);
    }

    #[tokio::test]
    async fn test_records_failure_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let interceptor = AuditLogInterceptor::new(&path);
        let context = context_with(50, U256::from(1000u64), dec!(30));

        interceptor
            .on_swap_complete(&context, &Err(Error::SwapFailed("reverted".into())))
            .await;

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["status"], "error");
        assert!(entries[0]["error"].as_str().unwrap().contains("reverted"));
    }
}
