//! Agent state that survives across loop iterations

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Phase of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Polling the balance
    Idle,
    /// A swap has been handed to the executor and is awaiting its receipt
    SwapPending,
    /// Pausing after a confirmed swap
    CoolingDown,
}

/// Last known balance of the watched account
///
/// Only a successful balance read or a confirmed swap may change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalanceState {
    amount: Decimal,
    last_updated: Option<DateTime<Utc>>,
}

impl Default for AccountBalanceState {
    fn default() -> Self {
        Self {
            amount: Decimal::ZERO,
            last_updated: None,
        }
    }
}

impl AccountBalanceState {
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Store a freshly read balance. Negative readings are clamped to zero.
    pub fn record(&mut self, amount: Decimal, at: DateTime<Utc>) {
        self.amount = amount.max(Decimal::ZERO);
        self.last_updated = Some(at);
    }

    /// Clear after a confirmed swap
    pub fn reset(&mut self, at: DateTime<Utc>) {
        self.amount = Decimal::ZERO;
        self.last_updated = Some(at);
    }
}

/// Tracks the post-trade pause
#[derive(Debug, Clone)]
pub struct Cooldown {
    duration: Duration,
    started: Option<Instant>,
}

impl Cooldown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        tracing::info!(
            cooldown_secs = self.duration.as_secs(),
            "Cooldown started after confirmed swap"
        );
    }

    /// Time left before polling resumes
    pub fn remaining(&self) -> Duration {
        match self.started {
            Some(started) => self.duration.saturating_sub(started.elapsed()),
            None => Duration::ZERO,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.remaining().is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_starts_unknown() {
        let state = AccountBalanceState::default();
        assert_eq!(state.amount(), Decimal::ZERO);
        assert!(state.last_updated().is_none());
    }

    #[test]
    fn test_record_and_reset() {
        let mut state = AccountBalanceState::default();
        let now = Utc::now();
        state.record(dec!(512.5), now);
        assert_eq!(state.amount(), dec!(512.5));
        assert_eq!(state.last_updated(), Some(now));

        state.reset(now);
        assert_eq!(state.amount(), Decimal::ZERO);
    }

    #[test]
    fn test_record_never_goes_negative() {
        let mut state = AccountBalanceState::default();
        state.record(dec!(-3), Utc::now());
        assert_eq!(state.amount(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_cooldown_inactive_until_started() {
        let cooldown = Cooldown::new(Duration::from_secs(20));
        assert!(!cooldown.is_active());
        assert_eq!(cooldown.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_cooldown_active_after_start() {
        let mut cooldown = Cooldown::new(Duration::from_secs(20));
        cooldown.start();
        assert!(cooldown.is_active());
        assert!(cooldown.remaining() > Duration::from_secs(19));
    }
}
