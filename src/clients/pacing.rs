//! Inter-call pacing for rate-limited upstream APIs
//!
//! Free-tier ledger APIs reject bursts, so every outbound call first waits
//! until at least `min_spacing` has passed since the previous call.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing between successive upstream calls
#[derive(Debug)]
pub struct RequestPacer {
    min_spacing: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_call: Mutex::new(None),
        }
    }

    /// Pacer that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Wait for the next call slot and claim it. Concurrent callers queue on
    /// the lock.
    pub async fn pace(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let ready_at = last + self.min_spacing;
            if ready_at > Instant::now() {
                tracing::trace!(
                    wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "Pacing upstream request"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let pacer = RequestPacer::new(Duration::from_secs(60));
        let started = Instant::now();
        pacer.pace().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_second_call_waits_for_spacing() {
        let pacer = RequestPacer::new(Duration::from_millis(50));
        pacer.pace().await;
        let started = Instant::now();
        pacer.pace().await;
        assert!(started.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn test_disabled_pacer_never_waits() {
        let pacer = RequestPacer::disabled();
        let started = Instant::now();
        for _ in 0..10 {
            pacer.pace().await;
        }
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
