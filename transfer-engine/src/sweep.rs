//! Background expiry sweep
//!
//! Lazy expiry only fires when someone touches a stale transfer, which
//! leaves reserved points stuck if nobody ever does. The sweeper walks
//! pending transfers on an interval and runs the authoritative
//! cancel-and-refund transition for everything past its deadline.

use crate::engine::LedgerEngine;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Periodic expiry sweeper
#[derive(Debug)]
pub struct ExpirySweeper {
    engine: Arc<LedgerEngine>,
    period: Duration,
}

impl ExpirySweeper {
    /// Create a sweeper running every `interval_secs`
    pub fn new(engine: Arc<LedgerEngine>, interval_secs: u64) -> Self {
        Self {
            engine,
            period: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Spawn the sweep loop on the runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the sweep loop until the task is aborted
    pub async fn run(self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.engine.sweep_expired() {
                Ok(0) => {}
                Ok(count) => {
                    tracing::debug!(count, "Expiry sweep pass complete");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Expiry sweep failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::{Duration as ChronoDuration, Utc};
    use points_ledger::{
        Email, MemoryTransactionStore, MemoryUserStore, TransactionStore, User, UserStore,
    };
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_sweeper_refunds_stale_transfer() {
        let users = Arc::new(MemoryUserStore::new());
        let transactions = Arc::new(MemoryTransactionStore::new());
        let engine = Arc::new(
            LedgerEngine::new(users.clone(), transactions.clone(), &Config::default()).unwrap(),
        );

        let alice = users
            .create(User::new(
                Email::new("alice@example.com"),
                "Alice",
                "hash",
                Decimal::from(1000),
            ))
            .unwrap();
        let tx = engine
            .prepare(&alice.email, Decimal::from(100), None, None)
            .unwrap();
        transactions
            .update(tx.transaction_id, &mut |t| {
                t.expires_at = Some(Utc::now() - ChronoDuration::minutes(1));
            })
            .unwrap();

        let handle = ExpirySweeper::new(engine.clone(), 1).spawn();

        // First tick fires immediately; poll until the refund lands
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let balance = users.get_by_email(&alice.email).unwrap().balance;
            if balance == Decimal::from(1000) {
                break;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "sweeper never refunded the stale transfer"
            );
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        handle.abort();

        let swept = engine.get(tx.transaction_id).unwrap();
        assert_eq!(swept.status, points_ledger::TransactionStatus::Cancelled);
    }
}
