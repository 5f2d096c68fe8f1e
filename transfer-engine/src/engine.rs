//! The transfer state machine
//!
//! `LedgerEngine` owns every transition a transaction can make and is the
//! sole writer of transaction status, the receiver snapshot, and user
//! balances. Transfers are debit-on-prepare: the amount leaves the sender
//! when the transaction is created and is either credited to a receiver on
//! confirm or returned to the sender on cancel/expiry.
//!
//! # Locking discipline
//!
//! Each transaction id has its own lock, taken for the whole
//! read-check-mutate sequence of confirm/cancel/expire, so two concurrent
//! confirms can never both observe `Pending`. Balance adjustments are
//! atomic inside the user store. Lock order is always transaction first,
//! then balance; `prepare` only ever touches a fresh transaction id, so
//! the discipline is cycle-free.

use crate::{auth::Identity, config::Config, metrics::Metrics, Error, Result};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use points_ledger::{
    Email, Error as LedgerError, Transaction, TransactionStatus, TransactionStore, User, UserStore,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Transfer state machine over the user and transaction stores
pub struct LedgerEngine {
    /// User records and balances
    users: Arc<dyn UserStore>,

    /// Transaction records
    transactions: Arc<dyn TransactionStore>,

    /// Per-transaction locks (records persist forever, so entries do too)
    locks: DashMap<Uuid, Arc<Mutex<()>>>,

    /// Pending-window TTL
    ttl: Duration,

    /// Metrics collector
    metrics: Metrics,
}

impl LedgerEngine {
    /// Create a new engine over injected stores
    pub fn new(
        users: Arc<dyn UserStore>,
        transactions: Arc<dyn TransactionStore>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            users,
            transactions,
            locks: DashMap::new(),
            ttl: Duration::minutes(config.pending_ttl_minutes),
            metrics: Metrics::new()?,
        })
    }

    /// Metrics collector (for scraping endpoints owned by the API layer)
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Prepare a transfer: debit the sender and create a pending
    /// transaction claimable until `now + TTL`.
    ///
    /// With `receiver_email` the transaction is pinned: only that user may
    /// confirm it, and they must already be registered. Without it the
    /// transfer is open to whoever confirms first.
    pub fn prepare(
        &self,
        sender_email: &Email,
        amount: Decimal,
        note: Option<String>,
        receiver_email: Option<&Email>,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(amount));
        }

        let sender = self.require_user(sender_email)?;
        if sender.balance < amount {
            return Err(Error::InsufficientFunds {
                available: sender.balance,
                requested: amount,
            });
        }

        // Pinned receiver must exist; snapshot id and name now
        let receiver = match receiver_email {
            Some(email) => Some(self.users.get_by_email(email).map_err(|e| match e {
                LedgerError::UserNotFound(m) => Error::ReceiverNotFound(m),
                other => Error::Ledger(other),
            })?),
            None => None,
        };

        // Atomic debit; the store rejects a negative result even if another
        // prepare raced past the balance check above.
        self.debit(sender_email, amount)?;

        let now = Utc::now();
        let transaction = Transaction {
            transaction_id: Uuid::new_v4(),
            amount,
            note,
            sender_id: sender.user_id,
            sender_email: sender.email.clone(),
            sender_name: sender.name.clone(),
            receiver_id: receiver.as_ref().map(|r| r.user_id),
            receiver_email: receiver_email.cloned(),
            receiver_name: receiver.as_ref().map(|r| r.name.clone()),
            status: TransactionStatus::Pending,
            created_at: now,
            expires_at: Some(now + self.ttl),
            completed_at: None,
        };

        let created = match self.transactions.create(transaction) {
            Ok(tx) => tx,
            Err(e) => {
                // Unwind the provisional debit so no points vanish
                self.users.adjust_balance(sender_email, amount)?;
                return Err(Error::Ledger(e));
            }
        };

        self.metrics.transfers_prepared.inc();
        self.metrics
            .points_reserved
            .add(amount.to_f64().unwrap_or(0.0));
        tracing::info!(
            transaction_id = %created.transaction_id,
            sender = %created.sender_email,
            %amount,
            pinned = receiver_email.is_some(),
            "Transfer prepared"
        );

        Ok(created)
    }

    /// Confirm a transfer with an identity taken from a verified session.
    ///
    /// Checks run in order, first failure wins: existence, expiry (which
    /// lazily cancels and refunds), pending status, pinned receiver,
    /// registered user. Exactly one concurrent confirm can win; the rest
    /// observe `AlreadyProcessed` or `Expired`.
    pub fn confirm(&self, transaction_id: Uuid, identity: &Identity) -> Result<Transaction> {
        self.settle(transaction_id, identity)
    }

    /// Confirm a transfer with a caller-supplied, unverified identity.
    ///
    /// Same state machine as `confirm`; the claiming email must belong to
    /// a registered user, and `UserNotFound` tells the caller the receiver
    /// is unknown rather than the transaction id being bad.
    pub fn confirm_public(&self, transaction_id: Uuid, identity: &Identity) -> Result<Transaction> {
        self.settle(transaction_id, identity)
    }

    fn settle(&self, transaction_id: Uuid, identity: &Identity) -> Result<Transaction> {
        let lock = self.transaction_lock(transaction_id);
        let _guard = lock.lock();

        let tx = self.require_transaction(transaction_id)?;
        let now = Utc::now();

        if tx.status == TransactionStatus::Pending && tx.is_expired(now) {
            self.expire_locked(&tx, now)?;
            return Err(Error::Expired(transaction_id));
        }

        if tx.status != TransactionStatus::Pending {
            return Err(Error::AlreadyProcessed(transaction_id));
        }

        if let Some(pinned) = &tx.receiver_email {
            if pinned != &identity.email {
                return Err(Error::Forbidden(
                    "this transfer is pinned to a different receiver",
                ));
            }
        }

        let receiver = self.users.get_by_email(&identity.email).map_err(|e| match e {
            LedgerError::UserNotFound(m) => Error::UserNotFound(m),
            other => Error::Ledger(other),
        })?;

        let settled = self.transactions.update(transaction_id, &mut |t| {
            t.receiver_id = Some(receiver.user_id);
            t.receiver_email = Some(identity.email.clone());
            t.receiver_name = Some(identity.name.clone());
            t.status = TransactionStatus::Completed;
            t.completed_at = Some(now);
        })?;

        self.users.adjust_balance(&receiver.email, settled.amount)?;

        self.metrics.transfers_settled.inc();
        self.metrics
            .points_reserved
            .sub(settled.amount.to_f64().unwrap_or(0.0));
        tracing::info!(
            transaction_id = %transaction_id,
            receiver = %receiver.email,
            amount = %settled.amount,
            "Transfer settled"
        );

        Ok(settled)
    }

    /// Cancel a pending transfer and refund the sender.
    ///
    /// Only the sender may cancel. No expiry check runs here: a sender can
    /// still cancel past the deadline, which reaches the same cancelled
    /// refunded end state the lazy expiry would.
    pub fn cancel(&self, transaction_id: Uuid, requester_email: &Email) -> Result<Transaction> {
        let lock = self.transaction_lock(transaction_id);
        let _guard = lock.lock();

        let tx = self.require_transaction(transaction_id)?;

        if &tx.sender_email != requester_email {
            return Err(Error::Forbidden("only the sender may cancel a transfer"));
        }

        if tx.status != TransactionStatus::Pending {
            return Err(Error::AlreadyProcessed(transaction_id));
        }

        let now = Utc::now();
        let cancelled = self.transactions.update(transaction_id, &mut |t| {
            t.status = TransactionStatus::Cancelled;
            t.completed_at = Some(now);
        })?;

        self.users
            .adjust_balance(&cancelled.sender_email, cancelled.amount)?;

        self.metrics.transfers_cancelled.inc();
        self.metrics
            .points_reserved
            .sub(cancelled.amount.to_f64().unwrap_or(0.0));
        tracing::info!(
            transaction_id = %transaction_id,
            sender = %cancelled.sender_email,
            amount = %cancelled.amount,
            "Transfer cancelled"
        );

        Ok(cancelled)
    }

    /// Get a transaction (pure read)
    pub fn get(&self, transaction_id: Uuid) -> Result<Transaction> {
        self.require_transaction(transaction_id)
    }

    /// Public read of a transaction: reports `Expired` for an
    /// expired-but-still-pending transfer without mutating it, so share
    /// links stop working at the deadline even before the authoritative
    /// transition has run.
    pub fn get_public(&self, transaction_id: Uuid) -> Result<Transaction> {
        let tx = self.require_transaction(transaction_id)?;

        if tx.status == TransactionStatus::Pending && tx.is_expired(Utc::now()) {
            return Err(Error::Expired(transaction_id));
        }

        Ok(tx)
    }

    /// All transactions the user participates in, newest first.
    ///
    /// Expired-but-still-pending entries read as cancelled in the returned
    /// snapshots; the store records are untouched (the authoritative
    /// transition is the confirm path or the sweep).
    pub fn list_for_user(&self, user_id: Uuid) -> Vec<Transaction> {
        let now = Utc::now();
        let mut transactions = self.transactions.list_by_participant(user_id);
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        for tx in &mut transactions {
            tx.status = tx.display_status(now);
        }

        transactions
    }

    /// Cancel and refund every pending transfer past its deadline.
    ///
    /// Each candidate is re-checked under its own lock, so a confirm that
    /// races the sweep still settles or expires exactly once. Returns how
    /// many transfers were expired.
    pub fn sweep_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut expired = 0usize;

        for candidate in self.transactions.list_pending() {
            if !candidate.is_expired(now) {
                continue;
            }

            let lock = self.transaction_lock(candidate.transaction_id);
            let _guard = lock.lock();

            // Re-read under the lock; a racing confirm may have won
            let tx = self.require_transaction(candidate.transaction_id)?;
            if tx.status == TransactionStatus::Pending && tx.is_expired(now) {
                self.expire_locked(&tx, now)?;
                expired += 1;
            }
        }

        if expired > 0 {
            tracing::info!(count = expired, "Expiry sweep cancelled stale transfers");
        }

        Ok(expired)
    }

    /// Points in circulation: Σ(user balances) + Σ(pending amounts).
    ///
    /// Invariant under every transfer operation; only registration moves it.
    pub fn total_points(&self) -> Decimal {
        let balances = self.users.total_balance();
        let reserved: Decimal = self
            .transactions
            .list_pending()
            .iter()
            .map(|t| t.amount)
            .sum();

        balances + reserved
    }

    // Expiry transition; caller holds the transaction lock.
    fn expire_locked(&self, tx: &Transaction, now: DateTime<Utc>) -> Result<Transaction> {
        let cancelled = self.transactions.update(tx.transaction_id, &mut |t| {
            t.status = TransactionStatus::Cancelled;
            t.completed_at = Some(now);
        })?;

        self.users
            .adjust_balance(&cancelled.sender_email, cancelled.amount)?;

        self.metrics.transfers_expired.inc();
        self.metrics
            .points_reserved
            .sub(cancelled.amount.to_f64().unwrap_or(0.0));
        tracing::info!(
            transaction_id = %cancelled.transaction_id,
            sender = %cancelled.sender_email,
            amount = %cancelled.amount,
            "Transfer expired, sender refunded"
        );

        Ok(cancelled)
    }

    fn transaction_lock(&self, transaction_id: Uuid) -> Arc<Mutex<()>> {
        self.locks.entry(transaction_id).or_default().clone()
    }

    fn require_user(&self, email: &Email) -> Result<User> {
        self.users.get_by_email(email).map_err(|e| match e {
            LedgerError::UserNotFound(m) => Error::UserNotFound(m),
            other => Error::Ledger(other),
        })
    }

    fn require_transaction(&self, transaction_id: Uuid) -> Result<Transaction> {
        self.transactions.get(transaction_id).map_err(|e| match e {
            LedgerError::TransactionNotFound(_) => Error::TransactionNotFound(transaction_id),
            other => Error::Ledger(other),
        })
    }

    fn debit(&self, email: &Email, amount: Decimal) -> Result<User> {
        match self.users.adjust_balance(email, -amount) {
            Ok(user) => Ok(user),
            Err(LedgerError::InsufficientFunds {
                available,
                requested,
            }) => Err(Error::InsufficientFunds {
                available,
                requested,
            }),
            Err(other) => Err(Error::Ledger(other)),
        }
    }
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
