//! Store contracts and in-memory implementations
//!
//! The engine only ever sees the `UserStore` / `TransactionStore` traits;
//! the in-memory implementations below back tests and the demo server,
//! and a durable backend can be dropped in without touching the engine.
//!
//! # Atomicity contracts
//!
//! - `adjust_balance` is an atomic read-modify-write on a single user:
//!   concurrent adjustments to the same user serialize, and an adjustment
//!   that would drive the balance negative is rejected as a unit.
//! - `update` applies its mutator to a single transaction record as one
//!   unit; two concurrent `update` calls on the same id never interleave.

use crate::{
    error::{Error, Result},
    types::{Email, Transaction, User},
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

/// User record store
pub trait UserStore: Send + Sync {
    /// Look up a user by normalized email
    fn get_by_email(&self, email: &Email) -> Result<User>;

    /// Look up a user by id
    fn get_by_id(&self, user_id: Uuid) -> Result<User>;

    /// Insert a new user; fails with `DuplicateEmail` if the email is taken
    fn create(&self, user: User) -> Result<User>;

    /// Atomically apply `balance += delta`; fails with `InsufficientFunds`
    /// if the result would be negative. Mutates the record in place, no
    /// history of prior balances is kept.
    fn adjust_balance(&self, email: &Email, delta: Decimal) -> Result<User>;

    /// Sum of all balances (audit read for the conservation check)
    fn total_balance(&self) -> Decimal;
}

/// Transaction record store
pub trait TransactionStore: Send + Sync {
    /// Get a transaction by id
    fn get(&self, transaction_id: Uuid) -> Result<Transaction>;

    /// Insert a new transaction record
    fn create(&self, transaction: Transaction) -> Result<Transaction>;

    /// Apply `mutator` to the record as one atomic unit and return the
    /// updated snapshot
    fn update(
        &self,
        transaction_id: Uuid,
        mutator: &mut dyn FnMut(&mut Transaction),
    ) -> Result<Transaction>;

    /// All transactions where the user is sender or receiver
    /// (unordered; ordering is an engine concern)
    fn list_by_participant(&self, user_id: Uuid) -> Vec<Transaction>;

    /// All transactions still in `Pending` (sweep input)
    fn list_pending(&self) -> Vec<Transaction>;
}

/// In-memory user store.
///
/// Users are keyed by `user_id` with a unique `email -> user_id` index,
/// so email stays a secondary index rather than a primary key.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
    by_email: DashMap<Email, Uuid>,
}

impl MemoryUserStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// True if no users are registered
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserStore for MemoryUserStore {
    fn get_by_email(&self, email: &Email) -> Result<User> {
        let user_id = self
            .by_email
            .get(email)
            .map(|id| *id)
            .ok_or_else(|| Error::UserNotFound(email.to_string()))?;

        self.get_by_id(user_id)
    }

    fn get_by_id(&self, user_id: Uuid) -> Result<User> {
        self.users
            .get(&user_id)
            .map(|u| u.clone())
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    fn create(&self, user: User) -> Result<User> {
        // The email index entry is the uniqueness gate: whoever claims it
        // first owns the registration.
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateEmail(user.email.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user.user_id);
                self.users.insert(user.user_id, user.clone());

                tracing::debug!(user_id = %user.user_id, email = %user.email, "User created");
                Ok(user)
            }
        }
    }

    fn adjust_balance(&self, email: &Email, delta: Decimal) -> Result<User> {
        let user_id = self
            .by_email
            .get(email)
            .map(|id| *id)
            .ok_or_else(|| Error::UserNotFound(email.to_string()))?;

        // The shard guard from get_mut serializes concurrent adjustments
        // to the same user.
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        let next = user.balance + delta;
        if next < Decimal::ZERO {
            return Err(Error::InsufficientFunds {
                available: user.balance,
                requested: -delta,
            });
        }

        user.balance = next;
        Ok(user.clone())
    }

    fn total_balance(&self) -> Decimal {
        self.users.iter().map(|u| u.balance).sum()
    }
}

/// In-memory transaction store
#[derive(Debug, Default)]
pub struct MemoryTransactionStore {
    transactions: DashMap<Uuid, Transaction>,
}

impl MemoryTransactionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transactions
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// True if no transactions are stored
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Sum of all pending amounts (audit read)
    pub fn total_pending(&self) -> Decimal {
        self.transactions
            .iter()
            .filter(|t| t.status == crate::types::TransactionStatus::Pending)
            .map(|t| t.amount)
            .sum()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn get(&self, transaction_id: Uuid) -> Result<Transaction> {
        self.transactions
            .get(&transaction_id)
            .map(|t| t.clone())
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))
    }

    fn create(&self, transaction: Transaction) -> Result<Transaction> {
        match self.transactions.entry(transaction.transaction_id) {
            Entry::Occupied(_) => Err(Error::Storage(format!(
                "Transaction id collision: {}",
                transaction.transaction_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(transaction.clone());
                Ok(transaction)
            }
        }
    }

    fn update(
        &self,
        transaction_id: Uuid,
        mutator: &mut dyn FnMut(&mut Transaction),
    ) -> Result<Transaction> {
        let mut entry = self
            .transactions
            .get_mut(&transaction_id)
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))?;

        mutator(&mut entry);
        Ok(entry.clone())
    }

    fn list_by_participant(&self, user_id: Uuid) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.sender_id == user_id || t.receiver_id == Some(user_id))
            .map(|t| t.clone())
            .collect()
    }

    fn list_pending(&self) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.status == crate::types::TransactionStatus::Pending)
            .map(|t| t.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionStatus;
    use chrono::{Duration, Utc};

    fn test_user(email: &str, balance: i64) -> User {
        User::new(Email::new(email), "Test User", "hash", Decimal::from(balance))
    }

    fn test_transaction(sender: &User, amount: i64) -> Transaction {
        Transaction {
            transaction_id: Uuid::new_v4(),
            amount: Decimal::from(amount),
            note: None,
            sender_id: sender.user_id,
            sender_email: sender.email.clone(),
            sender_name: sender.name.clone(),
            receiver_id: None,
            receiver_email: None,
            receiver_name: None,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
            expires_at: Some(Utc::now() + Duration::minutes(30)),
            completed_at: None,
        }
    }

    #[test]
    fn test_create_and_lookup_user() {
        let store = MemoryUserStore::new();
        let user = store.create(test_user("alice@example.com", 1000)).unwrap();

        let by_email = store.get_by_email(&Email::new("alice@example.com")).unwrap();
        assert_eq!(by_email.user_id, user.user_id);

        let by_id = store.get_by_id(user.user_id).unwrap();
        assert_eq!(by_id.email, user.email);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        store.create(test_user("alice@example.com", 1000)).unwrap();

        // Differently-cased registration hits the same normalized index slot
        let result = store.create(test_user("Alice@Example.com", 50));
        assert!(matches!(result, Err(Error::DuplicateEmail(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_adjust_balance() {
        let store = MemoryUserStore::new();
        let user = store.create(test_user("alice@example.com", 1000)).unwrap();

        let updated = store
            .adjust_balance(&user.email, Decimal::from(-300))
            .unwrap();
        assert_eq!(updated.balance, Decimal::from(700));

        let updated = store.adjust_balance(&user.email, Decimal::from(50)).unwrap();
        assert_eq!(updated.balance, Decimal::from(750));
    }

    #[test]
    fn test_adjust_balance_rejects_negative_result() {
        let store = MemoryUserStore::new();
        let user = store.create(test_user("alice@example.com", 100)).unwrap();

        let result = store.adjust_balance(&user.email, Decimal::from(-101));
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));

        // Rejected as a unit: balance unchanged
        let after = store.get_by_email(&user.email).unwrap();
        assert_eq!(after.balance, Decimal::from(100));
    }

    #[test]
    fn test_concurrent_adjustments_serialize() {
        use std::sync::Arc;

        let store = Arc::new(MemoryUserStore::new());
        let user = store.create(test_user("alice@example.com", 1000)).unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let email = user.email.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    store.adjust_balance(&email, Decimal::from(-1)).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // No lost updates: 1000 - 10 * 100
        let after = store.get_by_email(&user.email).unwrap();
        assert_eq!(after.balance, Decimal::ZERO);
    }

    #[test]
    fn test_transaction_create_get_update() {
        let users = MemoryUserStore::new();
        let sender = users.create(test_user("alice@example.com", 1000)).unwrap();

        let store = MemoryTransactionStore::new();
        let tx = store.create(test_transaction(&sender, 100)).unwrap();

        let fetched = store.get(tx.transaction_id).unwrap();
        assert_eq!(fetched.status, TransactionStatus::Pending);

        let updated = store
            .update(tx.transaction_id, &mut |t| {
                t.status = TransactionStatus::Cancelled;
                t.completed_at = Some(Utc::now());
            })
            .unwrap();
        assert_eq!(updated.status, TransactionStatus::Cancelled);
        assert!(updated.completed_at.is_some());
    }

    #[test]
    fn test_get_missing_transaction() {
        let store = MemoryTransactionStore::new();
        let result = store.get(Uuid::new_v4());
        assert!(matches!(result, Err(Error::TransactionNotFound(_))));
    }

    #[test]
    fn test_list_by_participant() {
        let users = MemoryUserStore::new();
        let alice = users.create(test_user("alice@example.com", 1000)).unwrap();
        let bob = users.create(test_user("bob@example.com", 1000)).unwrap();

        let store = MemoryTransactionStore::new();
        let sent = store.create(test_transaction(&alice, 100)).unwrap();

        let mut received = test_transaction(&bob, 50);
        received.receiver_id = Some(alice.user_id);
        received.receiver_email = Some(alice.email.clone());
        store.create(received).unwrap();

        store.create(test_transaction(&bob, 25)).unwrap();

        let for_alice = store.list_by_participant(alice.user_id);
        assert_eq!(for_alice.len(), 2);
        assert!(for_alice.iter().any(|t| t.transaction_id == sent.transaction_id));

        let for_bob = store.list_by_participant(bob.user_id);
        assert_eq!(for_bob.len(), 2);
    }

    #[test]
    fn test_list_pending_and_totals() {
        let users = MemoryUserStore::new();
        let alice = users.create(test_user("alice@example.com", 1000)).unwrap();

        let store = MemoryTransactionStore::new();
        let tx1 = store.create(test_transaction(&alice, 100)).unwrap();
        store.create(test_transaction(&alice, 40)).unwrap();

        store
            .update(tx1.transaction_id, &mut |t| {
                t.status = TransactionStatus::Completed;
            })
            .unwrap();

        let pending = store.list_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(store.total_pending(), Decimal::from(40));
    }
}
