//! Core types for the points ledger
//!
//! All types are designed for:
//! - Exact arithmetic (Decimal for points)
//! - Wire compatibility (camelCase JSON keys, stable field names)
//! - Immutability of everything outside the settlement-owned fields

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Normalized email address.
///
/// Emails are a unique secondary index on users (the true key is
/// `user_id`) and are case-normalized (trimmed, lowercased) at
/// construction so that lookups never depend on caller casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Create a normalized email
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Email {
    fn from(raw: String) -> Self {
        Email::new(raw)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User record
///
/// `user_id` is the immutable true key; `email` is a unique secondary
/// index. `balance` is mutated only through `UserStore::adjust_balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque unique identifier (immutable)
    pub user_id: Uuid,

    /// Unique, normalized email
    pub email: Email,

    /// Display name
    pub name: String,

    /// Opaque credential hash, owned by the external authenticator.
    /// Never serialized on the wire.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Point balance (non-negative after any committed operation)
    pub balance: Decimal,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record
    pub fn new(
        email: Email,
        name: impl Into<String>,
        password_hash: impl Into<String>,
        balance: Decimal,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email,
            name: name.into(),
            password_hash: password_hash.into(),
            balance,
            created_at: Utc::now(),
        }
    }
}

/// Transaction status
///
/// Monotonic: `Pending` moves to exactly one of the terminal states and
/// never reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created, sender debited, awaiting confirmation
    Pending,
    /// Settled, receiver credited (terminal)
    Completed,
    /// Cancelled or expired, sender refunded (terminal)
    Cancelled,
}

/// Transaction record
///
/// Sender and receiver fields are snapshots taken at transaction time and
/// are not kept in sync with later profile edits. The transfer engine is
/// the sole writer of `status`, `completed_at` and the receiver snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Opaque unique id
    pub transaction_id: Uuid,

    /// Transfer amount (> 0, fixed at creation)
    pub amount: Decimal,

    /// Optional note from the sender
    pub note: Option<String>,

    /// Sender id snapshot
    pub sender_id: Uuid,

    /// Sender email snapshot
    pub sender_email: Email,

    /// Sender name snapshot
    pub sender_name: String,

    /// Receiver id (null until settlement unless the sender pinned one)
    pub receiver_id: Option<Uuid>,

    /// Receiver email (pinned at creation or set at settlement)
    pub receiver_email: Option<Email>,

    /// Receiver name snapshot
    pub receiver_name: Option<String>,

    /// Current status
    pub status: TransactionStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Expiry deadline (None only for the legacy seed fixture)
    pub expires_at: Option<DateTime<Utc>>,

    /// Set exactly once, when status leaves `Pending`
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Check if the transaction is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            TransactionStatus::Completed | TransactionStatus::Cancelled
        )
    }

    /// Check if the deadline has passed at `now`.
    ///
    /// A transaction without a deadline never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    /// Status as it should be displayed at `now`: an expired transaction
    /// that is still `Pending` reads as `Cancelled` even before the
    /// authoritative confirm-path or sweep transition has run.
    pub fn display_status(&self, now: DateTime<Utc>) -> TransactionStatus {
        if self.status == TransactionStatus::Pending && self.is_expired(now) {
            TransactionStatus::Cancelled
        } else {
            self.status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_transaction() -> Transaction {
        Transaction {
            transaction_id: Uuid::new_v4(),
            amount: Decimal::from(100),
            note: Some("lunch".to_string()),
            sender_id: Uuid::new_v4(),
            sender_email: Email::new("alice@example.com"),
            sender_name: "Alice".to_string(),
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
    fn test_email_normalization() {
        let email = Email::new("  Alice@Example.COM ");
        assert_eq!(email.as_str(), "alice@example.com");
        assert_eq!(email, Email::new("alice@example.com"));
    }

    #[test]
    fn test_email_deserializes_normalized() {
        let email: Email = serde_json::from_str("\"Bob@Example.com\"").unwrap();
        assert_eq!(email.as_str(), "bob@example.com");
    }

    #[test]
    fn test_transaction_terminal_states() {
        let mut tx = sample_transaction();
        assert!(!tx.is_terminal());

        tx.status = TransactionStatus::Completed;
        assert!(tx.is_terminal());

        tx.status = TransactionStatus::Cancelled;
        assert!(tx.is_terminal());
    }

    #[test]
    fn test_transaction_expiry() {
        let mut tx = sample_transaction();
        let now = Utc::now();

        assert!(!tx.is_expired(now));
        assert!(tx.is_expired(now + Duration::hours(1)));

        // Legacy fixture shape: no deadline, never expires
        tx.expires_at = None;
        assert!(!tx.is_expired(now + Duration::days(365)));
    }

    #[test]
    fn test_display_status_for_expired_pending() {
        let tx = sample_transaction();
        let past_deadline = Utc::now() + Duration::hours(1);

        assert_eq!(tx.display_status(Utc::now()), TransactionStatus::Pending);
        assert_eq!(
            tx.display_status(past_deadline),
            TransactionStatus::Cancelled
        );
        // Store record itself is untouched
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[test]
    fn test_transaction_wire_keys_are_camel_case() {
        let tx = sample_transaction();
        let json = serde_json::to_value(&tx).unwrap();
        let obj = json.as_object().unwrap();

        // Existing clients depend on these exact key names
        for key in [
            "transactionId",
            "amount",
            "note",
            "senderId",
            "senderEmail",
            "senderName",
            "receiverId",
            "receiverEmail",
            "receiverName",
            "status",
            "createdAt",
            "expiresAt",
            "completedAt",
        ] {
            assert!(obj.contains_key(key), "missing wire key {}", key);
        }
        assert_eq!(obj["status"], "pending");
    }

    #[test]
    fn test_user_wire_form_hides_password_hash() {
        let user = User::new(
            Email::new("carol@example.com"),
            "Carol",
            "$2b$12$abcdef",
            Decimal::from(100),
        );
        let json = serde_json::to_value(&user).unwrap();
        let obj = json.as_object().unwrap();

        assert!(obj.contains_key("userId"));
        assert!(obj.contains_key("createdAt"));
        assert!(!obj.contains_key("passwordHash"));
        assert!(!obj.contains_key("password_hash"));
    }

    #[test]
    fn test_transaction_round_trip() {
        let tx = sample_transaction();
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();

        assert_eq!(back.transaction_id, tx.transaction_id);
        assert_eq!(back.amount, tx.amount);
        assert_eq!(back.sender_email, tx.sender_email);
        assert_eq!(back.status, tx.status);
        assert_eq!(back.expires_at, tx.expires_at);
    }
}
