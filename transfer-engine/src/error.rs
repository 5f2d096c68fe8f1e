//! Error taxonomy for the transfer engine
//!
//! Every variant is a distinct, user-actionable outcome; nothing here is
//! retried automatically. Unexpected store failures surface through the
//! `Ledger` variant, separate from the business taxonomy.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Result type for transfer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Transfer engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Transaction id does not exist
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Confirming identity does not resolve to a registered user
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Pinned receiver email is not a registered user
    #[error("Receiver not found: {0}")]
    ReceiverNotFound(String),

    /// Registration conflict
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// Transfer amount must be positive
    #[error("Invalid amount: {0} (must be positive)")]
    InvalidAmount(Decimal),

    /// Sender balance cannot cover the transfer
    #[error("Insufficient funds: balance {available}, requested {requested}")]
    InsufficientFunds {
        /// Sender balance at the time of the attempt
        available: Decimal,
        /// Transfer amount requested
        requested: Decimal,
    },

    /// Transaction already left the pending state
    #[error("Transaction already processed: {0}")]
    AlreadyProcessed(Uuid),

    /// Transaction deadline passed; it was cancelled and the sender refunded
    #[error("Transaction expired: {0}")]
    Expired(Uuid),

    /// Caller is not the actor this operation requires
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    /// Credential did not resolve to a verified identity
    #[error("Authentication failed")]
    Unauthenticated,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Unexpected store failure (internal, not part of the taxonomy above)
    #[error("Ledger error: {0}")]
    Ledger(#[from] points_ledger::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
