//! Error types for the ledger stores

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger store errors
#[derive(Error, Debug)]
pub enum Error {
    /// User not found (by email or id)
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Email already registered
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// Balance adjustment would go negative
    #[error("Insufficient funds: balance {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance at the time of the attempt
        available: rust_decimal::Decimal,
        /// Amount the adjustment tried to remove
        requested: rust_decimal::Decimal,
    },

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
