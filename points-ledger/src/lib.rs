//! PointsPay Ledger
//!
//! Data model and storage contracts for the points-transfer ledger:
//! user records with balances, transaction records with their lifecycle
//! fields, and the injectable store interfaces the transfer engine
//! coordinates.
//!
//! # Invariants
//!
//! - Balance non-negativity: `User.balance >= 0` after any committed
//!   operation
//! - Conservation: Σ(balances) + Σ(pending amounts) never changes except
//!   through registration
//! - Transaction immutability: everything but `status`, `completed_at`
//!   and the receiver snapshot is set once at creation

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod store;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use store::{MemoryTransactionStore, MemoryUserStore, TransactionStore, UserStore};
pub use types::{Email, Transaction, TransactionStatus, User};
