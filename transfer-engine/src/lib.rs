//! PointsPay Transfer Engine
//!
//! The transaction state machine for point transfers: prepare (debit the
//! sender, open a claimable window), confirm (credit a receiver exactly
//! once), cancel and expiry (refund the sender), coordinated over the
//! injectable stores from `points-ledger`.
//!
//! # Invariants
//!
//! - Conservation: Σ(balances) + Σ(pending amounts) is constant across
//!   every transfer operation
//! - At-most-once settlement: concurrent confirms of one transfer credit
//!   exactly one receiver
//! - Monotonic status: pending → completed | cancelled, never back
//! - Expiry wins: a confirm past the deadline cancels and refunds, never
//!   settles

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod seed;
pub mod service;
pub mod sweep;

// Re-exports
pub use auth::{Authenticator, Identity, StaticAuthenticator, VerifiedIdentity};
pub use config::{Config, SweepConfig};
pub use engine::LedgerEngine;
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use service::TransferService;
pub use sweep::ExpirySweeper;
