//! Demo fixtures
//!
//! Dev-only seeding so a fresh server has something to click through: one
//! demo user with a claimable open transfer and one settled legacy
//! transfer. Never runs unless `seed_demo_data` is set in config.

use crate::{engine::LedgerEngine, Result};
use chrono::{Duration, Utc};
use points_ledger::{Email, Transaction, TransactionStatus, TransactionStore, User, UserStore};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Demo user email
pub const DEMO_EMAIL: &str = "test@example.com";

/// Seed the demo user and fixture transfers; returns the demo user.
pub fn seed_demo_data(
    engine: &LedgerEngine,
    users: &dyn UserStore,
    transactions: &dyn TransactionStore,
) -> Result<User> {
    // The extra 100 funds the open transfer below, leaving the visible
    // balance at 1000 with 100 reserved.
    let user = users.create(User::new(
        Email::new(DEMO_EMAIL),
        "Demo User",
        "demo-password-hash",
        Decimal::from(1100),
    ))?;

    engine.prepare(
        &user.email,
        Decimal::from(100),
        Some("Open demo transfer".to_string()),
        None,
    )?;

    // Legacy fixture: settled before deadlines existed, so expires_at is
    // None. The receiver snapshot points at a never-registered address,
    // which is fine because snapshots are not live foreign keys.
    let now = Utc::now();
    transactions.create(Transaction {
        transaction_id: Uuid::new_v4(),
        amount: Decimal::from(50),
        note: Some("Settled demo transfer".to_string()),
        sender_id: user.user_id,
        sender_email: user.email.clone(),
        sender_name: user.name.clone(),
        receiver_id: Some(Uuid::new_v4()),
        receiver_email: Some(Email::new("fake@example.com")),
        receiver_name: Some("Demo Receiver".to_string()),
        status: TransactionStatus::Completed,
        created_at: now - Duration::hours(1),
        expires_at: None,
        completed_at: Some(now - Duration::minutes(30)),
    })?;

    tracing::info!(email = DEMO_EMAIL, "Demo fixtures seeded");
    Ok(users.get_by_email(&Email::new(DEMO_EMAIL))?)
}
