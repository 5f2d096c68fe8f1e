//! Authenticated service facade
//!
//! What an external API layer calls: each method resolves the caller's
//! credential through the `Authenticator`, re-fetches the user record
//! (tokens carry identity only, never balances or names), and delegates
//! to the engine. The public methods skip authentication entirely.

use crate::{
    auth::{Authenticator, Identity},
    config::Config,
    engine::LedgerEngine,
    Error, Result,
};
use points_ledger::{Email, Error as LedgerError, Transaction, User, UserStore};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Transfer service: authentication seam + engine
pub struct TransferService {
    engine: Arc<LedgerEngine>,
    users: Arc<dyn UserStore>,
    authenticator: Arc<dyn Authenticator>,
    initial_balance: Decimal,
}

impl TransferService {
    /// Create the service over an engine and its user store
    pub fn new(
        engine: Arc<LedgerEngine>,
        users: Arc<dyn UserStore>,
        authenticator: Arc<dyn Authenticator>,
        config: &Config,
    ) -> Self {
        Self {
            engine,
            users,
            authenticator,
            initial_balance: config.initial_balance,
        }
    }

    /// Register a new user.
    ///
    /// `password_hash` is produced by the external credential layer; the
    /// service never sees a plaintext password. New users start with the
    /// configured initial balance.
    pub fn register(
        &self,
        email: Email,
        name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<User> {
        let user = User::new(email, name, password_hash, self.initial_balance);
        let created = self.users.create(user).map_err(|e| match e {
            LedgerError::DuplicateEmail(m) => Error::DuplicateEmail(m),
            other => Error::Ledger(other),
        })?;

        tracing::info!(user_id = %created.user_id, email = %created.email, "User registered");
        Ok(created)
    }

    /// Current user record for a credential
    pub fn current_user(&self, credential: &str) -> Result<User> {
        self.caller(credential)
    }

    /// The caller's transaction history, newest first
    pub fn list_transactions(&self, credential: &str) -> Result<Vec<Transaction>> {
        let user = self.caller(credential)?;
        Ok(self.engine.list_for_user(user.user_id))
    }

    /// Prepare a transfer on behalf of the caller
    pub fn prepare(
        &self,
        credential: &str,
        amount: Decimal,
        note: Option<String>,
        receiver_email: Option<Email>,
    ) -> Result<Transaction> {
        let sender = self.caller(credential)?;
        self.engine
            .prepare(&sender.email, amount, note, receiver_email.as_ref())
    }

    /// Confirm a transfer as the caller
    pub fn confirm(&self, credential: &str, transaction_id: Uuid) -> Result<Transaction> {
        let user = self.caller(credential)?;
        self.engine.confirm(
            transaction_id,
            &Identity {
                email: user.email,
                name: user.name,
            },
        )
    }

    /// Cancel a transfer; only its sender may do this
    pub fn cancel(&self, credential: &str, transaction_id: Uuid) -> Result<Transaction> {
        let user = self.caller(credential)?;
        self.engine.cancel(transaction_id, &user.email)
    }

    /// Authenticated read of a transaction
    pub fn get(&self, credential: &str, transaction_id: Uuid) -> Result<Transaction> {
        self.caller(credential)?;
        self.engine.get(transaction_id)
    }

    /// Public (unauthenticated) read of a transaction
    pub fn get_public(&self, transaction_id: Uuid) -> Result<Transaction> {
        self.engine.get_public(transaction_id)
    }

    /// Public (unauthenticated) confirm: the claiming email and name come
    /// from the request body and must belong to a registered user
    pub fn confirm_public(
        &self,
        transaction_id: Uuid,
        email: Email,
        name: impl Into<String>,
    ) -> Result<Transaction> {
        self.engine.confirm_public(
            transaction_id,
            &Identity {
                email,
                name: name.into(),
            },
        )
    }

    // Resolve credential to a fresh user record. A valid token whose user
    // is gone counts as an authentication failure, same as a bad token.
    fn caller(&self, credential: &str) -> Result<User> {
        let identity = self.authenticator.authenticate(credential)?;
        self.users.get_by_email(&identity.email).map_err(|e| match e {
            LedgerError::UserNotFound(_) => Error::Unauthenticated,
            other => Error::Ledger(other),
        })
    }
}

impl std::fmt::Debug for TransferService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferService")
            .field("initial_balance", &self.initial_balance)
            .finish_non_exhaustive()
    }
}
