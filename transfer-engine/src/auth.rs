//! Authentication seam
//!
//! Token issuance and verification live outside this workspace (JWT,
//! password hashing). What the engine needs from them is narrow: a
//! credential either resolves to a verified identity or it does not.
//! Tokens carry only the identity claim; callers re-fetch the user record
//! on every request, so no mutable state (name, balance) is ever trusted
//! from a token.

use crate::{Error, Result};
use dashmap::DashMap;
use points_ledger::Email;
use uuid::Uuid;

/// Identity claim extracted from a verified credential
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// User id claim
    pub user_id: Uuid,

    /// Email claim (normalized)
    pub email: Email,
}

/// Confirming identity for a transfer: who is claiming the points.
///
/// For the authenticated path this is built from a re-fetched user
/// record; for the public path it is caller-supplied and unverified.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Claimed email (normalized)
    pub email: Email,

    /// Claimed display name, snapshotted into the transaction
    pub name: String,
}

/// Resolves a credential to a verified user identity
pub trait Authenticator: Send + Sync {
    /// Verify `credential` and return the identity it carries
    fn authenticate(&self, credential: &str) -> Result<VerifiedIdentity>;
}

/// In-memory token table.
///
/// Stands in for the external JWT verifier in tests and the demo server:
/// issued tokens are opaque strings mapped to identity claims.
#[derive(Debug, Default)]
pub struct StaticAuthenticator {
    tokens: DashMap<String, VerifiedIdentity>,
}

impl StaticAuthenticator {
    /// Create an empty token table
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for an identity
    pub fn issue(&self, token: impl Into<String>, identity: VerifiedIdentity) {
        self.tokens.insert(token.into(), identity);
    }

    /// Revoke a token
    pub fn revoke(&self, token: &str) {
        self.tokens.remove(token);
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, credential: &str) -> Result<VerifiedIdentity> {
        self.tokens
            .get(credential)
            .map(|identity| identity.clone())
            .ok_or(Error::Unauthenticated)
    }
}
