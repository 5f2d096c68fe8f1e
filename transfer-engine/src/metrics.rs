//! Metrics collection for observability
//!
//! Prometheus metrics for the transfer engine, registered on an owned
//! registry so that multiple engines (tests, embedded instances) never
//! collide on the process-global one.
//!
//! # Metrics
//!
//! - `transfers_prepared_total` - Transfers created (sender debited)
//! - `transfers_settled_total` - Transfers confirmed (receiver credited)
//! - `transfers_cancelled_total` - Transfers cancelled by the sender
//! - `transfers_expired_total` - Transfers auto-cancelled past deadline
//! - `points_reserved` - Points currently held by pending transfers

use prometheus::{Gauge, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transfers created
    pub transfers_prepared: IntCounter,

    /// Transfers settled to a receiver
    pub transfers_settled: IntCounter,

    /// Transfers cancelled by the sender
    pub transfers_cancelled: IntCounter,

    /// Transfers auto-cancelled on expiry
    pub transfers_expired: IntCounter,

    /// Points reserved by pending transfers
    pub points_reserved: Gauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transfers_prepared = IntCounter::with_opts(Opts::new(
            "transfers_prepared_total",
            "Transfers created (sender debited)",
        ))?;
        registry.register(Box::new(transfers_prepared.clone()))?;

        let transfers_settled = IntCounter::with_opts(Opts::new(
            "transfers_settled_total",
            "Transfers confirmed (receiver credited)",
        ))?;
        registry.register(Box::new(transfers_settled.clone()))?;

        let transfers_cancelled = IntCounter::with_opts(Opts::new(
            "transfers_cancelled_total",
            "Transfers cancelled by the sender",
        ))?;
        registry.register(Box::new(transfers_cancelled.clone()))?;

        let transfers_expired = IntCounter::with_opts(Opts::new(
            "transfers_expired_total",
            "Transfers auto-cancelled past their deadline",
        ))?;
        registry.register(Box::new(transfers_expired.clone()))?;

        let points_reserved = Gauge::with_opts(Opts::new(
            "points_reserved",
            "Points currently held by pending transfers",
        ))?;
        registry.register(Box::new(points_reserved.clone()))?;

        Ok(Self {
            transfers_prepared,
            transfers_settled,
            transfers_cancelled,
            transfers_expired,
            points_reserved,
            registry,
        })
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("transfers_prepared", &self.transfers_prepared.get())
            .field("transfers_settled", &self.transfers_settled.get())
            .field("transfers_cancelled", &self.transfers_cancelled.get())
            .field("transfers_expired", &self.transfers_expired.get())
            .field("points_reserved", &self.points_reserved.get())
            .finish()
    }
}
