//! Configuration for the transfer engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transfer engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// How long a prepared transfer stays claimable (minutes)
    pub pending_ttl_minutes: i64,

    /// Balance granted to newly registered users
    pub initial_balance: Decimal,

    /// Seed demo fixtures at startup (dev only)
    pub seed_demo_data: bool,

    /// Expiry sweep configuration
    pub sweep: SweepConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "transfer-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            pending_ttl_minutes: 30,
            initial_balance: Decimal::from(100),
            seed_demo_data: false,
            sweep: SweepConfig::default(),
        }
    }
}

/// Background expiry sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Run the sweeper task
    pub enabled: bool,

    /// Sweep interval (seconds)
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(ttl) = std::env::var("TRANSFER_TTL_MINUTES") {
            config.pending_ttl_minutes = ttl
                .parse()
                .map_err(|_| crate::Error::Config(format!("Bad TRANSFER_TTL_MINUTES: {}", ttl)))?;
        }

        if let Ok(interval) = std::env::var("TRANSFER_SWEEP_INTERVAL_SECS") {
            config.sweep.interval_secs = interval.parse().map_err(|_| {
                crate::Error::Config(format!("Bad TRANSFER_SWEEP_INTERVAL_SECS: {}", interval))
            })?;
        }

        if let Ok(seed) = std::env::var("TRANSFER_SEED_DEMO") {
            config.seed_demo_data = seed == "1" || seed.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.pending_ttl_minutes <= 0 {
            return Err(crate::Error::Config(
                "pending_ttl_minutes must be positive".to_string(),
            ));
        }
        if self.initial_balance < Decimal::ZERO {
            return Err(crate::Error::Config(
                "initial_balance must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
