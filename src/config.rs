// src/config.rs
//! Configuration for the ledger and its facade

use std::{collections::BTreeMap, path::Path, time::Duration};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Analysis, AssetId, HolderId, LedgerError, NewAsset, Result};

/// Top-level configuration, usually read from a TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub store: StoreConfig,
    pub identity: IdentityConfig,
    pub enrichment: EnrichmentConfig,
    pub genesis: Vec<GenesisAsset>,
}

/// Which state store backs the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    Memory,
    Sqlite {
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Holder the facade acts as when no resolver is supplied
    pub default_holder: HolderId,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            default_holder: "user_admin".to_string(),
        }
    }
}

/// Timeouts and fallbacks for the analysis collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Per-attempt timeout (milliseconds)
    pub timeout_ms: u64,

    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds), doubled per retry
    pub initial_backoff_ms: u64,

    /// Upper bound on a single retry delay (milliseconds)
    pub max_backoff_ms: u64,

    /// Substituted when analysis is unavailable
    pub placeholder_description: String,
    pub placeholder_risk: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_attempts: 2,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
            placeholder_description: "Automatic description unavailable.".to_string(),
            placeholder_risk: "Manual risk assessment required.".to_string(),
        }
    }
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn placeholder(&self) -> Analysis {
        Analysis::new(&self.placeholder_description, &self.placeholder_risk)
    }
}

/// An asset present from first boot, with its starting registry.
///
/// Seeding mints it to `issuer` and replaces the registry with
/// `allocations` before the record is first stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisAsset {
    pub id: AssetId,
    pub name: String,
    pub location: String,
    pub total_value: Decimal,
    pub total_shares: u64,
    pub issuer: HolderId,
    /// Final holdings; must sum to `total_shares`
    pub allocations: BTreeMap<HolderId, u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub risk_analysis: Option<String>,
}

impl GenesisAsset {
    pub fn to_new_asset(&self) -> NewAsset {
        let mut new = NewAsset::new(
            &self.id,
            &self.name,
            &self.location,
            self.total_value,
            self.total_shares,
        );
        if let (Some(description), Some(risk)) = (&self.description, &self.risk_analysis) {
            new = new.with_analysis(Analysis::new(description, risk));
        }
        new
    }

    pub fn validate(&self) -> Result<()> {
        if self.issuer.trim().is_empty() {
            return Err(LedgerError::InvalidParameter(format!(
                "genesis asset {} has no issuer",
                self.id
            )));
        }
        if self.allocations.keys().any(|holder| holder.trim().is_empty()) {
            return Err(LedgerError::InvalidParameter(format!(
                "genesis allocations of {} name an empty holder",
                self.id
            )));
        }
        let allocated: u128 = self.allocations.values().map(|s| u128::from(*s)).sum();
        if allocated != u128::from(self.total_shares) {
            return Err(LedgerError::InvalidParameter(format!(
                "genesis allocations of {} sum to {}, expected {}",
                self.id, allocated, self.total_shares
            )));
        }
        if self.allocations.values().any(|shares| *shares == 0) {
            return Err(LedgerError::InvalidParameter(format!(
                "genesis allocations of {} contain a zero entry",
                self.id
            )));
        }
        Ok(())
    }
}

impl LedgerConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LedgerError::Config(format!(
                "failed to read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| LedgerError::Config(format!("failed to parse config: {}", e)))
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("SHARE_LEDGER_STORE_URL") {
            config.store = if url == "memory" {
                StoreConfig::Memory
            } else {
                StoreConfig::Sqlite { url }
            };
        }

        if let Ok(holder) = std::env::var("SHARE_LEDGER_HOLDER") {
            config.identity.default_holder = holder;
        }

        if let Ok(timeout) = std::env::var("SHARE_LEDGER_ENRICHMENT_TIMEOUT_MS") {
            config.enrichment.timeout_ms = timeout.parse().map_err(|_| {
                LedgerError::Config(format!(
                    "SHARE_LEDGER_ENRICHMENT_TIMEOUT_MS is not a number: {timeout}"
                ))
            })?;
        }

        if let Ok(attempts) = std::env::var("SHARE_LEDGER_ENRICHMENT_ATTEMPTS") {
            config.enrichment.max_attempts = attempts.parse().map_err(|_| {
                LedgerError::Config(format!(
                    "SHARE_LEDGER_ENRICHMENT_ATTEMPTS is not a number: {attempts}"
                ))
            })?;
        }

        Ok(config)
    }
}
