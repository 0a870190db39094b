// src/error.rs
use std::time::Duration;

use thiserror::Error;

use crate::{AssetId, HolderId};

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Asset already exists: {0}")]
    DuplicateAsset(AssetId),

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error(
        "Insufficient balance on {asset_id}: {holder} holds {available}, requested {requested}"
    )]
    InsufficientBalance {
        asset_id: AssetId,
        holder: HolderId,
        available: u64,
        requested: u64,
    },

    /// The stored record moved on since it was read.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Short label used for metrics and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::DuplicateAsset(_) => "duplicate_asset",
            Self::AssetNotFound(_) => "asset_not_found",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::Conflict(_) => "conflict",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Failure of the optional analysis collaborator. Never fatal to minting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("Enrichment unavailable: {0}")]
    Unavailable(String),

    #[error("Enrichment timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Malformed enrichment payload: {0}")]
    Malformed(String),
}
