// src/identity.rs
use crate::{HolderId, config::IdentityConfig};

/// Supplies the holder a request acts as.
///
/// The ledger never authenticates this id; trust is established upstream.
pub trait IdentityResolver: Send + Sync {
    fn current(&self) -> HolderId;
}

/// A fixed, pre-authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    holder: HolderId,
}

impl StaticIdentity {
    pub fn new(holder: impl Into<HolderId>) -> Self {
        Self {
            holder: holder.into(),
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(&config.default_holder)
    }
}

impl IdentityResolver for StaticIdentity {
    fn current(&self) -> HolderId {
        self.holder.clone()
    }
}
