// src/adapters/mod.rs
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::{Asset, Result};

/// Key-value state store holding one record per asset id.
///
/// Implementors MUST:
/// 1. Make every call atomic with respect to a single record, so readers
///    never observe a half-written asset
/// 2. Reject `insert` of an existing key with `DuplicateAsset`
/// 3. Reject `update` with `Conflict` when the stored revision differs from
///    `expected_revision`, and with `AssetNotFound` when the key is absent
/// 4. Return `scan` results in insertion order
///
/// The store enforces no share invariants; `AssetLedger` does.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Asset>>;

    async fn contains(&self, id: &str) -> Result<bool>;

    async fn insert(&self, asset: &Asset) -> Result<()>;

    async fn update(&self, asset: &Asset, expected_revision: u64) -> Result<()>;

    async fn scan(&self) -> Result<Vec<Asset>>;
}
