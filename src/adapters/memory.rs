// src/adapters/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{Asset, AssetId, LedgerError, Result, adapters::StateStore};

#[derive(Default)]
struct MemoryState {
    records: HashMap<AssetId, Asset>,
    order: Vec<AssetId>,
}

/// In-process store. Each call runs inside one critical section of a single
/// `RwLock`, so a scan sees every record at one committed revision.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Asset>> {
        Ok(self.state.read().records.get(id).cloned())
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.state.read().records.contains_key(id))
    }

    async fn insert(&self, asset: &Asset) -> Result<()> {
        let mut state = self.state.write();
        if state.records.contains_key(&asset.id) {
            return Err(LedgerError::DuplicateAsset(asset.id.clone()));
        }
        state.order.push(asset.id.clone());
        state.records.insert(asset.id.clone(), asset.clone());
        Ok(())
    }

    async fn update(&self, asset: &Asset, expected_revision: u64) -> Result<()> {
        let mut state = self.state.write();
        let stored = state
            .records
            .get_mut(&asset.id)
            .ok_or_else(|| LedgerError::AssetNotFound(asset.id.clone()))?;

        if stored.revision != expected_revision {
            return Err(LedgerError::Conflict(format!(
                "{} is at revision {}, expected {}",
                asset.id, stored.revision, expected_revision
            )));
        }

        *stored = asset.clone();
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Asset>> {
        let state = self.state.read();
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .cloned()
            .collect())
    }
}
