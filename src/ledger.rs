// src/ledger.rs
//! The asset ledger: sole owner of the asset map and its invariants.
//!
//! Every mutation of an asset runs under that asset's lock from
//! `AssetLocks`, for its whole read-check-write:
//!
//! 1. validate parameters (no lock needed)
//! 2. acquire the per-asset lock
//! 3. read the current record from the store
//! 4. apply the change to a private copy
//! 5. write it back, guarded by the record's revision
//!
//! Reads take no asset lock. Stores hand out whole records, so a reader
//! sees an asset either before or after a transfer, never halfway.

use std::sync::Arc;

use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::{
    Asset, AssetId, LedgerError, NewAsset, Result,
    adapters::{MemoryStore, StateStore},
    config::{GenesisAsset, StoreConfig},
    locks::AssetLocks,
};

/// Owns the asset store; the store itself is never handed out, so every
/// write passes through `mint`, `transfer` or `seed`.
///
/// ```compile_fail
/// use share_ledger::AssetLedger;
///
/// let ledger = AssetLedger::in_memory();
/// let _raw = ledger.store();
/// ```
pub struct AssetLedger {
    store: Arc<dyn StateStore>,
    locks: AssetLocks,
}

impl AssetLedger {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            locks: AssetLocks::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Build the ledger over the configured store, creating its schema if
    /// needed.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::Memory => Ok(Self::in_memory()),
            #[cfg(feature = "sqlite")]
            StoreConfig::Sqlite { url } => {
                let store = crate::adapters::SqliteStore::connect(url).await?;
                store.init_schema().await?;
                Ok(Self::new(Arc::new(store)))
            }
            #[cfg(not(feature = "sqlite"))]
            StoreConfig::Sqlite { .. } => Err(LedgerError::Config(
                "sqlite store requested but the `sqlite` feature is disabled".to_string(),
            )),
        }
    }

    /// Create a new asset with every share assigned to `caller`.
    pub async fn mint(&self, new: NewAsset, caller: &str) -> Result<Asset> {
        let result = self.mint_inner(new, caller).await;

        match &result {
            Ok(asset) => {
                info!(
                    asset_id = %asset.id,
                    minter = %caller,
                    total_shares = asset.total_shares,
                    price_per_share = %asset.price_per_share,
                    "asset minted"
                );
                counter!("ledger.mint.total", "status" => "success").increment(1);
            }
            Err(err) => {
                warn!(minter = %caller, error = %err, "mint rejected");
                counter!("ledger.mint.total", "status" => "failed", "reason" => err.label())
                    .increment(1);
            }
        }

        result
    }

    async fn mint_inner(&self, new: NewAsset, caller: &str) -> Result<Asset> {
        let asset = Asset::mint(new, caller)?;
        self.insert_new(asset).await
    }

    /// Store a record built at revision 0, unless its id is taken.
    async fn insert_new(&self, asset: Asset) -> Result<Asset> {
        let _guard = self.locks.acquire(&asset.id).await;

        if self.store.contains(&asset.id).await? {
            return Err(LedgerError::DuplicateAsset(asset.id));
        }
        self.store.insert(&asset).await?;

        Ok(asset)
    }

    /// Move `amount` shares of `asset_id` from `from` to `to`.
    ///
    /// Either the whole transfer commits or nothing changes.
    pub async fn transfer(&self, asset_id: &str, from: &str, to: &str, amount: u64) -> Result<()> {
        let result = self.transfer_inner(asset_id, from, to, amount).await;

        match &result {
            Ok(()) => {
                info!(asset_id, from, to, amount, "shares transferred");
                counter!("ledger.transfer.total", "status" => "success").increment(1);
                histogram!("ledger.transfer.shares").record(amount as f64);
            }
            Err(err) => {
                warn!(asset_id, from, to, amount, error = %err, "transfer rejected");
                counter!("ledger.transfer.total", "status" => "failed", "reason" => err.label())
                    .increment(1);
            }
        }

        result
    }

    async fn transfer_inner(&self, asset_id: &str, from: &str, to: &str, amount: u64) -> Result<()> {
        if asset_id.trim().is_empty() {
            return Err(LedgerError::invalid("asset id must not be empty"));
        }
        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(LedgerError::invalid("holder ids must not be empty"));
        }
        if amount == 0 {
            return Err(LedgerError::invalid("transfer amount must be positive"));
        }
        if from == to {
            return Err(LedgerError::invalid(format!(
                "sender and recipient are both {from}"
            )));
        }

        // Lock entries exist only for minted ids.
        if !self.store.contains(asset_id).await? {
            return Err(LedgerError::AssetNotFound(asset_id.to_string()));
        }

        let _guard = self.locks.acquire(asset_id).await;

        let mut asset = self
            .store
            .get(asset_id)
            .await?
            .ok_or_else(|| LedgerError::AssetNotFound(asset_id.to_string()))?;

        let expected_revision = asset.revision;
        asset.apply_transfer(from, to, amount)?;
        self.store.update(&asset, expected_revision).await
    }

    /// Snapshot of one asset.
    pub async fn read(&self, asset_id: &str) -> Result<Asset> {
        debug!(asset_id, "reading asset");
        self.store
            .get(asset_id)
            .await?
            .ok_or_else(|| LedgerError::AssetNotFound(asset_id.to_string()))
    }

    /// Whether `asset_id` has been minted. Fails only if the store does.
    pub async fn exists(&self, asset_id: &str) -> Result<bool> {
        self.store.contains(asset_id).await
    }

    /// Snapshot of every asset, in mint order.
    ///
    /// Filtering (e.g. "assets I hold") is the caller's job; see
    /// [`Portfolio`](crate::Portfolio).
    pub async fn list_all(&self) -> Result<Vec<Asset>> {
        let assets = self.store.scan().await?;
        debug!(count = assets.len(), "listed assets");
        Ok(assets)
    }

    pub async fn balance_of(&self, asset_id: &str, holder: &str) -> Result<u64> {
        Ok(self.read(asset_id).await?.balance_of(holder))
    }

    /// Create each genesis asset with its allocations already in place.
    ///
    /// The record is built and allocated privately, then stored in a single
    /// insert, so no reader ever sees a half-seeded asset. Assets already
    /// present are left alone, so seeding on every boot is safe. Returns the
    /// ids that were created by this call.
    pub async fn seed(&self, genesis: &[GenesisAsset]) -> Result<Vec<AssetId>> {
        let mut seeded = Vec::new();

        for entry in genesis {
            entry.validate()?;

            if self.exists(&entry.id).await? {
                debug!(asset_id = %entry.id, "genesis asset already present");
                continue;
            }

            let mut asset = Asset::mint(entry.to_new_asset(), &entry.issuer)?;
            asset.allocate(&entry.allocations)?;

            match self.insert_new(asset).await {
                Ok(_) => {}
                // Raced with another seeder; theirs wins.
                Err(LedgerError::DuplicateAsset(_)) => continue,
                Err(err) => return Err(err),
            }

            info!(asset_id = %entry.id, holders = entry.allocations.len(), "genesis asset seeded");
            seeded.push(entry.id.clone());
        }

        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn scenario_a() -> NewAsset {
        NewAsset::new("a1", "Tower A", "Moscow", dec!(100000), 1000)
    }

    #[tokio::test]
    async fn test_mint_then_read_is_snapshot() {
        let ledger = AssetLedger::in_memory();
        ledger.mint(scenario_a(), "u1").await.unwrap();

        let mut copy = ledger.read("a1").await.unwrap();
        copy.owner_distribution.insert("thief".to_string(), 1_000_000);
        copy.total_shares = 1;

        let fresh = ledger.read("a1").await.unwrap();
        assert_eq!(fresh.total_shares, 1000);
        assert!(!fresh.is_held_by("thief"));
    }

    #[tokio::test]
    async fn test_transfer_validates_before_lookup() {
        let ledger = AssetLedger::in_memory();

        // Unknown asset, but the bad amount is reported first.
        let err = ledger.transfer("nope", "u1", "u2", 0).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidParameter(_)));

        let err = ledger.transfer("nope", "u1", "u1", 5).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidParameter(_)));

        let err = ledger.transfer("nope", "u1", "u2", 5).await.unwrap_err();
        assert!(matches!(err, LedgerError::AssetNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_self_transfer_rejected_even_with_balance() {
        let ledger = AssetLedger::in_memory();
        ledger.mint(scenario_a(), "u1").await.unwrap();

        let err = ledger.transfer("a1", "u1", "u1", 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidParameter(_)));
        assert_eq!(ledger.read("a1").await.unwrap().revision, 0);
    }

    #[tokio::test]
    async fn test_exists_and_balance() {
        let ledger = AssetLedger::in_memory();
        assert!(!ledger.exists("a1").await.unwrap());

        ledger.mint(scenario_a(), "u1").await.unwrap();
        assert!(ledger.exists("a1").await.unwrap());
        assert_eq!(ledger.balance_of("a1", "u1").await.unwrap(), 1000);
        assert_eq!(ledger.balance_of("a1", "u2").await.unwrap(), 0);
        assert!(ledger.balance_of("zz", "u1").await.is_err());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let ledger = AssetLedger::in_memory();
        let genesis = vec![GenesisAsset {
            id: "asset_001".to_string(),
            name: "Business Center Tower A".to_string(),
            location: "Moscow, Presnenskaya Naberezhnaya".to_string(),
            total_value: dec!(50000000),
            total_shares: 10000,
            issuer: "user_admin".to_string(),
            allocations: BTreeMap::from([
                ("user_admin".to_string(), 8000),
                ("user_investor_1".to_string(), 2000),
            ]),
            description: Some("Premium office centre.".to_string()),
            risk_analysis: Some("Low risk.".to_string()),
        }];

        let seeded = ledger.seed(&genesis).await.unwrap();
        assert_eq!(seeded, vec!["asset_001".to_string()]);

        let asset = ledger.read("asset_001").await.unwrap();
        assert_eq!(asset.price_per_share, dec!(5000));
        assert_eq!(asset.balance_of("user_admin"), 8000);
        assert_eq!(asset.balance_of("user_investor_1"), 2000);
        assert_eq!(asset.risk_analysis.as_deref(), Some("Low risk."));
        assert!(asset.is_conserved());

        assert!(ledger.seed(&genesis).await.unwrap().is_empty());
        assert_eq!(ledger.read("asset_001").await.unwrap(), asset);
    }

    #[tokio::test]
    async fn test_seed_issuer_can_end_with_nothing() {
        let ledger = AssetLedger::in_memory();
        let genesis = vec![GenesisAsset {
            id: "g".to_string(),
            name: "n".to_string(),
            location: "l".to_string(),
            total_value: dec!(10),
            total_shares: 10,
            issuer: "treasury".to_string(),
            allocations: BTreeMap::from([("u1".to_string(), 7), ("u2".to_string(), 3)]),
            description: None,
            risk_analysis: None,
        }];

        ledger.seed(&genesis).await.unwrap();
        let asset = ledger.read("g").await.unwrap();
        assert!(!asset.is_held_by("treasury"));
        assert_eq!(asset.owner_distribution.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_ids_leave_no_lock_entries() {
        let ledger = AssetLedger::in_memory();

        for n in 0..1000 {
            let err = ledger
                .transfer(&format!("ghost{n}"), "u1", "u2", 1)
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::AssetNotFound(_)));
        }
        assert!(ledger.locks.is_empty());

        ledger.mint(scenario_a(), "u1").await.unwrap();
        ledger.transfer("a1", "u1", "u2", 1).await.unwrap();
        let _ = ledger.mint(scenario_a(), "u9").await.unwrap_err();
        assert_eq!(ledger.locks.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_genesis_can_be_seeded_later() {
        let ledger = AssetLedger::in_memory();
        let mut genesis = vec![GenesisAsset {
            id: "g".to_string(),
            name: "n".to_string(),
            location: "l".to_string(),
            total_value: dec!(10),
            total_shares: 10,
            issuer: "treasury".to_string(),
            allocations: BTreeMap::from([("u1".to_string(), 7), ("   ".to_string(), 3)]),
            description: None,
            risk_analysis: None,
        }];

        let err = ledger.seed(&genesis).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidParameter(_)));
        assert!(!ledger.exists("g").await.unwrap());

        genesis[0].allocations = BTreeMap::from([("u1".to_string(), 7), ("u2".to_string(), 3)]);
        assert_eq!(ledger.seed(&genesis).await.unwrap(), vec!["g".to_string()]);

        let asset = ledger.read("g").await.unwrap();
        assert_eq!(asset.owner_distribution, genesis[0].allocations);
        assert_eq!(asset.revision, 0);
    }

    #[tokio::test]
    async fn test_seeded_asset_is_never_seen_half_allocated() {
        let ledger = Arc::new(AssetLedger::in_memory());
        let genesis = vec![GenesisAsset {
            id: "g".to_string(),
            name: "n".to_string(),
            location: "l".to_string(),
            total_value: dec!(100),
            total_shares: 100,
            issuer: "treasury".to_string(),
            allocations: (0..50).map(|i| (format!("u{i}"), 2)).collect(),
            description: None,
            risk_analysis: None,
        }];

        let reader = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                for _ in 0..200 {
                    if let Ok(asset) = ledger.read("g").await {
                        assert!(!asset.is_held_by("treasury"));
                        assert_eq!(asset.owner_distribution.len(), 50);
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        ledger.seed(&genesis).await.unwrap();
        reader.await.unwrap();
    }
}
