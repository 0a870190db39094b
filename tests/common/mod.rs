// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use share_ledger::{Asset, AssetLedger, NewAsset, SqliteStore};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn sqlite_ledger() -> AssetLedger {
    let store = SqliteStore::new_memory().await.unwrap();
    store.init_schema().await.unwrap();
    AssetLedger::new(Arc::new(store))
}

/// One ledger per store back-end, labelled for assertion messages.
pub async fn ledgers() -> Vec<(&'static str, Arc<AssetLedger>)> {
    init_tracing();
    vec![
        ("memory", Arc::new(AssetLedger::in_memory())),
        ("sqlite", Arc::new(sqlite_ledger().await)),
    ]
}

pub fn new_asset(id: &str, value: u64, shares: u64) -> NewAsset {
    NewAsset::new(
        id,
        format!("Property {id}"),
        "Somewhere",
        Decimal::from(value),
        shares,
    )
}

/// Both ownership invariants, with a readable failure.
pub fn assert_invariants(asset: &Asset) {
    let sum: u128 = asset.owner_distribution.values().map(|s| u128::from(*s)).sum();
    assert_eq!(
        sum,
        u128::from(asset.total_shares),
        "conservation broken on {}: {:?}",
        asset.id,
        asset.owner_distribution
    );
    assert!(
        asset.owner_distribution.values().all(|s| *s > 0),
        "zero entry stored on {}: {:?}",
        asset.id,
        asset.owner_distribution
    );
}
