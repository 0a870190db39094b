//! # share-ledger
//!
//! An ownership ledger for tokenized real-world assets. Each asset is split
//! into a fixed number of fungible shares at mint time; after that, shares
//! only ever move between holders.
//!
//! ## Invariants
//!
//! - **Conservation**: the registry of every asset sums to its `total_shares`
//!   after every completed operation.
//! - **No empty entries**: a holder whose balance reaches zero is removed
//!   from the registry, never stored as zero.
//! - **Per-asset serialization**: mints and transfers on one asset never
//!   interleave; operations on different assets never wait on each other.
//!
//! ```rust,ignore
//! let ledger = Arc::new(AssetLedger::in_memory());
//! ledger.mint(NewAsset::new("a1", "Tower A", "Moscow", dec!(100000), 1000), "u1").await?;
//! ledger.transfer("a1", "u1", "u2", 400).await?;
//! assert_eq!(ledger.read("a1").await?.balance_of("u2"), 400);
//! ```
//!
//! ## Layers
//!
//! - [`AssetLedger`]: owns the asset map and enforces every rule above.
//! - [`LedgerFacade`]: resolves the acting identity, validates requests,
//!   attaches best-effort analysis, and flattens errors for presentation.
//! - [`AssetContract`](chaincode::AssetContract): the same operations behind
//!   a name-and-string-arguments calling convention.
//!
//! ## Feature flags
//!
//! | Flag     | Default | Description                          |
//! |----------|---------|--------------------------------------|
//! | `sqlite` | ✓       | SQLite state store via sqlx          |

pub mod adapters;
pub mod asset;
pub mod chaincode;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod facade;
pub mod holding;
pub mod identity;
pub mod ledger;
pub mod locks;

pub use adapters::{MemoryStore, StateStore};
pub use asset::{Analysis, Asset, NewAsset};
pub use config::{GenesisAsset, LedgerConfig, StoreConfig};
pub use enrichment::{AnalysisRequest, EnrichmentPolicy, EnrichmentService};
pub use error::{EnrichmentError, LedgerError, Result};
pub use facade::{ErrorKind, FacadeError, LedgerFacade, LedgerView, TransferRequest};
pub use holding::{Holding, Portfolio};
pub use identity::{IdentityResolver, StaticIdentity};
pub use ledger::AssetLedger;

#[cfg(feature = "sqlite")]
pub use adapters::SqliteStore;

/// Unique, immutable identifier of an asset, chosen by the minter.
pub type AssetId = String;

/// Identifier of a share holder.
pub type HolderId = String;
