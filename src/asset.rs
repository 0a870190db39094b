// src/asset.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AssetId, HolderId, LedgerError, Result};

/// Advisory text attached to an asset by the analysis collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub description: String,
    pub risk: String,
}

impl Analysis {
    pub fn new(description: impl Into<String>, risk: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            risk: risk.into(),
        }
    }
}

/// Parameters of a mint. The minter is supplied separately by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    pub id: AssetId,
    pub name: String,
    pub location: String,
    pub total_value: Decimal,
    pub total_shares: u64,
    #[serde(default)]
    pub analysis: Option<Analysis>,
}

impl NewAsset {
    pub fn new(
        id: impl Into<AssetId>,
        name: impl Into<String>,
        location: impl Into<String>,
        total_value: Decimal,
        total_shares: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            total_value,
            total_shares,
            analysis: None,
        }
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = Some(analysis);
        self
    }
}

/// A tokenized property and its owner registry.
///
/// Invariants, held after every committed operation:
/// - the values of `owner_distribution` sum to `total_shares`
/// - no entry in `owner_distribution` is zero (emptied holders are removed)
/// - `price_per_share == total_value / total_shares`, fixed at mint
///
/// Values handed out by the ledger are snapshots; mutating one never
/// reaches ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub location: String,
    pub total_value: Decimal,
    pub total_shares: u64,
    pub price_per_share: Decimal,
    pub owner_distribution: BTreeMap<HolderId, u64>,
    pub description: Option<String>,
    pub risk_analysis: Option<String>,
    pub minted_by: HolderId,
    pub minted_at: DateTime<Utc>,
    /// Bumped by every committed transfer; stores compare it before writing.
    pub revision: u64,
}

impl Asset {
    /// Build the initial record of a mint: every share goes to `minter`.
    pub(crate) fn mint(new: NewAsset, minter: &str) -> Result<Self> {
        if new.id.trim().is_empty() {
            return Err(LedgerError::invalid("asset id must not be empty"));
        }
        if minter.trim().is_empty() {
            return Err(LedgerError::invalid("minter id must not be empty"));
        }
        if new.total_value <= Decimal::ZERO {
            return Err(LedgerError::invalid(format!(
                "total value must be positive, got {}",
                new.total_value
            )));
        }
        if new.total_shares == 0 {
            return Err(LedgerError::invalid("total shares must be positive"));
        }

        let price_per_share = new
            .total_value
            .checked_div(Decimal::from(new.total_shares))
            .ok_or_else(|| LedgerError::invalid("price per share is not representable"))?;

        let mut owner_distribution = BTreeMap::new();
        owner_distribution.insert(minter.to_string(), new.total_shares);

        let (description, risk_analysis) = match new.analysis {
            Some(analysis) => (Some(analysis.description), Some(analysis.risk)),
            None => (None, None),
        };

        Ok(Self {
            id: new.id,
            name: new.name,
            location: new.location,
            total_value: new.total_value,
            total_shares: new.total_shares,
            price_per_share,
            owner_distribution,
            description,
            risk_analysis,
            minted_by: minter.to_string(),
            minted_at: Utc::now(),
            revision: 0,
        })
    }

    /// Shares held by `holder`; absent holders hold zero.
    pub fn balance_of(&self, holder: &str) -> u64 {
        self.owner_distribution.get(holder).copied().unwrap_or(0)
    }

    pub fn is_held_by(&self, holder: &str) -> bool {
        self.owner_distribution.contains_key(holder)
    }

    pub fn holders(&self) -> impl Iterator<Item = (&str, u64)> {
        self.owner_distribution
            .iter()
            .map(|(holder, shares)| (holder.as_str(), *shares))
    }

    /// Sum of every registry entry. Equals `total_shares` on a valid record.
    pub fn circulating_shares(&self) -> u128 {
        self.owner_distribution
            .values()
            .map(|shares| u128::from(*shares))
            .sum()
    }

    pub fn is_conserved(&self) -> bool {
        self.circulating_shares() == u128::from(self.total_shares)
            && self.owner_distribution.values().all(|shares| *shares > 0)
    }

    /// Fraction of the asset owned by `holder`, in `[0, 1]`.
    pub fn ownership_ratio(&self, holder: &str) -> Decimal {
        Decimal::from(self.balance_of(holder)) / Decimal::from(self.total_shares)
    }

    /// Market value of `holder`'s position at the mint price.
    pub fn holding_value(&self, holder: &str) -> Decimal {
        self.price_per_share * Decimal::from(self.balance_of(holder))
    }

    pub fn analysis(&self) -> Option<Analysis> {
        match (&self.description, &self.risk_analysis) {
            (Some(description), Some(risk)) => Some(Analysis::new(description, risk)),
            _ => None,
        }
    }

    /// Move `amount` shares from `from` to `to` on this record.
    ///
    /// Every check runs before the first write, so a rejected transfer leaves
    /// the record untouched. The ledger applies this to a private copy and
    /// only persists it on success.
    pub(crate) fn apply_transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(LedgerError::invalid("transfer amount must be positive"));
        }
        if from == to {
            return Err(LedgerError::invalid(format!(
                "sender and recipient are both {from}"
            )));
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset_id: self.id.clone(),
                holder: from.to_string(),
                available,
                requested: amount,
            });
        }

        let credited = self.balance_of(to).checked_add(amount).ok_or_else(|| {
            LedgerError::InvariantViolation(format!("balance of {to} overflows on {}", self.id))
        })?;

        let remaining = available - amount;
        if remaining == 0 {
            self.owner_distribution.remove(from);
        } else {
            self.owner_distribution.insert(from.to_string(), remaining);
        }
        self.owner_distribution.insert(to.to_string(), credited);
        self.revision += 1;

        if !self.is_conserved() {
            return Err(LedgerError::InvariantViolation(format!(
                "{} circulates {} of {} shares",
                self.id,
                self.circulating_shares(),
                self.total_shares
            )));
        }

        Ok(())
    }

    /// Replace the initial registry of a freshly minted record with
    /// `allocations`. Used by genesis seeding before the first write, so the
    /// record is stored once with its final holders.
    pub(crate) fn allocate(&mut self, allocations: &BTreeMap<HolderId, u64>) -> Result<()> {
        if self.revision != 0 {
            return Err(LedgerError::InvariantViolation(format!(
                "{} is already at revision {}",
                self.id, self.revision
            )));
        }
        if allocations.keys().any(|holder| holder.trim().is_empty()) {
            return Err(LedgerError::invalid(format!(
                "allocations of {} name an empty holder",
                self.id
            )));
        }

        let previous = std::mem::replace(&mut self.owner_distribution, allocations.clone());
        if !self.is_conserved() {
            let circulating = self.circulating_shares();
            self.owner_distribution = previous;
            return Err(LedgerError::invalid(format!(
                "allocations of {} circulate {} of {} shares",
                self.id, circulating, self.total_shares
            )));
        }

        Ok(())
    }
}
