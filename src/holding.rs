// src/holding.rs
use rust_decimal::Decimal;

use crate::{Asset, HolderId};

/// One holder's position in one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub asset: Asset,
    pub shares: u64,
}

impl Holding {
    pub fn new(asset: Asset, shares: u64) -> Self {
        Self { asset, shares }
    }

    /// Position value at the asset's price per share.
    pub fn value(&self) -> Decimal {
        self.asset.price_per_share * Decimal::from(self.shares)
    }

    /// Fraction of the asset this position represents.
    pub fn ownership_ratio(&self) -> Decimal {
        Decimal::from(self.shares) / Decimal::from(self.asset.total_shares)
    }
}

/// Everything a single holder owns across the ledger.
///
/// Built from the output of `AssetLedger::list_all`; the ledger itself does
/// no per-holder filtering.
/// ```ignore
/// let portfolio = Portfolio::for_holder("user_admin", ledger.list_all().await?);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    holder: HolderId,
    holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn for_holder(holder: impl Into<HolderId>, assets: impl IntoIterator<Item = Asset>) -> Self {
        let holder = holder.into();
        let holdings = assets
            .into_iter()
            .filter_map(|asset| {
                let shares = asset.balance_of(&holder);
                (shares > 0).then(|| Holding::new(asset, shares))
            })
            .collect();

        Self { holder, holdings }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Find a holding by asset id.
    pub fn get(&self, asset_id: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.asset.id == asset_id)
    }

    /// Total value of every position.
    pub fn total_value(&self) -> Decimal {
        self.holdings.iter().map(Holding::value).sum()
    }

    pub fn total_shares(&self) -> u64 {
        self.holdings.iter().map(|h| h.shares).sum()
    }

    /// Sort holdings by value, largest first.
    pub fn sort_by_value_desc(&mut self) {
        self.holdings.sort_by(|a, b| b.value().cmp(&a.value()));
    }

    /// Sort holdings by share count, largest first.
    pub fn sort_by_largest(&mut self) {
        self.holdings.sort_by(|a, b| b.shares.cmp(&a.shares));
    }
}

impl IntoIterator for Portfolio {
    type Item = Holding;
    type IntoIter = std::vec::IntoIter<Holding>;

    fn into_iter(self) -> Self::IntoIter {
        self.holdings.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewAsset;
    use rust_decimal_macros::dec;

    fn assets() -> Vec<Asset> {
        let mut tower = Asset::mint(
            NewAsset::new("asset_001", "Tower", "Moscow", dec!(50000000), 10000),
            "user_admin",
        )
        .unwrap();
        tower
            .apply_transfer("user_admin", "user_investor_1", 2000)
            .unwrap();

        let villa = Asset::mint(
            NewAsset::new("asset_002", "Villa", "Sochi", dec!(2000000), 2000),
            "user_admin",
        )
        .unwrap();

        vec![tower, villa]
    }

    #[test]
    fn test_portfolio_filters_by_holder() {
        let admin = Portfolio::for_holder("user_admin", assets());
        assert_eq!(admin.len(), 2);
        assert_eq!(admin.total_value(), dec!(42000000));
        assert_eq!(admin.total_shares(), 10000);

        let investor = Portfolio::for_holder("user_investor_1", assets());
        assert_eq!(investor.len(), 1);
        let holding = investor.get("asset_001").unwrap();
        assert_eq!(holding.value(), dec!(10000000));
        assert_eq!(holding.ownership_ratio(), dec!(0.2));
        assert!(investor.get("asset_002").is_none());

        assert!(Portfolio::for_holder("stranger", assets()).is_empty());
    }

    #[test]
    fn test_sorting() {
        let mut admin = Portfolio::for_holder("user_admin", assets());
        admin.sort_by_value_desc();
        assert_eq!(admin.holdings()[0].asset.id, "asset_001");

        admin.sort_by_largest();
        assert_eq!(admin.holdings()[0].shares, 8000);

        let ids: Vec<_> = admin.into_iter().map(|h| h.asset.id).collect();
        assert_eq!(ids, vec!["asset_001", "asset_002"]);
    }
}
