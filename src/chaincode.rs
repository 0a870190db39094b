// src/chaincode.rs
//! Contract-style adapter over [`AssetLedger`].
//!
//! Transaction hosts in the Fabric mould call a contract by function name
//! with positional string arguments and take back a serialized payload. This
//! module maps that calling convention onto the ledger's typed operations;
//! it adds no rules of its own.

use std::{str::FromStr, sync::Arc};

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use crate::{Asset, AssetId, AssetLedger, HolderId, LedgerError, NewAsset, config::GenesisAsset};

/// Per-invocation context supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    /// Identity of the submitting client, as certified by the host
    pub client_id: HolderId,
}

impl TxContext {
    pub fn new(client_id: impl Into<HolderId>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChaincodeError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
}

pub struct AssetContract {
    ledger: Arc<AssetLedger>,
    genesis: Vec<GenesisAsset>,
}

impl AssetContract {
    pub fn new(ledger: Arc<AssetLedger>) -> Self {
        Self {
            ledger,
            genesis: Vec::new(),
        }
    }

    /// Assets created by `InitLedger`.
    pub fn with_genesis(mut self, genesis: Vec<GenesisAsset>) -> Self {
        self.genesis = genesis;
        self
    }

    /// Dispatch a named transaction.
    pub async fn invoke(
        &self,
        ctx: &TxContext,
        function: &str,
        args: &[&str],
    ) -> Result<Value, ChaincodeError> {
        match function {
            "InitLedger" => {
                expect_args(function, args, 0)?;
                Ok(serde_json::to_value(self.init_ledger().await?)?)
            }
            "TokenizeProperty" => {
                expect_args(function, args, 5)?;
                let total_value: Decimal = parse_arg(function, "totalValue", args[3])?;
                let total_shares: u64 = parse_arg(function, "totalShares", args[4])?;
                let asset = self
                    .tokenize_property(ctx, args[0], args[1], args[2], total_value, total_shares)
                    .await?;
                Ok(serde_json::to_value(asset)?)
            }
            "TransferShare" => {
                expect_args(function, args, 3)?;
                let shares: u64 = parse_arg(function, "sharesToTransfer", args[2])?;
                self.transfer_share(ctx, args[0], args[1], shares).await?;
                Ok(Value::Null)
            }
            "ReadAsset" => {
                expect_args(function, args, 1)?;
                Ok(serde_json::to_value(self.read_asset(args[0]).await?)?)
            }
            "AssetExists" => {
                expect_args(function, args, 1)?;
                Ok(Value::Bool(self.asset_exists(args[0]).await?))
            }
            "GetAllAssets" => {
                expect_args(function, args, 0)?;
                Ok(serde_json::to_value(self.get_all_assets().await?)?)
            }
            other => Err(ChaincodeError::UnknownFunction(other.to_string())),
        }
    }

    pub async fn init_ledger(&self) -> Result<Vec<AssetId>, LedgerError> {
        self.ledger.seed(&self.genesis).await
    }

    /// Mint with the submitting client as the sole initial holder.
    pub async fn tokenize_property(
        &self,
        ctx: &TxContext,
        id: &str,
        name: &str,
        location: &str,
        total_value: Decimal,
        total_shares: u64,
    ) -> Result<Asset, LedgerError> {
        let new = NewAsset::new(id, name, location, total_value, total_shares);
        self.ledger.mint(new, &ctx.client_id).await
    }

    /// Send shares from the submitting client.
    pub async fn transfer_share(
        &self,
        ctx: &TxContext,
        asset_id: &str,
        recipient_id: &str,
        shares: u64,
    ) -> Result<(), LedgerError> {
        self.ledger
            .transfer(asset_id, &ctx.client_id, recipient_id, shares)
            .await
    }

    pub async fn read_asset(&self, id: &str) -> Result<Asset, LedgerError> {
        self.ledger.read(id).await
    }

    pub async fn asset_exists(&self, id: &str) -> Result<bool, LedgerError> {
        self.ledger.exists(id).await
    }

    pub async fn get_all_assets(&self) -> Result<Vec<Asset>, LedgerError> {
        self.ledger.list_all().await
    }
}

fn expect_args(function: &str, args: &[&str], expected: usize) -> Result<(), LedgerError> {
    if args.len() != expected {
        return Err(LedgerError::InvalidParameter(format!(
            "{function} takes {expected} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}

fn parse_arg<T: FromStr>(function: &str, name: &str, raw: &str) -> Result<T, LedgerError> {
    raw.trim().parse().map_err(|_| {
        LedgerError::InvalidParameter(format!("{function}: {name} is not a valid number: {raw}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract() -> AssetContract {
        AssetContract::new(Arc::new(AssetLedger::in_memory()))
    }

    #[tokio::test]
    async fn test_tokenize_and_transfer_by_name() {
        let contract = contract();
        let issuer = TxContext::new("x509::issuer");

        let minted = contract
            .invoke(
                &issuer,
                "TokenizeProperty",
                &["a1", "Tower", "Moscow", "100000", "1000"],
            )
            .await
            .unwrap();
        assert_eq!(minted["owner_distribution"]["x509::issuer"], 1000);

        let out = contract
            .invoke(&issuer, "TransferShare", &["a1", "x509::buyer", "250"])
            .await
            .unwrap();
        assert!(out.is_null());

        let asset = contract.read_asset("a1").await.unwrap();
        assert_eq!(asset.balance_of("x509::buyer"), 250);
        assert_eq!(asset.price_per_share, dec!(100));

        let exists = contract
            .invoke(&issuer, "AssetExists", &["a1"])
            .await
            .unwrap();
        assert_eq!(exists, Value::Bool(true));

        let all = contract
            .invoke(&issuer, "GetAllAssets", &[])
            .await
            .unwrap();
        assert_eq!(all.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_bad_calls() {
        let contract = contract();
        let ctx = TxContext::new("u1");

        let err = contract.invoke(&ctx, "DeleteAsset", &["a1"]).await.unwrap_err();
        assert!(matches!(err, ChaincodeError::UnknownFunction(_)));

        let err = contract.invoke(&ctx, "ReadAsset", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Ledger(LedgerError::InvalidParameter(_))
        ));

        let err = contract
            .invoke(&ctx, "TokenizeProperty", &["a1", "n", "l", "lots", "10"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Ledger(LedgerError::InvalidParameter(_))
        ));

        let err = contract.invoke(&ctx, "ReadAsset", &["a1"]).await.unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Ledger(LedgerError::AssetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_transfer_uses_submitter_identity() {
        let contract = contract();
        let owner = TxContext::new("owner");
        let other = TxContext::new("other");

        contract
            .tokenize_property(&owner, "a1", "n", "l", dec!(10), 10)
            .await
            .unwrap();

        let err = contract
            .invoke(&other, "TransferShare", &["a1", "other2", "1"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Ledger(LedgerError::InsufficientBalance { available: 0, .. })
        ));
    }
}
