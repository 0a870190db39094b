// src/facade.rs
//! Boundary called by presentation layers (UI, CLI, HTTP handlers).
//!
//! The facade resolves who is acting, validates request shape, and turns
//! ledger failures into a flat `FacadeError { kind, message }` suitable for
//! showing to a user. It never holds ledger state of its own: after a
//! successful mutation, callers re-fetch through [`LedgerFacade::refresh`].

use std::sync::Arc;

use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    Analysis, Asset, AssetId, AssetLedger, EnrichmentError, HolderId, LedgerError, NewAsset,
    Portfolio,
    config::LedgerConfig,
    enrichment::{AnalysisRequest, EnrichmentPolicy, EnrichmentService},
    identity::{IdentityResolver, StaticIdentity},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidParameter,
    DuplicateAsset,
    AssetNotFound,
    InsufficientBalance { available: u64, requested: u64 },
    EnrichmentUnavailable,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct FacadeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FacadeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, message)
    }
}

impl From<LedgerError> for FacadeError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidParameter(msg) => Self::invalid(msg),
            LedgerError::DuplicateAsset(id) => Self::new(
                ErrorKind::DuplicateAsset,
                format!("An asset with id {id} already exists"),
            ),
            LedgerError::AssetNotFound(id) => {
                Self::new(ErrorKind::AssetNotFound, format!("Asset {id} not found"))
            }
            LedgerError::InsufficientBalance {
                available,
                requested,
                ..
            } => Self::new(
                ErrorKind::InsufficientBalance {
                    available,
                    requested,
                },
                format!("Not enough shares: you hold {available}, requested {requested}"),
            ),
            other => Self::new(ErrorKind::Internal, other.to_string()),
        }
    }
}

impl From<EnrichmentError> for FacadeError {
    fn from(err: EnrichmentError) -> Self {
        Self::new(ErrorKind::EnrichmentUnavailable, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub asset_id: AssetId,
    pub recipient_id: HolderId,
    pub amount: u64,
}

impl TransferRequest {
    pub fn new(asset_id: impl Into<AssetId>, recipient_id: impl Into<HolderId>, amount: u64) -> Self {
        Self {
            asset_id: asset_id.into(),
            recipient_id: recipient_id.into(),
            amount,
        }
    }
}

/// What a view needs after any mutation: the full listing plus the acting
/// holder's positions.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerView {
    pub assets: Vec<Asset>,
    pub portfolio: Portfolio,
}

#[derive(Clone)]
pub struct LedgerFacade {
    ledger: Arc<AssetLedger>,
    identity: Arc<dyn IdentityResolver>,
    enrichment: Option<Arc<dyn EnrichmentService>>,
    policy: EnrichmentPolicy,
}

impl LedgerFacade {
    pub fn new(ledger: Arc<AssetLedger>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            ledger,
            identity,
            enrichment: None,
            policy: EnrichmentPolicy::default(),
        }
    }

    pub fn from_config(ledger: Arc<AssetLedger>, config: &LedgerConfig) -> Self {
        let mut facade = Self::new(
            ledger,
            Arc::new(StaticIdentity::from_config(&config.identity)),
        );
        facade.policy = EnrichmentPolicy::from(&config.enrichment);
        facade
    }

    pub fn with_enrichment(
        mut self,
        service: Arc<dyn EnrichmentService>,
        policy: EnrichmentPolicy,
    ) -> Self {
        self.enrichment = Some(service);
        self.policy = policy;
        self
    }

    /// Same ledger and enrichment, different principal.
    pub fn acting_as(&self, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            identity,
            ..self.clone()
        }
    }

    pub fn ledger(&self) -> &AssetLedger {
        &self.ledger
    }

    pub fn current_identity(&self) -> HolderId {
        self.identity.current()
    }

    /// Mint `request` as the current identity.
    pub async fn tokenize(&self, request: NewAsset) -> Result<Asset, FacadeError> {
        validate_shape(&request)?;
        let caller = self.current_identity();
        Ok(self.ledger.mint(request, &caller).await?)
    }

    /// Mint `request`, first fetching an analysis if none was supplied.
    ///
    /// Analysis runs before the ledger is touched. If it fails for any
    /// reason the placeholder is attached instead and minting proceeds.
    pub async fn tokenize_enriched(&self, mut request: NewAsset) -> Result<Asset, FacadeError> {
        validate_shape(&request)?;

        if request.analysis.is_none() {
            let analysis = match self.analyze(&AnalysisRequest::from(&request)).await {
                Ok(analysis) => analysis,
                Err(err) => {
                    warn!(asset_id = %request.id, error = %err, "using placeholder analysis");
                    counter!("ledger.enrichment.fallback.total").increment(1);
                    self.policy.placeholder.clone()
                }
            };
            request.analysis = Some(analysis);
        }

        self.tokenize(request).await
    }

    /// Ask the enrichment collaborator for an analysis, within the policy's
    /// timeout and retry budget. Every failure is `EnrichmentUnavailable`.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, FacadeError> {
        let result = match &self.enrichment {
            Some(service) => self.policy.run(service.as_ref(), request).await,
            None => Err(EnrichmentError::Unavailable(
                "no enrichment service configured".to_string(),
            )),
        };
        Ok(result?)
    }

    /// Send shares from the current identity to `request.recipient_id`.
    pub async fn transfer(&self, request: TransferRequest) -> Result<(), FacadeError> {
        if request.recipient_id.trim().is_empty() {
            return Err(FacadeError::invalid("recipient id must not be empty"));
        }
        if request.amount == 0 {
            return Err(FacadeError::invalid("amount must be positive"));
        }

        let sender = self.current_identity();
        self.ledger
            .transfer(&request.asset_id, &sender, &request.recipient_id, request.amount)
            .await?;

        info!(asset_id = %request.asset_id, sender = %sender, recipient = %request.recipient_id, "transfer accepted");
        Ok(())
    }

    pub async fn read_asset(&self, asset_id: &str) -> Result<Asset, FacadeError> {
        Ok(self.ledger.read(asset_id).await?)
    }

    pub async fn list_assets(&self) -> Result<Vec<Asset>, FacadeError> {
        Ok(self.ledger.list_all().await?)
    }

    /// The current identity's positions.
    pub async fn portfolio(&self) -> Result<Portfolio, FacadeError> {
        let assets = self.ledger.list_all().await?;
        Ok(Portfolio::for_holder(self.current_identity(), assets))
    }

    /// Reload everything a view shows, from one listing.
    pub async fn refresh(&self) -> Result<LedgerView, FacadeError> {
        let assets = self.ledger.list_all().await?;
        let portfolio = Portfolio::for_holder(self.current_identity(), assets.iter().cloned());
        Ok(LedgerView { assets, portfolio })
    }
}

fn validate_shape(request: &NewAsset) -> Result<(), FacadeError> {
    if request.id.trim().is_empty() {
        return Err(FacadeError::invalid("asset id must not be empty"));
    }
    if request.name.trim().is_empty() {
        return Err(FacadeError::invalid("name must not be empty"));
    }
    if request.location.trim().is_empty() {
        return Err(FacadeError::invalid("location must not be empty"));
    }
    if request.total_value <= Decimal::ZERO {
        return Err(FacadeError::invalid("total value must be positive"));
    }
    if request.total_shares == 0 {
        return Err(FacadeError::invalid("total shares must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn facade() -> LedgerFacade {
        LedgerFacade::new(
            Arc::new(AssetLedger::in_memory()),
            Arc::new(StaticIdentity::new("user_admin")),
        )
    }

    #[tokio::test]
    async fn test_tokenize_rejects_blank_fields() {
        let facade = facade();

        let err = facade
            .tokenize(NewAsset::new("a1", "   ", "Sochi", dec!(10), 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParameter);

        let err = facade
            .tokenize(NewAsset::new("a1", "Villa", "", dec!(10), 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParameter);

        assert!(facade.list_assets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tokenize_mints_to_current_identity() {
        let facade = facade();
        let asset = facade
            .tokenize(NewAsset::new("a1", "Villa", "Sochi", dec!(2000000), 2000))
            .await
            .unwrap();
        assert_eq!(asset.balance_of("user_admin"), 2000);
        assert_eq!(asset.minted_by, "user_admin");
    }

    #[test]
    fn test_error_mapping() {
        let err = FacadeError::from(LedgerError::InsufficientBalance {
            asset_id: "a1".to_string(),
            holder: "u1".to_string(),
            available: 0,
            requested: 1,
        });
        assert_eq!(
            err.kind,
            ErrorKind::InsufficientBalance {
                available: 0,
                requested: 1
            }
        );
        assert!(err.message.contains("you hold 0"));

        let err = FacadeError::from(LedgerError::Storage("disk".to_string()));
        assert_eq!(err.kind, ErrorKind::Internal);

        let err = FacadeError::from(EnrichmentError::TimedOut(std::time::Duration::from_secs(1)));
        assert_eq!(err.kind, ErrorKind::EnrichmentUnavailable);
    }

    #[tokio::test]
    async fn test_analyze_without_service_is_unavailable() {
        let err = facade()
            .analyze(&AnalysisRequest::new("n", "l", dec!(1)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::EnrichmentUnavailable);
        assert!(err.message.contains("no enrichment service configured"));
    }
}
