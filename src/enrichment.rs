// src/enrichment.rs
//! Advisory analysis from an external text-generation service.
//!
//! Nothing here participates in ledger invariants. The service is assumed
//! slow and unreliable: every call is bounded by a timeout and failures are
//! retried with exponential backoff before the caller falls back to a
//! placeholder.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Analysis, EnrichmentError, NewAsset, config::EnrichmentConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub name: String,
    pub location: String,
    pub value: Decimal,
}

impl AnalysisRequest {
    pub fn new(name: impl Into<String>, location: impl Into<String>, value: Decimal) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            value,
        }
    }
}

impl From<&NewAsset> for AnalysisRequest {
    fn from(asset: &NewAsset) -> Self {
        Self::new(&asset.name, &asset.location, asset.total_value)
    }
}

#[async_trait]
pub trait EnrichmentService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, EnrichmentError>;
}

#[derive(Deserialize)]
struct AnalysisPayload {
    description: String,
    risk: String,
}

/// Parse a `{"description": ..., "risk": ...}` reply.
///
/// Generative back-ends sometimes wrap JSON in a markdown code fence even
/// when told not to; the fence is stripped before parsing.
pub fn parse_analysis(text: &str) -> Result<Analysis, EnrichmentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EnrichmentError::Malformed("empty response".to_string()));
    }

    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let payload: AnalysisPayload =
        serde_json::from_str(body).map_err(|e| EnrichmentError::Malformed(e.to_string()))?;

    if payload.description.trim().is_empty() || payload.risk.trim().is_empty() {
        return Err(EnrichmentError::Malformed(
            "description and risk must both be present".to_string(),
        ));
    }

    Ok(Analysis::new(payload.description, payload.risk))
}

/// Timeout, retry and fallback rules for one analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub placeholder: Analysis,
}

impl Default for EnrichmentPolicy {
    fn default() -> Self {
        Self::from(&EnrichmentConfig::default())
    }
}

impl From<&EnrichmentConfig> for EnrichmentPolicy {
    fn from(config: &EnrichmentConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            placeholder: config.placeholder(),
        }
    }
}

impl EnrichmentPolicy {
    /// Delay before retry number `retry` (0 = first retry).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Call `service`, retrying failures and timeouts until the attempt
    /// budget runs out. A zero budget still makes one attempt.
    pub async fn run(
        &self,
        service: &dyn EnrichmentService,
        request: &AnalysisRequest,
    ) -> Result<Analysis, EnrichmentError> {
        let attempts = self.max_attempts.max(1);
        let mut last_error = EnrichmentError::Unavailable("no attempt made".to_string());

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.backoff(attempt - 1)).await;
            }

            match tokio::time::timeout(self.timeout, service.analyze(request)).await {
                Ok(Ok(analysis)) => return Ok(analysis),
                Ok(Err(err)) => {
                    warn!(attempt = attempt + 1, attempts, error = %err, "analysis attempt failed");
                    last_error = err;
                }
                Err(_) => {
                    warn!(attempt = attempt + 1, attempts, timeout = ?self.timeout, "analysis attempt timed out");
                    last_error = EnrichmentError::TimedOut(self.timeout);
                }
            }
        }

        Err(last_error)
    }
}
