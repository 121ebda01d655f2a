//! Idempotent source verification.

use async_trait::async_trait;
use canvas_registry::Address;
use serde::{Deserialize, Serialize};

use crate::error::{DeployError, VerifierError};
use crate::types::SourceMetadata;

/// What a verification service said about a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The source was accepted and the address is now verified.
    Accepted,
    /// Someone verified the address between our status check and submission.
    AlreadyVerified,
    /// The service compiled the source and it did not match.
    Rejected { reason: String },
}

/// A source-verification service such as an Etherscan-compatible explorer.
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Whether `address` already has verified source.
    async fn is_verified(&self, address: &Address) -> Result<bool, VerifierError>;

    /// Submit source for `address` and wait for the service's verdict.
    async fn submit(
        &self,
        address: &Address,
        source: &SourceMetadata,
    ) -> Result<SubmissionOutcome, VerifierError>;

    /// Mark `proxy` as a proxy for the verified `implementation`, so the
    /// service shows the implementation's source and ABI at the proxy address.
    async fn link_proxy(
        &self,
        proxy: &Address,
        implementation: &Address,
    ) -> Result<SubmissionOutcome, VerifierError>;
}

/// Outcome of [`Verifier::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum VerificationResult {
    /// Freshly accepted by the service.
    Verified,
    /// Already verified; nothing was submitted.
    AlreadyVerified,
    /// The service rejected the source. Not retried.
    VerificationFailed { reason: String },
}

impl VerificationResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::VerificationFailed { .. })
    }
}

/// Registers a deployed address with a verification service, at most once.
#[derive(Debug)]
pub struct Verifier<V> {
    service: V,
}

impl<V: VerificationService> Verifier<V> {
    pub fn new(service: V) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &V {
        &self.service
    }

    /// Verify `address`, skipping the submission if it is already verified.
    ///
    /// Service rejections come back as [`VerificationResult::VerificationFailed`];
    /// only communication failures are errors.
    pub async fn verify(
        &self,
        address: &Address,
        source: &SourceMetadata,
    ) -> Result<VerificationResult, DeployError> {
        if self.is_verified(address).await? {
            return Ok(VerificationResult::AlreadyVerified);
        }
        self.submit(address, source).await
    }

    /// The status check half of [`verify`](Self::verify).
    pub async fn is_verified(&self, address: &Address) -> Result<bool, DeployError> {
        let verified = self.service.is_verified(address).await?;
        if verified {
            tracing::info!(%address, "already verified, skipping submission");
        }
        Ok(verified)
    }

    /// The submission half of [`verify`](Self::verify). Does not check status first.
    pub async fn submit(
        &self,
        address: &Address,
        source: &SourceMetadata,
    ) -> Result<VerificationResult, DeployError> {
        tracing::info!(%address, contract = %source.contract_name, "submitting source for verification");
        let outcome = self.service.submit(address, source).await?;
        Ok(Self::settle(address, outcome))
    }

    /// Link `proxy` to its implementation at the service.
    pub async fn link_proxy(
        &self,
        proxy: &Address,
        implementation: &Address,
    ) -> Result<VerificationResult, DeployError> {
        tracing::info!(%proxy, %implementation, "linking proxy");
        let outcome = self.service.link_proxy(proxy, implementation).await?;
        Ok(Self::settle(proxy, outcome))
    }

    fn settle(address: &Address, outcome: SubmissionOutcome) -> VerificationResult {
        let result = match outcome {
            SubmissionOutcome::Accepted => VerificationResult::Verified,
            SubmissionOutcome::AlreadyVerified => VerificationResult::AlreadyVerified,
            SubmissionOutcome::Rejected { reason } => {
                tracing::error!(%address, %reason, "verification rejected");
                VerificationResult::VerificationFailed { reason }
            }
        };
        if result.is_success() {
            tracing::info!(%address, ?result, "verification complete");
        }
        result
    }
}
