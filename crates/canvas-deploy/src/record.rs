//! Per-run deployment record.

use std::fmt;

use canvas_registry::Address;
use serde::{Deserialize, Serialize};

use crate::error::DeployError;
use crate::types::{BlockRef, Confirmation, ProxyDeployment, TxHash};
use crate::verifier::VerificationResult;

/// Verification lifecycle of a deployment.
///
/// ```text
/// Unverified → Submitted → Verified
///     │            └─────→ Failed
///     └──────────────────→ Verified   (already verified elsewhere)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Unverified,
    Submitted,
    Verified,
    Failed,
}

impl VerificationStatus {
    pub fn can_transition_to(self, next: VerificationStatus) -> bool {
        use VerificationStatus::*;
        matches!(
            (self, next),
            (Unverified, Submitted) | (Unverified, Verified) | (Submitted, Verified) | (Submitted, Failed)
        )
    }

    /// `Verified` and `Failed` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unverified => write!(f, "unverified"),
            Self::Submitted => write!(f, "submitted"),
            Self::Verified => write!(f, "verified"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Whether the explorer links the proxy to its implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ProxyLink {
    Unlinked,
    Linked,
    Failed { reason: String },
}

/// State of one deployment run. Not persisted anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub proxy: Address,
    pub implementation: Address,
    pub tx_hash: TxHash,
    /// Highest confirmation count observed.
    pub confirmations: u64,
    /// Inclusion block, once confirmed.
    pub block: Option<BlockRef>,
    status: VerificationStatus,
    /// Rejection reason when `status` is `Failed`.
    pub failure: Option<String>,
    pub proxy_link: ProxyLink,
}

impl DeploymentRecord {
    pub fn new(deployment: &ProxyDeployment) -> Self {
        Self {
            proxy: deployment.proxy,
            implementation: deployment.implementation,
            tx_hash: deployment.tx_hash.clone(),
            confirmations: 0,
            block: None,
            status: VerificationStatus::Unverified,
            failure: None,
            proxy_link: ProxyLink::Unlinked,
        }
    }

    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    pub fn record_confirmation(&mut self, confirmation: &Confirmation) {
        self.confirmations = self.confirmations.max(confirmation.confirmations);
        self.block = Some(confirmation.block.clone());
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: VerificationStatus) -> Result<(), DeployError> {
        if !self.status.can_transition_to(next) {
            return Err(DeployError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        tracing::debug!(from = %self.status, to = %next, proxy = %self.proxy, "verification status");
        self.status = next;
        Ok(())
    }

    /// Apply a verifier result, from either `Unverified` or `Submitted`.
    pub fn apply(&mut self, result: &VerificationResult) -> Result<(), DeployError> {
        match result {
            VerificationResult::Verified => {
                self.mark_submitted()?;
                self.transition(VerificationStatus::Verified)
            }
            VerificationResult::AlreadyVerified => self.transition(VerificationStatus::Verified),
            VerificationResult::VerificationFailed { reason } => {
                self.mark_submitted()?;
                self.transition(VerificationStatus::Failed)?;
                self.failure = Some(reason.clone());
                Ok(())
            }
        }
    }

    /// Apply the result of linking the proxy.
    pub fn apply_proxy_link(&mut self, result: &VerificationResult) {
        self.proxy_link = match result {
            VerificationResult::VerificationFailed { reason } => ProxyLink::Failed {
                reason: reason.clone(),
            },
            _ => ProxyLink::Linked,
        };
    }

    fn mark_submitted(&mut self) -> Result<(), DeployError> {
        if self.status == VerificationStatus::Submitted {
            return Ok(());
        }
        self.transition(VerificationStatus::Submitted)
    }
}
