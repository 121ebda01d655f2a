//! Error types for the deployment pipeline.

use canvas_registry::Address;
use canvas_rpc::TransportError;
use thiserror::Error;

use crate::record::VerificationStatus;
use crate::types::{BlockRef, TxHash};

/// Errors raised by a [`ProxyFactory`](crate::ProxyFactory) while submitting.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid artifact: {0}")]
    Artifact(String),

    #[error("{0}")]
    Rejected(String),

    /// The request failed in transit. The node may still have accepted the
    /// transaction, so check the sender nonce before submitting again.
    #[error("submission of nonce {nonce} unacknowledged: {source}")]
    Unacknowledged {
        nonce: u64,
        #[source]
        source: TransportError,
    },
}

impl FactoryError {
    /// Returns `true` if the transaction may be in the mempool despite the error.
    pub fn may_have_been_sent(&self) -> bool {
        matches!(self, Self::Unacknowledged { .. })
    }
}

/// Errors raised while talking to a [`VerificationService`](crate::VerificationService).
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with an error payload.
    #[error("explorer API error: {0}")]
    Api(String),
}

/// Errors that end a deployment stage.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The network or factory rejected the deployment. Never retried automatically.
    #[error("deployment submission failed: {0}")]
    Submission(#[from] FactoryError),

    /// The transaction was mined but execution failed.
    #[error("transaction {tx} reverted in block {}", .block.number)]
    Reverted { tx: TxHash, block: BlockRef },

    /// The transaction left the chain's history before reaching the required depth.
    #[error("transaction {tx} was dropped or replaced before reaching {required} confirmations")]
    TransactionLost { tx: TxHash, required: u64 },

    /// The maximum wait elapsed. The transaction may still confirm later.
    #[error("timed out after {waited_ms}ms waiting for {required} confirmations of {tx} (observed {observed})")]
    ConfirmationTimeout {
        tx: TxHash,
        required: u64,
        observed: u64,
        waited_ms: u64,
    },

    /// The local wait was cancelled. The submitted transaction is unaffected.
    #[error("wait for {tx} was cancelled")]
    WaitCancelled { tx: TxHash },

    /// The verification service rejected the submitted source.
    #[error("verification of {address} failed: {reason}")]
    VerificationFailed { address: Address, reason: String },

    /// The verification service could not be reached or answered garbage.
    #[error("verification service error: {0}")]
    VerificationService(#[from] VerifierError),

    #[error("invalid verification status transition {from} -> {to}")]
    InvalidTransition {
        from: VerificationStatus,
        to: VerificationStatus,
    },
}

impl DeployError {
    /// Returns `true` if the caller must decide whether to submit a new deployment.
    pub fn needs_resubmission(&self) -> bool {
        match self {
            Self::Submission(e) => !e.may_have_been_sent(),
            Self::TransactionLost { .. } | Self::Reverted { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the submitted transaction may still confirm and can be re-polled.
    pub fn may_still_confirm(&self) -> bool {
        matches!(self, Self::ConfirmationTimeout { .. } | Self::WaitCancelled { .. })
    }
}
