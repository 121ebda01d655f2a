//! Confirmation waiting.
//!
//! Polls a [`ChainState`] until a transaction is buried under the required
//! number of blocks. The wait ends in exactly one of four ways:
//!
//! | Outcome                           | Meaning                                         |
//! |-----------------------------------|-------------------------------------------------|
//! | `Ok(Confirmation)`                | depth reached                                   |
//! | `DeployError::TransactionLost`    | dropped/replaced; caller decides on resubmitting |
//! | `DeployError::ConfirmationTimeout`| gave up waiting; the tx may still confirm       |
//! | `DeployError::WaitCancelled`      | caller cancelled; the tx is untouched           |
//!
//! Transport errors while polling are transient and only logged.

use std::time::Duration;

use async_trait::async_trait;
use canvas_rpc::TransportError;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::DeployError;
use crate::types::{BlockRef, Confirmation, TxHash, TxStatus};

/// Read access to chain state needed for confirmation polling.
#[async_trait]
pub trait ChainState: Send + Sync {
    /// Where the transaction currently stands.
    async fn transaction_status(&self, tx: &TxHash) -> Result<TxStatus, TransportError>;

    /// Current head block number.
    async fn block_number(&self) -> Result<u64, TransportError>;
}

/// Configuration for [`ConfirmationWaiter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaiterConfig {
    /// Delay between polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum total wait, in milliseconds.
    pub timeout_ms: u64,
    /// Consecutive polls in which the node does not know the transaction
    /// before it is declared lost. Load-balanced endpoints may briefly lag.
    pub lost_after_missing_polls: u32,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            timeout_ms: 600_000,
            lost_after_missing_polls: 3,
        }
    }
}

enum Observation {
    Pending,
    Unknown,
    Reverted(BlockRef),
    Included { block: BlockRef, depth: u64 },
}

/// Blocks the calling task until a transaction reaches a confirmation depth.
#[derive(Debug)]
pub struct ConfirmationWaiter<C> {
    chain: C,
    config: WaiterConfig,
}

impl<C: ChainState> ConfirmationWaiter<C> {
    pub fn new(chain: C, config: WaiterConfig) -> Self {
        Self { chain, config }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn config(&self) -> &WaiterConfig {
        &self.config
    }

    /// Wait until `tx` has at least `required` confirmations and return its inclusion block.
    ///
    /// The inclusion block counts as the first confirmation; `required` of 0 is treated as 1.
    /// Cancelling `cancel` stops the local loop only.
    pub async fn await_confirmations(
        &self,
        tx: &TxHash,
        required: u64,
        cancel: &CancellationToken,
    ) -> Result<Confirmation, DeployError> {
        let required = required.max(1);
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.timeout_ms);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        let mut included: Option<BlockRef> = None;
        let mut observed = 0u64;
        let mut missing = 0u32;

        tracing::info!(%tx, required, "waiting for confirmations");

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => return Err(self.cancelled(tx, observed)),
                res = tokio::time::timeout_at(deadline, self.observe(tx)) => match res {
                    Ok(polled) => polled,
                    Err(_) => return Err(self.timed_out(tx, required, observed, started)),
                },
            };

            match polled {
                Ok(Observation::Included { block, depth }) => {
                    missing = 0;
                    if included.as_ref().is_some_and(|prev| prev != &block) {
                        tracing::warn!(
                            %tx,
                            from = ?included,
                            to = ?block,
                            previous_depth = observed,
                            depth,
                            "transaction moved to a different block"
                        );
                    }
                    if depth != observed {
                        tracing::debug!(%tx, depth, required, block = block.number, "confirmation progress");
                    }
                    observed = depth;
                    if depth >= required {
                        tracing::info!(%tx, block = block.number, confirmations = depth, "transaction confirmed");
                        return Ok(Confirmation {
                            block,
                            confirmations: depth,
                        });
                    }
                    included = Some(block);
                }
                Ok(Observation::Reverted(block)) => {
                    tracing::error!(%tx, block = block.number, "transaction reverted");
                    return Err(DeployError::Reverted {
                        tx: tx.clone(),
                        block,
                    });
                }
                Ok(Observation::Pending) => {
                    missing = 0;
                    if let Some(block) = included.take() {
                        tracing::warn!(%tx, block = block.number, "transaction reorged out, waiting for re-inclusion");
                        observed = 0;
                    }
                }
                Ok(Observation::Unknown) => {
                    missing += 1;
                    tracing::debug!(%tx, missing, "node does not know the transaction");
                    if missing >= self.config.lost_after_missing_polls.max(1) {
                        tracing::error!(%tx, observed, "transaction lost");
                        return Err(DeployError::TransactionLost {
                            tx: tx.clone(),
                            required,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(%tx, error = %e, "poll failed, will retry");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(tx, required, observed, started));
            }
            let nap = poll_interval.min(deadline - now);
            tokio::select! {
                _ = cancel.cancelled() => return Err(self.cancelled(tx, observed)),
                _ = tokio::time::sleep(nap) => {}
            }
        }
    }

    async fn observe(&self, tx: &TxHash) -> Result<Observation, TransportError> {
        match self.chain.transaction_status(tx).await? {
            TxStatus::Pending => Ok(Observation::Pending),
            TxStatus::Unknown => Ok(Observation::Unknown),
            TxStatus::Reverted(block) => Ok(Observation::Reverted(block)),
            TxStatus::Included(block) => {
                let head = self.chain.block_number().await?;
                let depth = head.saturating_sub(block.number) + 1;
                Ok(Observation::Included { block, depth })
            }
        }
    }

    fn timed_out(&self, tx: &TxHash, required: u64, observed: u64, started: Instant) -> DeployError {
        let waited_ms = started.elapsed().as_millis() as u64;
        tracing::warn!(%tx, required, observed, waited_ms, "gave up waiting for confirmations");
        DeployError::ConfirmationTimeout {
            tx: tx.clone(),
            required,
            observed,
            waited_ms,
        }
    }

    fn cancelled(&self, tx: &TxHash, observed: u64) -> DeployError {
        tracing::info!(%tx, observed, "confirmation wait cancelled");
        DeployError::WaitCancelled { tx: tx.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg: WaiterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.poll_interval_ms, 2_000);
        assert_eq!(cfg.timeout_ms, 600_000);
        assert_eq!(cfg.lost_after_missing_polls, 3);
    }
}
