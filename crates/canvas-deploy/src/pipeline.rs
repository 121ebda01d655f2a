//! The deploy → confirm → verify workflow.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::deployer::{Deployer, ProxyFactory};
use crate::error::DeployError;
use crate::record::{DeploymentRecord, VerificationStatus};
use crate::types::{ContractArtifact, SourceMetadata};
use crate::verifier::{VerificationResult, VerificationService, Verifier};
use crate::waiter::{ChainState, ConfirmationWaiter, WaiterConfig};

/// Configuration for a [`DeploymentPipeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Confirmations to wait for before verifying.
    pub required_confirmations: u64,
    pub waiter: WaiterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            required_confirmations: 5,
            waiter: WaiterConfig::default(),
        }
    }
}

/// Inputs for one deployment run.
#[derive(Debug, Clone)]
pub struct DeploymentArtifacts {
    /// The registry implementation.
    pub implementation: ContractArtifact,
    /// The proxy placed in front of it.
    pub proxy: ContractArtifact,
    /// Source of the implementation, for the verifier.
    pub source: SourceMetadata,
}

/// Runs Deployer → ConfirmationWaiter → Verifier for a single network.
///
/// Stages run strictly in sequence. The confirmation wait is the only
/// suspension point and only suspends the task that called [`run`](Self::run).
#[derive(Debug)]
pub struct DeploymentPipeline<F, C, V> {
    deployer: Deployer<F>,
    waiter: ConfirmationWaiter<C>,
    verifier: Verifier<V>,
    required_confirmations: u64,
}

impl<F, C, V> DeploymentPipeline<F, C, V>
where
    F: ProxyFactory,
    C: ChainState,
    V: VerificationService,
{
    pub fn new(factory: F, chain: C, service: V, config: PipelineConfig) -> Self {
        Self {
            deployer: Deployer::new(factory),
            waiter: ConfirmationWaiter::new(chain, config.waiter),
            verifier: Verifier::new(service),
            required_confirmations: config.required_confirmations,
        }
    }

    pub fn deployer(&self) -> &Deployer<F> {
        &self.deployer
    }

    pub fn waiter(&self) -> &ConfirmationWaiter<C> {
        &self.waiter
    }

    pub fn verifier(&self) -> &Verifier<V> {
        &self.verifier
    }

    /// Deploy, wait for finality, verify the implementation's source, then
    /// link the proxy to it at the explorer.
    ///
    /// The implementation is created one nonce before the proxy, so once the
    /// proxy transaction is final the implementation is too.
    pub async fn run(
        &self,
        artifacts: &DeploymentArtifacts,
        cancel: &CancellationToken,
    ) -> Result<DeploymentRecord, DeployError> {
        let deployment = self
            .deployer
            .deploy(&artifacts.implementation, &artifacts.proxy)
            .await?;
        let mut record = DeploymentRecord::new(&deployment);

        let confirmation = self
            .waiter
            .await_confirmations(&deployment.tx_hash, self.required_confirmations, cancel)
            .await?;
        record.record_confirmation(&confirmation);

        let result = if self.verifier.is_verified(&deployment.implementation).await? {
            VerificationResult::AlreadyVerified
        } else {
            record.transition(VerificationStatus::Submitted)?;
            self.verifier
                .submit(&deployment.implementation, &artifacts.source)
                .await?
        };
        record.apply(&result)?;

        if let VerificationResult::VerificationFailed { reason } = result {
            return Err(DeployError::VerificationFailed {
                address: deployment.implementation,
                reason,
            });
        }

        let link = self
            .verifier
            .link_proxy(&deployment.proxy, &deployment.implementation)
            .await?;
        record.apply_proxy_link(&link);
        if let VerificationResult::VerificationFailed { reason } = link {
            return Err(DeployError::VerificationFailed {
                address: deployment.proxy,
                reason,
            });
        }

        tracing::info!(
            proxy = %record.proxy,
            implementation = %record.implementation,
            confirmations = record.confirmations,
            status = %record.status(),
            "deployment complete"
        );
        Ok(record)
    }
}
