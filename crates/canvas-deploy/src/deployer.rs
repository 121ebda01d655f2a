//! Proxy deployment submission.

use async_trait::async_trait;

use crate::error::{DeployError, FactoryError};
use crate::types::{ContractArtifact, ProxyDeployment};

/// Platform machinery that creates an implementation and a proxy in front of it.
///
/// Implementations submit and return as soon as the network accepts the
/// transactions. They must not wait for inclusion.
#[async_trait]
pub trait ProxyFactory: Send + Sync {
    async fn deploy_proxy(
        &self,
        implementation: &ContractArtifact,
        proxy: &ContractArtifact,
    ) -> Result<ProxyDeployment, FactoryError>;
}

/// Submits a fresh registry implementation behind a new proxy.
#[derive(Debug)]
pub struct Deployer<F> {
    factory: F,
}

impl<F: ProxyFactory> Deployer<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Submit the deployment and return the pending proxy transaction.
    ///
    /// A rejected submission surfaces as [`DeployError::Submission`] and is not retried.
    pub async fn deploy(
        &self,
        implementation: &ContractArtifact,
        proxy: &ContractArtifact,
    ) -> Result<ProxyDeployment, DeployError> {
        tracing::info!(
            implementation = %implementation.contract_name,
            proxy = %proxy.contract_name,
            "submitting proxy deployment"
        );
        match self.factory.deploy_proxy(implementation, proxy).await {
            Ok(deployment) => {
                tracing::info!(
                    proxy = %deployment.proxy,
                    implementation = %deployment.implementation,
                    tx = %deployment.tx_hash,
                    "deployed to {}",
                    deployment.proxy
                );
                Ok(deployment)
            }
            Err(e) => {
                tracing::error!(error = %e, "deployment submission rejected");
                Err(DeployError::Submission(e))
            }
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}
