//! canvas-deploy: deploys the Canvas registry behind an upgradeable proxy,
//! waits for finality and submits the source for verification.
//!
//! # Pipeline
//!
//! ```text
//! Deployer ──► ConfirmationWaiter ──► Verifier
//!  (submit)     (poll until depth)     (check, then submit source)
//! ```
//!
//! Each stage talks to the outside world through a trait:
//!
//! - [`ProxyFactory`]: submits implementation + proxy creation
//! - [`ChainState`]: transaction and head status for polling
//! - [`VerificationService`]: an explorer's source-verification API
//!
//! [`evm::EvmChain`] implements the first two over JSON-RPC and
//! [`etherscan::EtherscanClient`] implements the third.

pub mod deployer;
pub mod error;
pub mod etherscan;
pub mod evm;
pub mod pipeline;
pub mod record;
pub mod types;
pub mod verifier;
pub mod waiter;

pub use deployer::{Deployer, ProxyFactory};
pub use etherscan::{EtherscanClient, EtherscanConfig};
pub use evm::EvmChain;
pub use error::{DeployError, FactoryError, VerifierError};
pub use pipeline::{DeploymentArtifacts, DeploymentPipeline, PipelineConfig};
pub use record::{DeploymentRecord, ProxyLink, VerificationStatus};
pub use types::{BlockRef, Confirmation, ContractArtifact, ProxyDeployment, SourceMetadata, TxHash, TxStatus};
pub use verifier::{SubmissionOutcome, VerificationResult, VerificationService, Verifier};
pub use waiter::{ChainState, ConfirmationWaiter, WaiterConfig};

pub use tokio_util::sync::CancellationToken;
