//! Shared pipeline types.

use std::fmt;

use canvas_registry::Address;
use serde::{Deserialize, Serialize};

use crate::error::FactoryError;

/// A transaction hash as reported by the node, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The block a transaction was included in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub number: u64,
    pub hash: String,
}

/// What a single status poll observed about a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Known to the node but not yet mined.
    Pending,
    /// Mined successfully.
    Included(BlockRef),
    /// Mined, but execution failed.
    Reverted(BlockRef),
    /// Not known to the node at all (dropped or replaced).
    Unknown,
}

/// Result of a successful confirmation wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Block the transaction was included in.
    pub block: BlockRef,
    /// Confirmations observed; the inclusion block counts as the first.
    pub confirmations: u64,
}

/// A submitted, not yet confirmed, proxy deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDeployment {
    /// Address the proxy will live at.
    pub proxy: Address,
    /// Address of the implementation the proxy delegates to.
    pub implementation: Address,
    /// Proxy creation transaction.
    pub tx_hash: TxHash,
    /// Implementation creation transaction.
    pub implementation_tx_hash: TxHash,
}

/// A compiled contract, as written by Hardhat into `artifacts/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    #[serde(default)]
    pub source_name: String,
    /// `0x`-prefixed creation bytecode.
    pub bytecode: String,
}

impl ContractArtifact {
    /// Parse a Hardhat artifact JSON file's contents.
    pub fn from_json(json: &str) -> Result<Self, FactoryError> {
        serde_json::from_str(json).map_err(|e| FactoryError::Artifact(e.to_string()))
    }

    /// Decoded creation bytecode. Unlinked or empty bytecode is rejected.
    pub fn creation_code(&self) -> Result<Vec<u8>, FactoryError> {
        let raw = self.bytecode.strip_prefix("0x").unwrap_or(&self.bytecode);
        if raw.is_empty() {
            return Err(FactoryError::Artifact(format!(
                "{} has no bytecode (abstract contract or interface?)",
                self.contract_name
            )));
        }
        if raw.contains("__") {
            return Err(FactoryError::Artifact(format!(
                "{} has unlinked library placeholders",
                self.contract_name
            )));
        }
        hex::decode(raw).map_err(|e| {
            FactoryError::Artifact(format!("{} bytecode: {e}", self.contract_name))
        })
    }

    /// `contracts/Canvas.sol:Canvas` style name used by explorers.
    pub fn fully_qualified_name(&self) -> String {
        if self.source_name.is_empty() {
            self.contract_name.clone()
        } else {
            format!("{}:{}", self.source_name, self.contract_name)
        }
    }
}

/// Everything an explorer needs to verify a deployed contract's source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Fully qualified contract name, e.g. `contracts/Canvas.sol:Canvas`.
    pub contract_name: String,
    /// Full compiler version, e.g. `v0.8.17+commit.8df45f5f`.
    pub compiler_version: String,
    /// Solidity standard-JSON compiler input.
    pub standard_json_input: String,
    /// ABI-encoded constructor arguments, hex without `0x`. Empty for upgradeable implementations.
    #[serde(default)]
    pub constructor_args: String,
}
