//! EVM adapters over JSON-RPC.
//!
//! [`EvmChain`] implements [`ChainState`] with receipt and head polling, and
//! [`ProxyFactory`] by sending two creation transactions from a node-managed
//! account:
//!
//! ```text
//! nonce n     implementation  (Canvas bytecode)
//! nonce n+1   ERC1967Proxy(implementation, initialize())
//! ```
//!
//! Both addresses are derived from the sender nonce up front, so submission
//! returns as soon as the node accepts the transactions.

pub mod codec;

use async_trait::async_trait;
use canvas_registry::Address;
use canvas_rpc::{parse_quantity, quantity, RpcTransport, TransportError};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::deployer::ProxyFactory;
use crate::error::FactoryError;
use crate::types::{BlockRef, ContractArtifact, ProxyDeployment, TxHash, TxStatus};
use crate::waiter::ChainState;

use self::codec::{create_address, encode_proxy_constructor, selector, to_hex, INITIALIZE_SIGNATURE};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    block_number: Option<String>,
    block_hash: Option<String>,
    /// `0x1` success, `0x0` failure. Absent on pre-Byzantium chains.
    status: Option<String>,
}

/// An EVM chain reached through a JSON-RPC transport.
#[derive(Debug)]
pub struct EvmChain<T> {
    transport: T,
    from: Address,
    gas_limit: Option<u64>,
}

impl<T: RpcTransport> EvmChain<T> {
    /// `from` must be an account the node can sign for (`eth_accounts`).
    pub fn new(transport: T, from: Address) -> Self {
        Self {
            transport,
            from,
            gas_limit: None,
        }
    }

    /// Use a fixed gas limit instead of letting the node estimate.
    pub fn with_gas_limit(mut self, gas: u64) -> Self {
        self.gas_limit = Some(gas);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn from_address(&self) -> Address {
        self.from
    }

    /// Next nonce for the sender, counting pending transactions.
    pub async fn pending_nonce(&self) -> Result<u64, TransportError> {
        let raw: String = self
            .transport
            .call(
                "eth_getTransactionCount",
                vec![json!(self.from.to_string()), json!("pending")],
            )
            .await?;
        parse_quantity(&raw)
    }

    /// Sent once. A transport failure leaves the outcome unknown and is
    /// reported as [`FactoryError::Unacknowledged`].
    async fn send_creation(&self, code: &[u8], nonce: u64) -> Result<TxHash, FactoryError> {
        let mut tx = json!({
            "from": self.from.to_string(),
            "data": to_hex(code),
            "nonce": quantity(nonce),
        });
        if let Some(gas) = self.gas_limit {
            tx["gas"] = json!(quantity(gas));
        }
        let hash: String = self
            .transport
            .call("eth_sendTransaction", vec![tx])
            .await
            .map_err(|e| {
                if e.is_retryable() {
                    FactoryError::Unacknowledged { nonce, source: e }
                } else {
                    FactoryError::Transport(e)
                }
            })?;
        Ok(TxHash::new(hash))
    }
}

#[async_trait]
impl<T: RpcTransport> ChainState for EvmChain<T> {
    async fn transaction_status(&self, tx: &TxHash) -> Result<TxStatus, TransportError> {
        let receipt: Option<Receipt> = self
            .transport
            .call("eth_getTransactionReceipt", vec![json!(tx.as_str())])
            .await?;

        if let Some(receipt) = receipt {
            // Some nodes return a receipt skeleton for pending transactions.
            if let (Some(number), Some(hash)) = (receipt.block_number, receipt.block_hash) {
                let block = BlockRef {
                    number: parse_quantity(&number)?,
                    hash,
                };
                return Ok(match receipt.status.as_deref() {
                    Some("0x0") => TxStatus::Reverted(block),
                    _ => TxStatus::Included(block),
                });
            }
            return Ok(TxStatus::Pending);
        }

        let known: Option<Value> = self
            .transport
            .call("eth_getTransactionByHash", vec![json!(tx.as_str())])
            .await?;
        Ok(if known.is_some() {
            TxStatus::Pending
        } else {
            TxStatus::Unknown
        })
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        let raw: String = self.transport.call("eth_blockNumber", vec![]).await?;
        parse_quantity(&raw)
    }
}

#[async_trait]
impl<T: RpcTransport> ProxyFactory for EvmChain<T> {
    async fn deploy_proxy(
        &self,
        implementation: &ContractArtifact,
        proxy: &ContractArtifact,
    ) -> Result<ProxyDeployment, FactoryError> {
        let impl_code = implementation.creation_code()?;
        let proxy_code = proxy.creation_code()?;

        let nonce = self.pending_nonce().await?;
        let implementation_address = create_address(&self.from, nonce);
        let proxy_address = create_address(&self.from, nonce + 1);

        let mut proxy_init = proxy_code;
        proxy_init.extend_from_slice(&encode_proxy_constructor(
            &implementation_address,
            &selector(INITIALIZE_SIGNATURE),
        ));

        let implementation_tx_hash = self.send_creation(&impl_code, nonce).await?;
        tracing::debug!(
            tx = %implementation_tx_hash,
            address = %implementation_address,
            nonce,
            "implementation submitted"
        );

        let tx_hash = self
            .send_creation(&proxy_init, nonce + 1)
            .await
            .map_err(|e| match e {
                FactoryError::Unacknowledged { .. } => e,
                e => FactoryError::Rejected(format!(
                    "proxy submission failed after implementation {implementation_tx_hash} was sent: {e}"
                )),
            })?;
        tracing::debug!(tx = %tx_hash, address = %proxy_address, nonce = nonce + 1, "proxy submitted");

        Ok(ProxyDeployment {
            proxy: proxy_address,
            implementation: implementation_address,
            tx_hash,
            implementation_tx_hash,
        })
    }
}
