//! `EvmChain` against a scripted JSON-RPC transport.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use canvas_deploy::evm::codec::{create_address, to_hex};
use canvas_deploy::{
    BlockRef, ChainState, ContractArtifact, DeployError, EvmChain, FactoryError, ProxyFactory, TxHash, TxStatus,
};
use canvas_registry::Address;
use canvas_rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcTransport, TransportError};
use serde_json::{json, Value};

/// Answers each method with a fixed value and records every request.
#[derive(Default)]
struct MockTransport {
    answers: HashMap<&'static str, Result<Value, JsonRpcError>>,
    timeouts: Vec<&'static str>,
    requests: Mutex<Vec<JsonRpcRequest>>,
}

impl MockTransport {
    fn answer(mut self, method: &'static str, result: Value) -> Self {
        self.answers.insert(method, Ok(result));
        self
    }

    fn fail(mut self, method: &'static str, message: &str) -> Self {
        self.answers.insert(
            method,
            Err(JsonRpcError {
                code: -32000,
                message: message.into(),
                data: None,
            }),
        );
        self
    }

    fn time_out(mut self, method: &'static str) -> Self {
        self.timeouts.push(method);
        self
    }

    fn requests(&self, method: &str) -> Vec<JsonRpcRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let id = req.id;
        let answer = self.answers.get(req.method.as_str()).cloned();
        let method = req.method.clone();
        self.requests.lock().unwrap().push(req);
        if self.timeouts.contains(&method.as_str()) {
            return Err(TransportError::Timeout { ms: 30_000 });
        }
        match answer {
            Some(Ok(v)) => Ok(JsonRpcResponse::success(id, v)),
            Some(Err(e)) => Ok(JsonRpcResponse::failure(id, e)),
            None => Err(TransportError::InvalidResponse(format!("unexpected method {method}"))),
        }
    }

    fn url(&self) -> &str {
        "mock://"
    }
}

fn deployer() -> Address {
    "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
}

fn tx() -> TxHash {
    TxHash::new("0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060")
}

fn artifact(name: &str, bytecode: &str) -> ContractArtifact {
    ContractArtifact {
        contract_name: name.into(),
        source_name: format!("contracts/{name}.sol"),
        bytecode: bytecode.into(),
    }
}

#[tokio::test]
async fn mined_receipt_is_included() {
    let rpc = MockTransport::default().answer(
        "eth_getTransactionReceipt",
        json!({ "blockNumber": "0x64", "blockHash": "0xabc", "status": "0x1" }),
    );
    let chain = EvmChain::new(rpc, deployer());
    assert_eq!(
        chain.transaction_status(&tx()).await.unwrap(),
        TxStatus::Included(BlockRef {
            number: 100,
            hash: "0xabc".into()
        })
    );
    assert!(chain.transport().requests("eth_getTransactionByHash").is_empty());
}

#[tokio::test]
async fn failed_receipt_is_reverted() {
    let rpc = MockTransport::default().answer(
        "eth_getTransactionReceipt",
        json!({ "blockNumber": "0x10", "blockHash": "0xdef", "status": "0x0" }),
    );
    let chain = EvmChain::new(rpc, deployer());
    assert!(matches!(
        chain.transaction_status(&tx()).await.unwrap(),
        TxStatus::Reverted(BlockRef { number: 16, .. })
    ));
}

#[tokio::test]
async fn no_receipt_but_known_is_pending() {
    let rpc = MockTransport::default()
        .answer("eth_getTransactionReceipt", Value::Null)
        .answer("eth_getTransactionByHash", json!({ "hash": tx().as_str(), "blockNumber": null }));
    let chain = EvmChain::new(rpc, deployer());
    assert_eq!(chain.transaction_status(&tx()).await.unwrap(), TxStatus::Pending);
}

#[tokio::test]
async fn unknown_to_the_node() {
    let rpc = MockTransport::default()
        .answer("eth_getTransactionReceipt", Value::Null)
        .answer("eth_getTransactionByHash", Value::Null);
    let chain = EvmChain::new(rpc, deployer());
    assert_eq!(chain.transaction_status(&tx()).await.unwrap(), TxStatus::Unknown);
}

#[tokio::test]
async fn head_block_number() {
    let rpc = MockTransport::default().answer("eth_blockNumber", json!("0x1b4"));
    let chain = EvmChain::new(rpc, deployer());
    assert_eq!(chain.block_number().await.unwrap(), 436);
}

#[tokio::test]
async fn deploys_implementation_then_proxy() {
    let rpc = MockTransport::default()
        .answer("eth_getTransactionCount", json!("0x0"))
        .answer("eth_sendTransaction", json!("0xAAAA"));
    let chain = EvmChain::new(rpc, deployer()).with_gas_limit(3_000_000);

    let deployment = chain
        .deploy_proxy(&artifact("Canvas", "0x6080"), &artifact("ERC1967Proxy", "0x6040"))
        .await
        .unwrap();

    assert_eq!(
        deployment.implementation.to_string(),
        "0x5fbdb2315678afecb367f032d93f642f64180aa3"
    );
    assert_eq!(
        deployment.proxy.to_string(),
        "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"
    );
    assert_eq!(deployment.tx_hash.as_str(), "0xaaaa");

    let nonce_req = chain.transport().requests("eth_getTransactionCount");
    assert_eq!(nonce_req[0].params[1], json!("pending"));

    let sent = chain.transport().requests("eth_sendTransaction");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].params[0]["nonce"], json!("0x0"));
    assert_eq!(sent[0].params[0]["data"], json!("0x6080"));
    assert_eq!(sent[0].params[0]["gas"], json!("0x2dc6c0"));
    assert_eq!(sent[1].params[0]["nonce"], json!("0x1"));

    // proxy init code = creation code ++ abi(implementation, initialize())
    let data = sent[1].params[0]["data"].as_str().unwrap();
    let implementation = create_address(&deployer(), 0);
    assert!(data.starts_with("0x6040"));
    assert!(data.contains(&to_hex(implementation.as_bytes())[2..]));
    assert!(data.contains("8129fc1c"));
    assert_eq!(data.len(), 2 + 4 + 128 * 2);
}

#[tokio::test]
async fn node_rejection_is_a_transport_error() {
    let rpc = MockTransport::default()
        .answer("eth_getTransactionCount", json!("0x7"))
        .fail("eth_sendTransaction", "insufficient funds for gas * price + value");
    let chain = EvmChain::new(rpc, deployer());

    let err = chain
        .deploy_proxy(&artifact("Canvas", "0x6080"), &artifact("ERC1967Proxy", "0x6040"))
        .await
        .unwrap_err();

    // the implementation send fails first, so this surfaces as a plain transport error
    assert!(matches!(err, FactoryError::Transport(TransportError::Rpc(_))));
    assert_eq!(chain.transport().requests("eth_sendTransaction").len(), 1);
}

#[tokio::test]
async fn unlinked_bytecode_is_rejected_before_any_call() {
    let chain = EvmChain::new(MockTransport::default(), deployer());
    let err = chain
        .deploy_proxy(
            &artifact("Canvas", "0x6080__$1234$__"),
            &artifact("ERC1967Proxy", "0x6040"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FactoryError::Artifact(_)));
    assert!(chain.transport().requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn timed_out_send_is_unacknowledged_not_rejected() {
    let rpc = MockTransport::default()
        .answer("eth_getTransactionCount", json!("0x3"))
        .time_out("eth_sendTransaction");
    let chain = EvmChain::new(rpc, deployer());

    let err = chain
        .deploy_proxy(&artifact("Canvas", "0x6080"), &artifact("ERC1967Proxy", "0x6040"))
        .await
        .unwrap_err();

    assert!(matches!(err, FactoryError::Unacknowledged { nonce: 3, .. }));
    assert!(err.may_have_been_sent());
    assert!(!DeployError::Submission(err).needs_resubmission());
    assert_eq!(chain.transport().requests("eth_sendTransaction").len(), 1);
}
