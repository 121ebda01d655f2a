//! canvas-rpc: JSON-RPC plumbing for the Canvas deployment pipeline.
//!
//! - [`RpcTransport`]: async trait every transport implements
//! - [`HttpRpcClient`]: `reqwest`-backed transport with retry of transient errors
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: wire types
//! - [`TransportError`]: structured error type
//! - [`RetryPolicy`]: exponential backoff, shared with the explorer client

pub mod error;
pub mod http;
pub mod jsonrpc;
pub mod retry;
pub mod transport;

pub use error::TransportError;
pub use http::{is_retry_safe, HttpClientConfig, HttpRpcClient};
pub use jsonrpc::{parse_quantity, quantity, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::RpcTransport;
