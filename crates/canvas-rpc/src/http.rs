//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! Transient failures (connection errors, non-2xx status, timeouts) are
//! retried with exponential backoff. Errors returned by the node itself are
//! passed through untouched.
//!
//! Transaction submissions are never retried: a request that timed out may
//! still have reached the node, and resending it cannot tell the two apart.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::transport::RpcTransport;

/// Methods that change node state. Sent exactly once.
const SUBMISSION_METHODS: &[&str] = &["eth_sendTransaction", "eth_sendRawTransaction"];

/// Whether a transient failure of `method` may be retried.
pub fn is_retry_safe(method: &str) -> bool {
    !SUBMISSION_METHODS.contains(&method)
}

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub retry: RetryConfig,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout_ms: 30_000,
        }
    }
}

/// HTTP JSON-RPC client with retry of transient errors.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let request_timeout = Duration::from_millis(config.request_timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            request_timeout,
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(url, HttpClientConfig::default())
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(req)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(&req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() && !is_retry_safe(&req.method) => {
                    tracing::warn!(
                        error = %e,
                        method = %req.method,
                        url = %self.url,
                        "submission outcome unknown, not retrying"
                    );
                    return Err(e);
                }
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            method = %req.method,
                            url = %self.url,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(
                            attempt,
                            error = %e,
                            method = %req.method,
                            url = %self.url,
                            "max retries exceeded"
                        );
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for HttpRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRpcClient").field("url", &self.url).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn config_defaults() {
        let cfg: HttpClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.request_timeout_ms, 30_000);
        assert_eq!(cfg.retry.max_retries, 3);
    }

    /// Accepts connections, counts them and never answers.
    async fn silent_node() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    drop(socket);
                });
            }
        });
        (url, hits)
    }

    fn impatient(url: &str) -> HttpRpcClient {
        HttpRpcClient::new(
            url,
            HttpClientConfig {
                retry: RetryConfig {
                    max_retries: 2,
                    initial_backoff_ms: 1,
                    max_backoff_ms: 1,
                    multiplier: 1.0,
                },
                request_timeout_ms: 200,
            },
        )
        .unwrap()
    }

    #[test]
    fn submissions_are_not_retry_safe() {
        assert!(!is_retry_safe("eth_sendTransaction"));
        assert!(!is_retry_safe("eth_sendRawTransaction"));
        assert!(is_retry_safe("eth_getTransactionReceipt"));
    }

    #[tokio::test]
    async fn timed_out_submission_is_sent_once() {
        let (url, hits) = silent_node().await;
        let client = impatient(&url);
        let err = client
            .call::<String>("eth_sendTransaction", vec![serde_json::json!({ "nonce": "0x0" })])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }), "unexpected error: {err}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timed_out_read_is_retried() {
        let (url, hits) = silent_node().await;
        let client = impatient(&url);
        let err = client
            .call::<String>("eth_blockNumber", vec![])
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_after_retries() {
        let client = HttpRpcClient::new(
            "http://127.0.0.1:9",
            HttpClientConfig {
                retry: RetryConfig {
                    max_retries: 1,
                    initial_backoff_ms: 1,
                    max_backoff_ms: 1,
                    multiplier: 1.0,
                },
                request_timeout_ms: 500,
            },
        )
        .unwrap();
        let err = client
            .call::<String>("eth_blockNumber", vec![])
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
