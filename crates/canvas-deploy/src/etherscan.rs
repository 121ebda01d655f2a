//! Etherscan-compatible explorer client (Etherscan, Snowtrace, Basescan, ...).
//!
//! Verification is asynchronous on the explorer side: `verifysourcecode`
//! returns a GUID which is then polled with `checkverifystatus` until the
//! explorer reaches a verdict. Proxy linking works the same way with
//! `verifyproxycontract` and `checkproxyverification`. Status polling backs
//! off with [`RetryPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use canvas_registry::Address;
use canvas_rpc::{RetryConfig, RetryPolicy, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::VerifierError;
use crate::types::SourceMetadata;
use crate::verifier::{SubmissionOutcome, VerificationService};

/// Configuration for [`EtherscanClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EtherscanConfig {
    /// API endpoint, e.g. `https://api-testnet.snowtrace.io/api`.
    pub api_url: String,
    pub api_key: String,
    /// Backoff between `checkverifystatus` polls; `max_retries` bounds the poll count.
    pub status_poll: RetryConfig,
    pub request_timeout_ms: u64,
}

impl Default for EtherscanConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.etherscan.io/api".into(),
            api_key: String::new(),
            status_poll: RetryConfig {
                max_retries: 10,
                initial_backoff_ms: 3_000,
                max_backoff_ms: 15_000,
                multiplier: 1.5,
            },
            request_timeout_ms: 30_000,
        }
    }
}

/// Envelope of every explorer API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Value,
}

impl ApiResponse {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }

    fn result_text(&self) -> String {
        match &self.result {
            Value::String(s) => s.clone(),
            Value::Null => self.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Reply to `verifysourcecode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReply {
    /// Queued; poll with this GUID.
    Queued(String),
    /// Settled without queueing.
    Settled(SubmissionOutcome),
}

/// Reply to `checkverifystatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReply {
    Pending,
    Settled(SubmissionOutcome),
}

/// Whether a `getsourcecode` response shows verified source.
pub fn source_code_present(resp: &ApiResponse) -> Result<bool, VerifierError> {
    if !resp.is_ok() {
        return Err(VerifierError::Api(resp.result_text()));
    }
    let source = resp
        .result
        .get(0)
        .and_then(|entry| entry.get("SourceCode"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(!source.is_empty())
}

pub fn classify_submit(resp: &ApiResponse) -> SubmitReply {
    let text = resp.result_text();
    if resp.is_ok() {
        return SubmitReply::Queued(text);
    }
    if text.to_ascii_lowercase().contains("already verified") {
        SubmitReply::Settled(SubmissionOutcome::AlreadyVerified)
    } else {
        SubmitReply::Settled(SubmissionOutcome::Rejected { reason: text })
    }
}

pub fn classify_status(resp: &ApiResponse) -> StatusReply {
    let text = resp.result_text();
    let lower = text.to_ascii_lowercase();
    if lower.contains("pending in queue") {
        StatusReply::Pending
    } else if lower.contains("already verified") {
        StatusReply::Settled(SubmissionOutcome::AlreadyVerified)
    } else if lower.starts_with("pass") {
        StatusReply::Settled(SubmissionOutcome::Accepted)
    } else {
        StatusReply::Settled(SubmissionOutcome::Rejected { reason: text })
    }
}

/// Reply to `checkproxyverification`. Only status `1` links the proxy.
pub fn classify_proxy_status(resp: &ApiResponse) -> StatusReply {
    let text = resp.result_text();
    if text.to_ascii_lowercase().contains("pending in queue") {
        StatusReply::Pending
    } else if resp.is_ok() {
        StatusReply::Settled(SubmissionOutcome::Accepted)
    } else {
        StatusReply::Settled(SubmissionOutcome::Rejected { reason: text })
    }
}

/// Explorer API client implementing [`VerificationService`].
pub struct EtherscanClient {
    http: reqwest::Client,
    config: EtherscanConfig,
    status_poll: RetryPolicy,
}

impl EtherscanClient {
    pub fn new(config: EtherscanConfig) -> Result<Self, VerifierError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(TransportError::from)?;
        Ok(Self {
            http,
            status_poll: RetryPolicy::new(config.status_poll.clone()),
            config,
        })
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<ApiResponse, VerifierError> {
        let resp = self
            .http
            .get(&self.config.api_url)
            .query(params)
            .query(&[("apikey", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(TransportError::from)?
            .error_for_status()
            .map_err(TransportError::from)?;
        Ok(resp.json().await.map_err(TransportError::from)?)
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<ApiResponse, VerifierError> {
        let resp = self
            .http
            .post(&self.config.api_url)
            .form(form)
            .send()
            .await
            .map_err(TransportError::from)?
            .error_for_status()
            .map_err(TransportError::from)?;
        Ok(resp.json().await.map_err(TransportError::from)?)
    }

    async fn await_verdict(
        &self,
        action: &str,
        guid: &str,
        classify: fn(&ApiResponse) -> StatusReply,
    ) -> Result<SubmissionOutcome, VerifierError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let resp = self
                .get(&[("module", "contract"), ("action", action), ("guid", guid)])
                .await?;
            match classify(&resp) {
                StatusReply::Settled(outcome) => return Ok(outcome),
                StatusReply::Pending => match self.status_poll.next_delay(attempt) {
                    Some(delay) => {
                        tracing::debug!(action, guid, attempt, delay_ms = delay.as_millis() as u64, "verification pending");
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        return Err(VerifierError::Api(format!(
                            "verification {guid} still pending after {attempt} checks"
                        )))
                    }
                },
            }
        }
    }
}

#[async_trait]
impl VerificationService for EtherscanClient {
    async fn is_verified(&self, address: &Address) -> Result<bool, VerifierError> {
        let address = address.to_string();
        let resp = self
            .get(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address.as_str()),
            ])
            .await?;
        source_code_present(&resp)
    }

    async fn submit(
        &self,
        address: &Address,
        source: &SourceMetadata,
    ) -> Result<SubmissionOutcome, VerifierError> {
        let address = address.to_string();
        let resp = self
            .post(&[
                ("apikey", self.config.api_key.as_str()),
                ("module", "contract"),
                ("action", "verifysourcecode"),
                ("contractaddress", address.as_str()),
                ("sourceCode", source.standard_json_input.as_str()),
                ("codeformat", "solidity-standard-json-input"),
                ("contractname", source.contract_name.as_str()),
                ("compilerversion", source.compiler_version.as_str()),
                // sic: the explorer API spells it this way
                ("constructorArguements", source.constructor_args.as_str()),
            ])
            .await?;

        match classify_submit(&resp) {
            SubmitReply::Settled(outcome) => Ok(outcome),
            SubmitReply::Queued(guid) => {
                tracing::info!(%address, %guid, "verification queued");
                self.await_verdict("checkverifystatus", &guid, classify_status)
                    .await
            }
        }
    }

    async fn link_proxy(
        &self,
        proxy: &Address,
        implementation: &Address,
    ) -> Result<SubmissionOutcome, VerifierError> {
        let proxy = proxy.to_string();
        let implementation = implementation.to_string();
        let resp = self
            .post(&[
                ("apikey", self.config.api_key.as_str()),
                ("module", "contract"),
                ("action", "verifyproxycontract"),
                ("address", proxy.as_str()),
                ("expectedimplementation", implementation.as_str()),
            ])
            .await?;

        match classify_submit(&resp) {
            SubmitReply::Settled(outcome) => Ok(outcome),
            SubmitReply::Queued(guid) => {
                tracing::info!(%proxy, %guid, "proxy link queued");
                self.await_verdict("checkproxyverification", &guid, classify_proxy_status)
                    .await
            }
        }
    }
}

impl std::fmt::Debug for EtherscanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtherscanClient")
            .field("api_url", &self.config.api_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(json: &str) -> ApiResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn unverified_contract_has_empty_source() {
        let r = resp(
            r#"{"status":"1","message":"OK","result":[{"SourceCode":"","ABI":"Contract source code not verified","ContractName":""}]}"#,
        );
        assert!(!source_code_present(&r).unwrap());
    }

    #[test]
    fn verified_contract_has_source() {
        let r = resp(
            r#"{"status":"1","message":"OK","result":[{"SourceCode":"pragma solidity ^0.8.17;","ContractName":"Canvas"}]}"#,
        );
        assert!(source_code_present(&r).unwrap());
    }

    #[test]
    fn api_error_on_lookup() {
        let r = resp(r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#);
        let err = source_code_present(&r).unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[test]
    fn submit_replies() {
        assert_eq!(
            classify_submit(&resp(r#"{"status":"1","message":"OK","result":"abc123"}"#)),
            SubmitReply::Queued("abc123".into())
        );
        assert_eq!(
            classify_submit(&resp(
                r#"{"status":"0","message":"NOTOK","result":"Contract source code already verified"}"#
            )),
            SubmitReply::Settled(SubmissionOutcome::AlreadyVerified)
        );
        assert!(matches!(
            classify_submit(&resp(
                r#"{"status":"0","message":"NOTOK","result":"Invalid constructor arguments"}"#
            )),
            SubmitReply::Settled(SubmissionOutcome::Rejected { .. })
        ));
    }

    #[test]
    fn status_replies() {
        assert_eq!(
            classify_status(&resp(r#"{"status":"0","message":"NOTOK","result":"Pending in queue"}"#)),
            StatusReply::Pending
        );
        assert_eq!(
            classify_status(&resp(r#"{"status":"1","message":"OK","result":"Pass - Verified"}"#)),
            StatusReply::Settled(SubmissionOutcome::Accepted)
        );
        assert_eq!(
            classify_status(&resp(r#"{"status":"1","message":"OK","result":"Already Verified"}"#)),
            StatusReply::Settled(SubmissionOutcome::AlreadyVerified)
        );
        assert_eq!(
            classify_status(&resp(
                r#"{"status":"0","message":"NOTOK","result":"Fail - Unable to verify"}"#
            )),
            StatusReply::Settled(SubmissionOutcome::Rejected {
                reason: "Fail - Unable to verify".into()
            })
        );
    }

    #[test]
    fn proxy_status_replies() {
        assert_eq!(
            classify_proxy_status(&resp(r#"{"status":"0","message":"NOTOK","result":"Pending in queue"}"#)),
            StatusReply::Pending
        );
        assert_eq!(
            classify_proxy_status(&resp(
                r#"{"status":"1","message":"OK","result":"The proxy's (0xe7f1725e7734ce288f8367e1bb143e90bb3f0512) implementation contract is found at 0x5fbdb2315678afecb367f032d93f642f64180aa3 and is successfully updated."}"#
            )),
            StatusReply::Settled(SubmissionOutcome::Accepted)
        );
        assert_eq!(
            classify_proxy_status(&resp(
                r#"{"status":"0","message":"NOTOK","result":"A corresponding implementation contract was unfortunately not detected for the proxy address."}"#
            )),
            StatusReply::Settled(SubmissionOutcome::Rejected {
                reason: "A corresponding implementation contract was unfortunately not detected for the proxy address."
                    .into()
            })
        );
    }

    #[test]
    fn config_defaults() {
        let cfg: EtherscanConfig =
            serde_json::from_str(r#"{"api_url":"https://api-testnet.snowtrace.io/api"}"#).unwrap();
        assert_eq!(cfg.api_url, "https://api-testnet.snowtrace.io/api");
        assert_eq!(cfg.status_poll.max_retries, 10);
    }
}
