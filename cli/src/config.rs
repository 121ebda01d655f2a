//! Deployment settings from the environment and command-line flags.
//!
//! | Variable                  | Flag              | Default                        |
//! |---------------------------|-------------------|--------------------------------|
//! | `CANVAS_RPC_URL`          | `--rpc`           | `http://127.0.0.1:8545`        |
//! | `CANVAS_DEPLOYER`         | `--from`          | required for `deploy`          |
//! | `CANVAS_EXPLORER_API_URL` | `--explorer`      | `https://api.etherscan.io/api` |
//! | `CANVAS_EXPLORER_API_KEY` | `--api-key`       | empty                          |
//! | `CANVAS_CONFIRMATIONS`    | `--confirmations` | `5`                            |
//!
//! Flags win over variables.

use anyhow::{Context, Result};
use canvas_deploy::etherscan::EtherscanConfig;
use canvas_deploy::PipelineConfig;
use canvas_registry::Address;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Clone)]
pub struct DeployEnv {
    pub rpc_url: String,
    pub deployer: Option<Address>,
    pub explorer_api_url: Option<String>,
    pub explorer_api_key: String,
    pub confirmations: u64,
}

impl DeployEnv {
    pub fn from_env(args: &[String]) -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok(), args)
    }

    /// Resolve settings from `lookup` (environment) overlaid with `args`.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>, args: &[String]) -> Result<Self> {
        let setting = |flag: &str, var: &str| parse_flag(args, flag).or_else(|| lookup(var));

        let deployer = setting("--from", "CANVAS_DEPLOYER")
            .map(|raw| {
                raw.parse::<Address>()
                    .with_context(|| format!("invalid deployer address {raw:?}"))
            })
            .transpose()?;

        let confirmations = match setting("--confirmations", "CANVAS_CONFIRMATIONS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid confirmation count {raw:?}"))?,
            None => PipelineConfig::default().required_confirmations,
        };

        Ok(Self {
            rpc_url: setting("--rpc", "CANVAS_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.into()),
            deployer,
            explorer_api_url: setting("--explorer", "CANVAS_EXPLORER_API_URL"),
            explorer_api_key: setting("--api-key", "CANVAS_EXPLORER_API_KEY").unwrap_or_default(),
            confirmations,
        })
    }

    pub fn require_deployer(&self) -> Result<Address> {
        self.deployer
            .context("deployer address is required (--from or CANVAS_DEPLOYER)")
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            required_confirmations: self.confirmations,
            ..PipelineConfig::default()
        }
    }

    pub fn explorer(&self) -> EtherscanConfig {
        let mut config = EtherscanConfig {
            api_key: self.explorer_api_key.clone(),
            ..EtherscanConfig::default()
        };
        if let Some(url) = &self.explorer_api_url {
            config.api_url = url.clone();
        }
        config
    }
}

pub fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}
