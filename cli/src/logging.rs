//! Tracing initialisation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level per component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: crate name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// `--log-level`, `--log-json` and repeated `--log component=level` flags.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--log-level" => {
                    if let Some(level) = iter.next() {
                        config.level = level.clone();
                    }
                }
                "--log-json" => config.json = true,
                "--log" => {
                    if let Some((component, level)) = iter.next().and_then(|d| d.split_once('=')) {
                        config.components.insert(component.into(), level.into());
                    }
                }
                _ => {}
            }
        }
        config
    }

    /// Filter directives such as `info,canvas_deploy=debug`, sorted by component.
    pub fn directives(&self) -> String {
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();
        let mut directives = self.level.clone();
        for (component, level) in components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `config` when set.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directives()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries command output; logs go to stderr
    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn defaults_to_info_text() {
        let cfg = LogConfig::from_args(&[]);
        assert_eq!(cfg.level, "info");
        assert!(!cfg.json);
        assert_eq!(cfg.directives(), "info");
    }

    #[test]
    fn component_overrides() {
        let cfg = LogConfig::from_args(&args(
            "--log-level warn --log canvas-deploy=debug --log canvas-rpc=trace --log-json",
        ));
        assert!(cfg.json);
        assert_eq!(cfg.directives(), "warn,canvas_deploy=debug,canvas_rpc=trace");
    }
}
