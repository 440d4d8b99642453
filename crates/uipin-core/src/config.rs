//! The resolved runtime configuration record.
//!
//! Resolution (defaults, project file, environment, caller overrides) is
//! performed by `uipin-store`, which owns the `.uipin/` directory the config
//! file lives in. This module only defines the record and its defaults.

use crate::provider::ProviderName;
use serde::{Deserialize, Serialize};

/// Baseline model used when neither the caller nor the provider picks one.
pub const DEFAULT_MODEL: &str = "gpt-5.3-codex-spark";

/// Fully resolved UIPin configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UipinConfig {
    /// Which provider adapter handles submissions.
    pub provider: ProviderName,
    /// Model passed to the provider CLI.
    pub model: String,
    /// Port of the target application the proxy forwards to.
    pub target: u16,
    /// Whether debug-level log events are persisted.
    pub debug: bool,
    /// Port the bridge (control-plane) server listens on.
    pub bridge_port: u16,
    /// Port the reverse proxy listens on.
    pub proxy_port: u16,
}

impl Default for UipinConfig {
    fn default() -> Self {
        Self {
            provider: ProviderName::Codex,
            model: DEFAULT_MODEL.to_string(),
            target: 3000,
            debug: false,
            bridge_port: 7331,
            proxy_port: 3030,
        }
    }
}
