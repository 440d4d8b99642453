//! Configuration resolution.
//!
//! Precedence, lowest to highest: built-in defaults, the project config file
//! (`.uipin/config.json`), `UIPIN_*` environment variables, explicit caller
//! overrides. When nothing above the defaults picks a model, the resolved
//! provider's own default model wins over the global baseline.

use crate::error::StoreError;
use crate::fs::write_json_atomic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uipin_core::{config::DEFAULT_MODEL, ProviderName, UipinConfig};

/// A sparse config layer; unset fields defer to lower-precedence layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    pub provider: Option<ProviderName>,
    pub model: Option<String>,
    pub target: Option<u16>,
    pub debug: Option<bool>,
    pub bridge_port: Option<u16>,
    pub proxy_port: Option<u16>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut UipinConfig) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(target) = self.target {
            config.target = target;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(port) = self.bridge_port {
            config.bridge_port = port;
        }
        if let Some(port) = self.proxy_port {
            config.proxy_port = port;
        }
    }
}

fn config_path(cwd: &Path) -> PathBuf {
    cwd.join(".uipin").join("config.json")
}

/// Read the project config file as a sparse layer. Missing or malformed
/// files resolve to an empty layer rather than failing startup.
pub async fn read_config_file(cwd: &Path) -> ConfigOverrides {
    match tokio::fs::read_to_string(config_path(cwd)).await {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        Err(_) => ConfigOverrides::default(),
    }
}

fn env_layer() -> ConfigOverrides {
    fn var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }

    ConfigOverrides {
        provider: var("UIPIN_PROVIDER").and_then(|v| ProviderName::from_str(&v).ok()),
        model: var("UIPIN_MODEL"),
        target: var("UIPIN_TARGET").and_then(|v| v.parse().ok()),
        debug: var("UIPIN_DEBUG").map(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        bridge_port: var("UIPIN_BRIDGE_PORT").and_then(|v| v.parse().ok()),
        proxy_port: var("UIPIN_PROXY_PORT").and_then(|v| v.parse().ok()),
    }
}

/// Merge the three sparse layers over the defaults.
///
/// A file model equal to the shipped default config (baseline provider and
/// baseline model together) is not treated as an explicit model choice, so
/// switching the provider alone still picks up that provider's default
/// model.
pub fn merge_layers(
    file: &ConfigOverrides,
    env: &ConfigOverrides,
    overrides: &ConfigOverrides,
) -> UipinConfig {
    let mut merged = UipinConfig::default();
    file.apply(&mut merged);
    env.apply(&mut merged);
    overrides.apply(&mut merged);

    let explicit_model = overrides.model.is_some() || env.model.is_some();
    let baseline_file_model = file.model.as_deref() == Some(DEFAULT_MODEL)
        && file.provider == Some(ProviderName::Codex);
    let file_picked_model = file.model.is_some() && !baseline_file_model;

    if merged.model == DEFAULT_MODEL && !explicit_model && !file_picked_model {
        merged.model = merged.provider.default_model().to_string();
    }

    merged
}

/// Resolve the effective config for a project directory.
pub async fn resolve_config(cwd: &Path, overrides: &ConfigOverrides) -> UipinConfig {
    let file = read_config_file(cwd).await;
    merge_layers(&file, &env_layer(), overrides)
}

/// Read the config file, writing the defaults first if it is missing or
/// unparseable.
pub async fn ensure_config_file(cwd: &Path) -> Result<UipinConfig, StoreError> {
    let path = config_path(cwd);
    if let Ok(raw) = tokio::fs::read_to_string(&path).await {
        if let Ok(config) = serde_json::from_str::<UipinConfig>(&raw) {
            return Ok(config);
        }
    }
    let defaults = UipinConfig::default();
    write_json_atomic(&path, &defaults).await?;
    Ok(defaults)
}
