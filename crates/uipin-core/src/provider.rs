//! Provider identity and the shared error-code vocabulary.
//!
//! The adapter contract itself lives in `uipin-providers`; this module only
//! holds the pure pieces that records and config refer to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Known coding-agent providers. A closed set: the registry dispatches on
/// this enum rather than on trait objects discovered at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    Codex,
    Claude,
    Cursor,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Claude => "claude",
            Self::Cursor => "cursor",
        }
    }

    /// The model a provider falls back to when the caller does not pick one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Claude => "sonnet",
            Self::Codex | Self::Cursor => crate::config::DEFAULT_MODEL,
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "codex" => Ok(Self::Codex),
            "claude" => Ok(Self::Claude),
            "cursor" => Ok(Self::Cursor),
            other => Err(CoreError::UnknownProvider(other.to_string())),
        }
    }
}

/// Stable error codes carried in terminal results and task records.
pub mod error_codes {
    pub const PROVIDER_UNAVAILABLE: &str = "PROVIDER_UNAVAILABLE";
    pub const PROVIDER_NOT_ENABLED: &str = "PROVIDER_NOT_ENABLED";
    pub const PROVIDER_TIMEOUT: &str = "PROVIDER_TIMEOUT";
    pub const PROCESS_FAILED: &str = "PROVIDER_PROCESS_FAILED";
    pub const VALIDATION_FAILED: &str = "PROVIDER_VALIDATION_FAILED";
    pub const UNKNOWN: &str = "UNKNOWN";
}
