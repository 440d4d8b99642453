//! UIPin Provider Adapters
//!
//! One adapter per coding-agent CLI (codex, claude, plus a disabled cursor
//! scaffold), a process supervisor handling timeouts and cancellation, and
//! a fixture mode that replays a deterministic run without spawning
//! anything. Fixture mode is switched on per provider via the environment:
//! `UIPIN_PROVIDER_FIXTURE` for all providers, or `UIPIN_CODEX_MOCK` /
//! `UIPIN_CLAUDE_MOCK` individually (value `1` or `true`).

pub mod adapter;
pub mod claude;
pub mod codex;
pub mod fixture;
pub mod output;
pub mod process;
pub mod registry;
pub mod stub;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::{ProviderAdapter, ProviderProgress, ProviderResult, ProviderTaskInput};
pub use registry::ProviderRegistry;

use claude::ClaudeAdapter;
use codex::CodexAdapter;
use std::collections::HashMap;
use std::sync::Arc;
use stub::CursorAdapter;
use uipin_core::ProviderName;

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).ok().as_deref(),
        Some(value) if value == "1" || value.eq_ignore_ascii_case("true")
    )
}

/// Whether the provider should run in fixture mode.
pub fn fixture_enabled(provider: ProviderName) -> bool {
    if env_flag("UIPIN_PROVIDER_FIXTURE") {
        return true;
    }
    match provider {
        ProviderName::Codex => env_flag("UIPIN_CODEX_MOCK"),
        ProviderName::Claude => env_flag("UIPIN_CLAUDE_MOCK"),
        ProviderName::Cursor => false,
    }
}

/// Build the default registry: codex and claude enabled, cursor registered
/// as a disabled scaffold.
pub fn create_provider_registry() -> ProviderRegistry {
    let mut adapters: HashMap<ProviderName, Arc<dyn ProviderAdapter>> = HashMap::new();
    adapters.insert(
        ProviderName::Codex,
        Arc::new(CodexAdapter::new(fixture_enabled(ProviderName::Codex))),
    );
    adapters.insert(
        ProviderName::Claude,
        Arc::new(ClaudeAdapter::new(fixture_enabled(ProviderName::Claude))),
    );
    adapters.insert(ProviderName::Cursor, Arc::new(CursorAdapter));

    ProviderRegistry::new(adapters, [ProviderName::Codex, ProviderName::Claude])
}
