//! Adapter registry and enablement.

use crate::adapter::ProviderAdapter;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uipin_core::ProviderName;

/// Maps provider names to adapters and tracks which are enabled. A
/// registered-but-disabled provider is distinguishable from an unknown
/// one so callers can report a precise error.
pub struct ProviderRegistry {
    adapters: HashMap<ProviderName, Arc<dyn ProviderAdapter>>,
    enabled: HashSet<ProviderName>,
}

impl ProviderRegistry {
    pub fn new(
        adapters: HashMap<ProviderName, Arc<dyn ProviderAdapter>>,
        enabled: impl IntoIterator<Item = ProviderName>,
    ) -> Self {
        Self {
            adapters,
            enabled: enabled.into_iter().collect(),
        }
    }

    pub fn get(&self, name: ProviderName) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&name).cloned()
    }

    pub fn is_enabled(&self, name: ProviderName) -> bool {
        self.enabled.contains(&name)
    }

    pub fn enabled_providers(&self) -> Vec<ProviderName> {
        let mut names: Vec<_> = self.enabled.iter().copied().collect();
        names.sort_by_key(|name| name.as_str());
        names
    }
}
