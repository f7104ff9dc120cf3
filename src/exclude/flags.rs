use std::collections::BTreeMap;

/// Boolean lookups by name, provided by whatever evaluates feature flags.
pub trait FeatureFlags: Send + Sync {
    /// Unknown flags are disabled.
    fn is_enabled(&self, name: &str) -> bool;
}

/// Flags read from the `[features]` section of the config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlagSet {
    flags: BTreeMap<String, bool>,
}

impl FeatureFlagSet {
    pub fn new(flags: BTreeMap<String, bool>) -> Self {
        Self { flags }
    }

    pub fn with(mut self, name: &str, enabled: bool) -> Self {
        self.flags.insert(name.to_string(), enabled);
        self
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }
}

impl FeatureFlags for FeatureFlagSet {
    fn is_enabled(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }
}
