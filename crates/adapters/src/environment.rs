//! Environment lookups backed by the current process.

use build_metrics_ports::EnvironmentPort;
use std::collections::BTreeMap;

/// Reads variables from the process environment, with optional overrides.
///
/// Overrides win over the process values; non-UTF-8 values read as unset.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvironment {
    overrides: BTreeMap<String, String>,
}

impl ProcessEnvironment {
    /// Plain process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shadow process variables with explicit values.
    #[must_use]
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (String, String)>) -> Self {
        self.overrides.extend(overrides);
        self
    }
}

impl EnvironmentPort for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(name) {
            return Some(value.clone());
        }
        std::env::var(name).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_shadow_process_values() {
        let env = ProcessEnvironment::new()
            .with_overrides([("PATH".to_owned(), "/opt/ci/bin".to_owned())]);
        assert_eq!(env.var("PATH").as_deref(), Some("/opt/ci/bin"));
        assert_eq!(env.var("BMP_SURELY_UNSET_VARIABLE_42"), None);
    }
}
