//! References to secrets managed outside this repository.
//!
//! Secrets are referenced by name only. Their values are resolved by the
//! provider at deploy or build time and never pass through this codebase.

use serde::{Deserialize, Serialize};

/// A named secret in the provider's secret store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretRef {
    name: String,
}

impl SecretRef {
    pub fn from_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Dynamic reference to the whole secret string, resolved at deploy time.
    pub fn value(&self) -> String {
        format!("{{{{resolve:secretsmanager:{}:SecretString:::}}}}", self.name)
    }

    /// Buildspec `secrets-manager` entry, resolved by the build service at
    /// build time. An empty key selects the whole secret.
    pub fn build_env_entry(&self, key: &str) -> String {
        if key.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.name, key)
        }
    }
}
