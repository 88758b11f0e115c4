//! Migrator configuration.
//!
//! Every setting is optional. A config file mirrors the struct layout:
//!
//! ```toml
//! type_field = "kind"
//! parallel_limit = 4
//!
//! [versions]
//! article = 2
//! comment = 1
//! ```
//!
//! When a `[versions]` table is present, latest versions come from it and the
//! store is never asked for counter records.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_PARALLEL_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratorConfig {
    /// Document field naming the migration family.
    #[serde(default = "default_type_field")]
    pub type_field: String,
    /// Document field holding the schema version.
    #[serde(default = "default_version_field")]
    pub version_field: String,
    /// Joins the type and version field name into a counter record key.
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Field of the counter record that holds the latest version.
    #[serde(default = "default_counter_field")]
    pub counter_field: String,
    /// Static latest-version table. Disables store-backed lookups.
    #[serde(default)]
    pub versions: Option<BTreeMap<String, u64>>,
    /// Selects which link-time registered migrations are visible.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Maximum number of document upgrades in flight during a batch.
    #[serde(default = "default_parallel_limit")]
    pub parallel_limit: usize,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            type_field: default_type_field(),
            version_field: default_version_field(),
            separator: default_separator(),
            counter_field: default_counter_field(),
            versions: None,
            namespace: default_namespace(),
            parallel_limit: default_parallel_limit(),
        }
    }
}

fn default_type_field() -> String {
    "type".to_string()
}

fn default_version_field() -> String {
    "version".to_string()
}

fn default_separator() -> String {
    "::".to_string()
}

fn default_counter_field() -> String {
    "current".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_parallel_limit() -> usize {
    DEFAULT_PARALLEL_LIMIT
}

impl MigratorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn with_static_versions<I, K>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        self.versions = Some(versions.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    pub fn with_parallel_limit(mut self, limit: usize) -> Self {
        self.parallel_limit = limit;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "parallel_limit",
                reason: "must be at least 1",
            });
        }
        let named = [
            ("type_field", &self.type_field),
            ("version_field", &self.version_field),
            ("separator", &self.separator),
            ("counter_field", &self.counter_field),
        ];
        for (field, value) in named {
            if value.is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty",
                });
            }
        }
        Ok(())
    }
}
