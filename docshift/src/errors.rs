use std::borrow::Cow;

use thiserror::Error;

/// Opaque error produced by migration functions and fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type returned by upgrades and batch runs.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A migration function reported failure for one step.
    #[error("migration {doc_type} v{version} failed: {source}")]
    Migration {
        doc_type: String,
        version: u64,
        #[source]
        source: BoxError,
    },

    /// No migration function is registered for a step the chain needs.
    #[error("no migration registered for {doc_type} v{version}")]
    MissingMigration { doc_type: String, version: u64 },

    /// Saving a migrated document failed.
    #[error("failed to persist document '{key}': {source}")]
    Persistence {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The batch fetcher could not list documents.
    #[error("failed to fetch documents: {0}")]
    Fetch(#[source] BoxError),

    /// Configuration rejected when building a migrator.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: Cow<'static, str> },
}

impl MigrateError {
    /// Version step the error is attributed to, when it belongs to a step.
    pub fn failed_version(&self) -> Option<u64> {
        match self {
            Self::Migration { version, .. } | Self::MissingMigration { version, .. } => Some(*version),
            _ => None,
        }
    }
}

impl From<ConfigError> for MigrateError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig {
            message: Cow::Owned(err.to_string()),
        }
    }
}

/// Errors raised by document store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Stored value could not be encoded or decoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value exists but is not a JSON object.
    #[error("value at '{key}' is not a document")]
    NotADocument { key: String },

    /// Any other adapter failure.
    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for `MigratorConfig`.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting parsed but holds an unusable value.
    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}
