use anyhow::{Context, Result};
use docshift::{Migrator, MigratorConfig, RedisStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "docshift.toml";

/// Configuration stored in docshift.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocshiftConfig {
    #[serde(default)]
    pub migrator: MigratorConfig,
    #[serde(default)]
    pub redis: RedisSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Namespace prepended to every key as `prefix:key`
    #[serde(default)]
    pub prefix: Option<String>,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            prefix: None,
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

/// Resolved CLI context: configuration plus connection overrides
pub struct CliContext {
    pub config_path: Option<PathBuf>,
    pub config: DocshiftConfig,
    redis_url_override: Option<String>,
}

impl CliContext {
    /// Load the explicit config file, or `docshift.toml` from the current
    /// directory when it exists, or defaults.
    pub fn load(explicit: Option<&Path>, redis_url_override: Option<String>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(DEFAULT_CONFIG_FILE);
                candidate.exists().then_some(candidate)
            }
        };

        let config = match &config_path {
            Some(path) => Self::read_config(path)?,
            None => DocshiftConfig::default(),
        };

        Ok(Self {
            config_path,
            config,
            redis_url_override,
        })
    }

    fn read_config(path: &Path) -> Result<DocshiftConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: DocshiftConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .migrator
            .validate()
            .with_context(|| format!("Invalid [migrator] section in {}", path.display()))?;
        Ok(config)
    }

    /// Get the Redis URL, expanding environment variables
    pub fn redis_url(&self) -> Result<String> {
        if let Some(url) = &self.redis_url_override {
            return Ok(url.clone());
        }

        let url = self.config.redis.url.as_str();
        if url.starts_with("${") && url.ends_with('}') {
            let var_name = &url[2..url.len() - 1];
            std::env::var(var_name).with_context(|| format!("Environment variable {var_name} not set"))
        } else {
            Ok(url.to_string())
        }
    }

    pub async fn connect(&self) -> Result<RedisStore> {
        let redis_url = self.redis_url().context("Set REDIS_URL or [redis] url to connect to Redis")?;
        let store = RedisStore::connect(&redis_url)
            .await
            .context("Failed to connect to Redis")?;
        Ok(match &self.config.redis.prefix {
            Some(prefix) => store.with_prefix(prefix.clone()),
            None => store,
        })
    }

    pub fn migrator(&self, store: &RedisStore) -> Result<Migrator> {
        Migrator::builder(Arc::new(store.clone()))
            .config(self.config.migrator.clone())
            .build()
            .context("Failed to build migrator")
    }
}
