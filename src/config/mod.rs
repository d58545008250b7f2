//! Configuration loading and management
//!
//! The server reads one YAML document:
//!
//! ```yaml
//! server:
//!   bind_address: "0.0.0.0:3000"
//!   log_level: info
//! pagination:
//!   default_limit: 25
//!   max_limit: 500
//! cache:
//!   enabled: true
//!   ttl_seconds: 30
//!   key_mode: per_query
//! database:
//!   url: postgres://localhost/eduapi
//!   max_connections: 10
//! resources:
//!   gradingPeriods:
//!     default_limit: 50
//! ```
//!
//! Every section is optional; missing values take the defaults below.

use crate::core::cache::CacheKeyMode;
use crate::core::error::{ApiResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "EDUAPI_CONFIG";

/// Configuration file used when the variable is unset
pub const DEFAULT_CONFIG_PATH: &str = "eduapi.yaml";

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Listing window limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 25,
            max_limit: 500,
        }
    }
}

/// Read cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub key_mode: CacheKeyMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 30,
            key_mode: CacheKeyMode::PerQuery,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Relational store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Per-resource overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub default_limit: Option<usize>,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub pagination: PaginationConfig,
    pub cache: CacheConfig,
    /// Absent: records are kept in memory
    pub database: Option<DatabaseConfig>,
    /// Keyed by collection name
    pub resources: HashMap<String, ResourceConfig>,
}

impl ApiConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, Some(path.display().to_string()))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> ApiResult<Self> {
        Self::parse(yaml, None)
    }

    /// Load from `EDUAPI_CONFIG` (or `eduapi.yaml`), defaults when the file is missing
    pub fn from_env() -> ApiResult<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        if Path::new(&path).exists() {
            Self::from_yaml_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn parse(yaml: &str, file: Option<String>) -> ApiResult<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.max_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pagination.max_limit".to_string(),
                value: "0".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.pagination.default_limit > self.pagination.max_limit {
            return Err(ConfigError::InvalidValue {
                field: "pagination.default_limit".to_string(),
                value: self.pagination.default_limit.to_string(),
                message: format!("must not exceed max_limit ({})", self.pagination.max_limit),
            });
        }
        if self
            .database
            .as_ref()
            .is_some_and(|database| database.url.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "database.url".to_string(),
                value: String::new(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Page size for a resource when the caller gives no `limit`
    ///
    /// The per-resource override wins over the resource's built-in default,
    /// which wins over `pagination.default_limit`; the result is capped by
    /// `pagination.max_limit`.
    pub fn default_limit_for(&self, resource: &str, builtin: Option<usize>) -> usize {
        self.resources
            .get(resource)
            .and_then(|r| r.default_limit)
            .or(builtin)
            .unwrap_or(self.pagination.default_limit)
            .min(self.pagination.max_limit)
    }
}
