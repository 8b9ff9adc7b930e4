//! Process configuration
//!
//! Everything the hub needs at startup comes from one TOML file: the
//! token signing secret and TTL, the bind address, the data-source
//! table, and the grant documents. Loaded once; the resulting values
//! are read-only for the lifetime of the process.

mod types;

use crate::grant::Grant;
use secrecy::SecretString;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use types::RawConfig;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Default token lifetime: one day
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// Typed process configuration
pub struct Config {
    pub server: ServerConfig,
    pub token: TokenConfig,
    pub sources: Vec<DataSourceConfig>,
    pub grants: Vec<Grant>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

pub struct TokenConfig {
    /// Signing secret. Absent means a throwaway key is generated at
    /// startup and every issued token dies with the process.
    pub secret: Option<SecretString>,
    pub ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }
}

/// Per-authenticator data-source configuration
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    pub id: String,
    /// Name of the authenticator module handling this source
    pub source_type: String,
    /// Identity template rewriting what the module resolves
    pub user_template: Option<String>,
    /// Whether authentication may create missing users
    pub may_create_user: bool,
    /// Whether authentication may update existing users
    pub may_update_user: bool,
    /// Module-specific parameters; sub-keys marked `hidden` stay out
    /// of the public config exposure
    pub params: Value,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        raw.try_into()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            token: TokenConfig::default(),
            sources: Vec::new(),
            grants: Vec::new(),
        }
    }
}
