//! Raw configuration types for TOML parsing

use super::{
    Config, ConfigError, DataSourceConfig, ServerConfig, TokenConfig, DEFAULT_TOKEN_TTL_SECS,
};
use crate::grant::Grant;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;

/// Raw configuration as parsed from TOML
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub server: Option<RawServerConfig>,
    pub token: Option<RawTokenConfig>,
    #[serde(default)]
    pub data_sources: Vec<RawDataSource>,
    #[serde(default)]
    pub grants: Vec<toml::Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawServerConfig {
    pub bind: Option<String>,
}

impl From<RawServerConfig> for ServerConfig {
    fn from(raw: RawServerConfig) -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind: raw.bind.unwrap_or(defaults.bind),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawTokenConfig {
    pub secret: Option<String>,
    pub ttl_secs: Option<i64>,
}

impl From<RawTokenConfig> for TokenConfig {
    fn from(raw: RawTokenConfig) -> Self {
        Self {
            secret: raw.secret.map(SecretString::from),
            ttl_secs: raw.ttl_secs.unwrap_or(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawDataSource {
    pub id: String,
    pub source_type: String,
    pub user_template: Option<String>,
    #[serde(default)]
    pub may_create_user: bool,
    #[serde(default)]
    pub may_update_user: bool,
    pub params: Option<toml::Value>,
}

impl TryFrom<RawDataSource> for DataSourceConfig {
    type Error = ConfigError;

    fn try_from(raw: RawDataSource) -> Result<Self, Self::Error> {
        let params = match raw.params {
            Some(params) => to_json(&params)?,
            None => Value::Object(Default::default()),
        };
        Ok(Self {
            id: raw.id,
            source_type: raw.source_type,
            user_template: raw.user_template,
            may_create_user: raw.may_create_user,
            may_update_user: raw.may_update_user,
            params,
        })
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let sources = raw
            .data_sources
            .into_iter()
            .map(DataSourceConfig::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let grants = raw
            .grants
            .iter()
            .map(|document| {
                let document = to_json(document)?;
                Grant::new(&document).map_err(|err| ConfigError::Invalid(err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            server: raw.server.unwrap_or_default().into(),
            token: raw.token.unwrap_or_default().into(),
            sources,
            grants,
        })
    }
}

fn to_json(value: &toml::Value) -> Result<Value, ConfigError> {
    serde_json::to_value(value).map_err(|err| ConfigError::Invalid(err.to_string()))
}
