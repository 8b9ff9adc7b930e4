//! Hubgate - the authentication and authorization core of a content hub
//!
//! Hubgate issues and validates bearer session tokens, delegates
//! credential checks to pluggable authenticator modules, and governs
//! per-resource access through declarative grants.

pub mod authenticator;
pub mod config;
pub mod grant;
pub mod session;
pub mod store;
pub mod template;
pub mod token;
pub mod web;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Core error types for Hubgate
#[derive(Error, Debug)]
pub enum HubgateError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Grant error: {0}")]
    Grant(#[from] grant::GrantError),

    #[error("Authentication error: {0}")]
    Auth(#[from] session::AuthFlowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A reference to a single user resource: its content type plus id.
///
/// This is the only identity a session carries; the full user document
/// is loaded lazily from the user store when something needs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
}

impl ResourceRef {
    /// Create a new resource reference
    pub fn new(type_: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            id: id.into(),
        }
    }

    /// Extract a reference from a JSON:API document (`{"data": {...}}`)
    pub fn from_document(document: &Value) -> Option<Self> {
        Self::from_resource(document.get("data")?)
    }

    /// Extract a reference from a bare resource object (`{"id": ..., "type": ...}`)
    ///
    /// Ids may arrive as JSON numbers from upstream identity providers;
    /// they are always carried as strings internally.
    pub fn from_resource(resource: &Value) -> Option<Self> {
        let type_ = resource.get("type")?.as_str()?.to_string();
        let id = json_id(resource.get("id")?)?;
        Some(Self { type_, id })
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.type_, self.id)
    }
}

/// Normalize a JSON id value (string or number) to a string.
pub(crate) fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
