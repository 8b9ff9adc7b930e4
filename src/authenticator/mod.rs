//! Authenticator plugin protocol
//!
//! Every pluggable authenticator implements [`Authenticator`]: it takes
//! an arbitrary credential payload plus its data-source params and
//! resolves them to an [`AuthenticationResult`]. Control flow is a
//! tagged sum, not errors - callers branch exhaustively.
//!
//! Built-in modules:
//! - `echo`: trusted passthrough of the payload
//! - `config-echo`: returns a document fixed in the source params
//! - `by-email`: looks the user up in the store by email attribute

mod by_email;
mod config_echo;
mod echo;

pub use by_email::ByEmailAuthenticator;
pub use config_echo::ConfigEchoAuthenticator;
pub use echo::EchoAuthenticator;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One entry of a module-signaled validation failure, surfaced to the
/// caller verbatim as a 400 error document.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
}

impl ValidationDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            pointer: None,
        }
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = Some(pointer.into());
        self
    }
}

/// Outcome of one authenticator invocation
#[derive(Debug, Clone)]
pub enum AuthenticationResult {
    /// A JSON:API document identifying or describing the user
    Accepted(Value),
    /// Multi-step authentication not yet complete; echoed back to the
    /// caller without a token
    PartialSession { data: Value, meta: Value },
    /// No usable user - surfaced as an authentication failure (401)
    Rejected,
    /// The module judged the input grossly malformed - surfaced as 400
    /// with the module's detail entries
    ValidationFailure(Vec<ValidationDetail>),
}

/// Trait for authenticator modules
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Unique module name, referenced by data-source `source_type`
    fn name(&self) -> &str;

    /// Resolve a credential payload to a candidate user.
    ///
    /// Implementations signal failure through the result variants; an
    /// internal fault should come back as `Rejected`, never a panic.
    async fn resolve(&self, payload: &Value, params: &Value) -> AuthenticationResult;

    /// Template applied when the data source configures none
    fn default_template(&self) -> Option<&str> {
        None
    }

    /// Non-secret subset of the source params, served to unauthenticated
    /// GET probes. Exposure is opt-in; the default exposes nothing.
    fn exposed_config(&self, _params: &Value) -> Value {
        json!({})
    }
}

/// Filter a params object down to its publicly exposable subset.
///
/// A top-level `hidden = true` hides everything. Sub-keys whose object
/// value carries `hidden: true` are dropped, and `hidden` markers are
/// never exposed themselves.
pub fn public_params(params: &Value) -> Value {
    let Some(object) = params.as_object() else {
        return json!({});
    };
    if object.get("hidden").and_then(Value::as_bool) == Some(true) {
        return json!({});
    }
    let mut exposed = Map::new();
    for (key, value) in object {
        if key == "hidden" {
            continue;
        }
        if value.get("hidden").and_then(Value::as_bool) == Some(true) {
            continue;
        }
        exposed.insert(key.clone(), value.clone());
    }
    Value::Object(exposed)
}

/// Registry of available authenticator modules
pub struct AuthenticatorRegistry {
    modules: RwLock<HashMap<String, Arc<dyn Authenticator>>>,
}

impl AuthenticatorRegistry {
    /// Create a registry with the store-independent built-ins
    pub fn new() -> Self {
        let registry = Self {
            modules: RwLock::new(HashMap::new()),
        };
        registry.register(Arc::new(EchoAuthenticator));
        registry.register(Arc::new(ConfigEchoAuthenticator));
        registry
    }

    /// Register a module under its name. Later registrations win.
    pub fn register(&self, module: Arc<dyn Authenticator>) {
        let mut modules = self.modules.write();
        modules.insert(module.name().to_string(), module);
    }

    /// Look up a module by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Authenticator>> {
        let modules = self.modules.read();
        modules.get(name).cloned()
    }

    /// Names of all registered modules
    pub fn names(&self) -> Vec<String> {
        let modules = self.modules.read();
        modules.keys().cloned().collect()
    }
}

impl Default for AuthenticatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
