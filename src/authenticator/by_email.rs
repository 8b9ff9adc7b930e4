//! Email lookup authenticator
//!
//! Resolves `{"email": ...}` payloads by searching the user store for a
//! matching email attribute. The user type is configurable per source
//! via `params.type`.

use super::{public_params, AuthenticationResult, Authenticator};
use crate::store::UserSearch;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

const DEFAULT_USER_TYPE: &str = "users";

pub struct ByEmailAuthenticator {
    search: Arc<dyn UserSearch>,
}

impl ByEmailAuthenticator {
    pub fn new(search: Arc<dyn UserSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Authenticator for ByEmailAuthenticator {
    fn name(&self) -> &str {
        "by-email"
    }

    async fn resolve(&self, payload: &Value, params: &Value) -> AuthenticationResult {
        let Some(email) = payload.get("email").and_then(Value::as_str) else {
            return AuthenticationResult::Rejected;
        };
        let user_type = params
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_USER_TYPE);

        match self.search.find_by_attribute(user_type, "email", email).await {
            Ok(Some(document)) => AuthenticationResult::Accepted(document),
            Ok(None) => AuthenticationResult::Rejected,
            Err(err) => {
                warn!("by-email lookup failed: {}", err);
                AuthenticationResult::Rejected
            }
        }
    }

    fn exposed_config(&self, params: &Value) -> Value {
        public_params(params)
    }
}
