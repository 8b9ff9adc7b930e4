//! Configuration-backed authenticator
//!
//! Ignores the inbound payload entirely and returns the document fixed
//! under the data source's `params.data`. One module can back any
//! number of sources with different configs - handy for development
//! logins and kiosk-style fixed identities.

use super::{public_params, AuthenticationResult, Authenticator};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct ConfigEchoAuthenticator;

#[async_trait]
impl Authenticator for ConfigEchoAuthenticator {
    fn name(&self) -> &str {
        "config-echo"
    }

    async fn resolve(&self, _payload: &Value, params: &Value) -> AuthenticationResult {
        match params.get("data") {
            Some(data) => AuthenticationResult::Accepted(json!({ "data": data.clone() })),
            None => AuthenticationResult::Rejected,
        }
    }

    fn exposed_config(&self, params: &Value) -> Value {
        public_params(params)
    }
}
