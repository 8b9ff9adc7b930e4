//! Trusted passthrough authenticator
//!
//! Returns the inbound payload verbatim as the candidate user. Useful
//! behind an upstream that already authenticated the request (a gateway
//! or SSO proxy), and as the base module for template-driven sources.

use super::{AuthenticationResult, Authenticator};
use async_trait::async_trait;
use serde_json::Value;

pub struct EchoAuthenticator;

#[async_trait]
impl Authenticator for EchoAuthenticator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn resolve(&self, payload: &Value, _params: &Value) -> AuthenticationResult {
        if payload
            .get("meta")
            .and_then(|meta| meta.get("partial-session"))
            .and_then(Value::as_bool)
            == Some(true)
        {
            return AuthenticationResult::PartialSession {
                data: payload.get("data").cloned().unwrap_or(Value::Null),
                meta: payload["meta"].clone(),
            };
        }
        AuthenticationResult::Accepted(payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_echoes_payload() {
        let payload = json!({"data": {"id": "quint", "type": "test-users"}});
        match EchoAuthenticator.resolve(&payload, &json!({})).await {
            AuthenticationResult::Accepted(doc) => assert_eq!(doc, payload),
            other => panic!("expected Accepted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_session_marker() {
        let payload = json!({
            "data": {"type": "test-users", "attributes": {"state": "i-am-partial"}},
            "meta": {"partial-session": true},
        });
        match EchoAuthenticator.resolve(&payload, &json!({})).await {
            AuthenticationResult::PartialSession { data, meta } => {
                assert_eq!(data["attributes"]["state"], "i-am-partial");
                assert_eq!(meta["partial-session"], true);
            }
            other => panic!("expected PartialSession, got {:?}", other),
        }
    }
}
