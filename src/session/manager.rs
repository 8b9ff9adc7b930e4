//! Session manager: token issuance and the authenticator flow
//!
//! Consumes [`AuthenticationResult`]s from the registry and drives the
//! preloaded / existing-user / create-user paths, converging on a
//! signed token attached to the user document. Also turns inbound
//! `Authorization` headers into request-scoped [`Session`]s.

use super::Session;
use crate::authenticator::{
    AuthenticationResult, Authenticator, AuthenticatorRegistry, ValidationDetail,
};
use crate::config::DataSourceConfig;
use crate::store::UserStore;
use crate::template;
use crate::token::{IssuedToken, TokenCodec};
use crate::{json_id, ResourceRef};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Failures of the authentication flow. The web layer maps these to
/// statuses; nothing here ever becomes a 500.
#[derive(Error, Debug)]
pub enum AuthFlowError {
    #[error("Did not locate authentication source \"{0}\"")]
    SourceNotFound(String),

    #[error("authentication rejected")]
    Rejected,

    #[error("authenticator reported invalid input")]
    Validation(Vec<ValidationDetail>),
}

/// A successful authentication call
#[derive(Debug)]
pub enum AuthOutcome {
    /// Token issued; the document carries `data.meta.token` and
    /// `data.meta.validUntil`
    Authenticated(Value),
    /// Multi-step flow not finished; echoed verbatim, no token
    PartialSession { data: Value, meta: Value },
}

/// Orchestrates authenticator invocation, user loading and token
/// issuance. Configuration is read-only after construction.
pub struct SessionManager {
    codec: TokenCodec,
    registry: Arc<AuthenticatorRegistry>,
    sources: HashMap<String, DataSourceConfig>,
    store: Arc<dyn UserStore>,
    token_ttl: i64,
}

impl SessionManager {
    pub fn new(
        codec: TokenCodec,
        registry: Arc<AuthenticatorRegistry>,
        sources: Vec<DataSourceConfig>,
        store: Arc<dyn UserStore>,
        token_ttl: i64,
    ) -> Self {
        Self {
            codec,
            registry,
            sources: sources
                .into_iter()
                .map(|source| (source.id.clone(), source))
                .collect(),
            store,
            token_ttl,
        }
    }

    /// Run one inbound authentication call against the named source.
    pub async fn authenticate(
        &self,
        source_id: &str,
        payload: &Value,
    ) -> Result<AuthOutcome, AuthFlowError> {
        let (source, module) = self.lookup(source_id)?;

        match module.resolve(payload, &source.params).await {
            AuthenticationResult::Rejected => Err(AuthFlowError::Rejected),
            AuthenticationResult::ValidationFailure(details) => {
                Err(AuthFlowError::Validation(details))
            }
            AuthenticationResult::PartialSession { data, meta } => {
                Ok(AuthOutcome::PartialSession { data, meta })
            }
            AuthenticationResult::Accepted(resolved) => {
                self.issue(source, module.as_ref(), payload, resolved).await
            }
        }
    }

    /// The module's publicly exposed configuration for GET probes
    pub fn exposed_config(&self, source_id: &str) -> Result<Value, AuthFlowError> {
        let (source, module) = self.lookup(source_id)?;
        Ok(module.exposed_config(&source.params))
    }

    /// Build a request-scoped session from an `Authorization` header.
    ///
    /// Anything short of a valid bearer token yields an anonymous
    /// request: a missing header silently, an invalid token with a
    /// warning. Requests are never rejected here.
    pub fn session_from_header(&self, header: Option<&str>) -> Option<Session> {
        let token = bearer_token(header?)?;
        match self.codec.verify_token(token) {
            Some(verified) => Some(Session::new(
                verified.resource,
                verified.valid_until,
                self.store.clone(),
            )),
            None => {
                warn!("Ignoring invalid token");
                None
            }
        }
    }

    /// Mint a token directly for a known resource. Used by trusted
    /// internal callers; the HTTP flow always goes through
    /// [`authenticate`](Self::authenticate).
    pub fn create_token(&self, resource: &ResourceRef, ttl_secs: i64) -> IssuedToken {
        self.codec.create_token(resource, ttl_secs)
    }

    fn lookup(
        &self,
        source_id: &str,
    ) -> Result<(&DataSourceConfig, Arc<dyn Authenticator>), AuthFlowError> {
        let Some(source) = self.sources.get(source_id) else {
            warn!("Did not locate authentication source \"{}\"", source_id);
            return Err(AuthFlowError::SourceNotFound(source_id.to_string()));
        };
        let Some(module) = self.registry.get(&source.source_type) else {
            warn!(
                "Did not locate authentication source \"{}\" (module \"{}\" is not registered)",
                source_id, source.source_type
            );
            return Err(AuthFlowError::SourceNotFound(source_id.to_string()));
        };
        Ok((source, module))
    }

    /// Drive an accepted resolution through templating and the
    /// preloaded / existing-user / create-user paths.
    async fn issue(
        &self,
        source: &DataSourceConfig,
        module: &dyn Authenticator,
        payload: &Value,
        resolved: Value,
    ) -> Result<AuthOutcome, AuthFlowError> {
        let template = source
            .user_template
            .as_deref()
            .or_else(|| module.default_template());
        let document = match template {
            Some(template) => {
                let fields = template::field_map(payload, &resolved);
                template::render(template, &fields).ok_or(AuthFlowError::Rejected)?
            }
            None => resolved,
        };

        // Preloaded documents are final user state; no store access.
        if document
            .get("meta")
            .and_then(|meta| meta.get("preloaded"))
            .and_then(Value::as_bool)
            == Some(true)
        {
            let data = document.get("data").cloned().ok_or(AuthFlowError::Rejected)?;
            let resource = ResourceRef::from_resource(&data).ok_or(AuthFlowError::Rejected)?;
            return Ok(AuthOutcome::Authenticated(
                self.mint(json!({ "data": data }), &resource),
            ));
        }

        let data = document.get("data").ok_or(AuthFlowError::Rejected)?;
        let type_ = data.get("type").and_then(Value::as_str).map(str::to_string);
        // A template may deliberately omit the id to request auto-assignment.
        let id = data
            .get("id")
            .and_then(json_id)
            .filter(|id| !id.is_empty());

        let stored = match (&type_, &id) {
            (Some(type_), Some(id)) => {
                self.store
                    .find(type_, id)
                    .await
                    .map_err(reject_store_error)?
            }
            _ => None,
        };

        let final_document = match stored {
            Some(stored) => {
                let type_ = type_.as_deref().expect("stored hit implies type");
                let id = id.as_deref().expect("stored hit implies id");
                if source.may_update_user && has_attributes(data) {
                    self.store
                        .update(type_, id, &document)
                        .await
                        .map_err(reject_store_error)?
                } else {
                    // Attribute changes without may_update_user are
                    // silently dropped; the stored copy wins.
                    stored
                }
            }
            None => {
                // Creation is explicit opt-in and type is mandatory.
                let Some(type_) = type_.as_deref().filter(|_| source.may_create_user) else {
                    return Err(AuthFlowError::Rejected);
                };
                self.store
                    .create(type_, &document)
                    .await
                    .map_err(reject_store_error)?
            }
        };

        let resource =
            ResourceRef::from_document(&final_document).ok_or(AuthFlowError::Rejected)?;
        Ok(AuthOutcome::Authenticated(
            self.mint(final_document, &resource),
        ))
    }

    /// Attach `meta.token` / `meta.validUntil` to the document's data
    fn mint(&self, mut document: Value, resource: &ResourceRef) -> Value {
        let issued = self.codec.create_token(resource, self.token_ttl);
        if let Some(data) = document.get_mut("data") {
            let meta = data
                .as_object_mut()
                .map(|object| {
                    object
                        .entry("meta")
                        .or_insert_with(|| json!({}))
                })
                .and_then(Value::as_object_mut);
            if let Some(meta) = meta {
                meta.insert("token".to_string(), json!(issued.token));
                meta.insert("validUntil".to_string(), json!(issued.valid_until));
            }
        }
        document
    }
}

/// Strip the bearer scheme off an `Authorization` header value
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Store faults inside the auth flow surface as authentication
/// failures (401), never as internal errors.
fn reject_store_error(err: crate::store::StoreError) -> AuthFlowError {
    warn!("user store error during authentication: {}", err);
    AuthFlowError::Rejected
}

fn has_attributes(data: &Value) -> bool {
    data.get("attributes")
        .and_then(Value::as_object)
        .is_some_and(|attrs| !attrs.is_empty())
}
