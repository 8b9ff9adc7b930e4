//! Grant matcher
//!
//! Grants are declarative permission documents built once at load time
//! and immutable afterwards. Each grant carries six capability flags
//! plus optional type/field filters and an optional `who` group. The
//! matcher answers one question: does this grant apply to this
//! resource-and-session pair? Callers OR the answers across all grants
//! per action.

use crate::session::Session;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Grant construction errors
#[derive(Error, Debug)]
pub enum GrantError {
    #[error("grant must have an id: {0}")]
    MissingId(Value),
}

/// The actions a grant can permit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateResource,
    ReadResource,
    UpdateResource,
    DeleteResource,
    ReadField,
    WriteField,
}

/// Session context a grant is evaluated against. Holds the same shared
/// session handle the rest of the request sees, so the memoized user
/// load is shared too.
#[derive(Default, Clone)]
pub struct Context {
    pub session: Option<Arc<Session>>,
}

impl Context {
    /// Context with no session (anonymous request)
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_session(session: Arc<Session>) -> Self {
        Self {
            session: Some(session),
        }
    }
}

/// One declarative grant, built from a JSON:API resource document
#[derive(Debug, Clone)]
pub struct Grant {
    pub id: String,
    pub may_create_resource: bool,
    pub may_read_resource: bool,
    pub may_update_resource: bool,
    pub may_delete_resource: bool,
    pub may_read_field: bool,
    pub may_write_field: bool,
    pub group_id: Option<String>,
    pub types: Option<Vec<String>>,
    pub fields: Option<Vec<String>>,
}

impl Grant {
    /// Build a grant from its source document. Capability flags default
    /// to false when absent; the id is mandatory.
    pub fn new(document: &Value) -> Result<Self, GrantError> {
        let id = document
            .get("id")
            .and_then(crate::json_id)
            .ok_or_else(|| GrantError::MissingId(document.clone()))?;

        let attrs = document.get("attributes");
        let flag = |name: &str| -> bool {
            attrs
                .and_then(|a| a.get(name))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };

        let rels = document.get("relationships");
        let related_ids = |name: &str| -> Option<Vec<String>> {
            let data = rels?.get(name)?.get("data")?.as_array()?;
            Some(
                data.iter()
                    .filter_map(|entry| entry.get("id").and_then(crate::json_id))
                    .collect(),
            )
        };
        let group_id = rels
            .and_then(|r| r.get("who"))
            .and_then(|who| who.get("data"))
            .and_then(|data| data.get("id"))
            .and_then(crate::json_id);

        Ok(Self {
            id,
            may_create_resource: flag("may-create-resource"),
            may_read_resource: flag("may-read-resource"),
            may_update_resource: flag("may-update-resource"),
            may_delete_resource: flag("may-delete-resource"),
            may_read_field: flag("may-read-field"),
            may_write_field: flag("may-write-field"),
            group_id,
            types: related_ids("types"),
            fields: related_ids("fields"),
        })
    }

    /// Whether this grant's capability flag for `action` is set
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::CreateResource => self.may_create_resource,
            Action::ReadResource => self.may_read_resource,
            Action::UpdateResource => self.may_update_resource,
            Action::DeleteResource => self.may_delete_resource,
            Action::ReadField => self.may_read_field,
            Action::WriteField => self.may_write_field,
        }
    }

    /// Whether this grant applies to the given resource and session.
    ///
    /// A grant with no group applies to everyone. A grouped grant
    /// applies only when the session's user loads successfully and its
    /// id string-equals the group id - a failed load means the grant
    /// simply does not match, never an error.
    pub async fn matches(&self, document: &Value, context: &Context) -> bool {
        let matches = match &self.group_id {
            None => true,
            Some(group_id) => match &context.session {
                None => false,
                Some(session) => match session.load_user().await {
                    Ok(user) => member_check(&user, group_id),
                    Err(_) => false,
                },
            },
        };
        trace!(
            grant = %self.id,
            group = self.group_id.as_deref().unwrap_or("<everyone>"),
            document = %document,
            matches,
            "testing grant"
        );
        matches
    }
}

/// Group membership is single-id string equality; no broader group data
/// model exists in this core.
fn member_check(user: &Value, group_id: &str) -> bool {
    user.get("data")
        .and_then(|data| data.get("id"))
        .and_then(crate::json_id)
        .is_some_and(|id| id == group_id)
}

/// OR across all grants: does any grant carrying the capability also
/// match this resource and session?
pub async fn any_grant_allows(
    grants: &[Grant],
    action: Action,
    document: &Value,
    context: &Context,
) -> bool {
    for grant in grants {
        if grant.allows(action) && grant.matches(document, context).await {
            return true;
        }
    }
    false
}
