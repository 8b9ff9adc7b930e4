//! In-memory user store

use super::{StoreError, UserSearch, UserStore};
use crate::json_id;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// User storage backed by a process-local map. Each call takes the
/// lock once, which gives the per-call atomicity the session manager
/// relies on.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<(String, String), Value>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user document directly, bypassing creation policy.
    /// Intended for wiring fixtures and initial data.
    pub fn seed(&self, type_: &str, id: &str, attributes: Value) {
        let document = json!({
            "data": {
                "id": id,
                "type": type_,
                "attributes": attributes,
            }
        });
        self.users
            .write()
            .insert((type_.to_string(), id.to_string()), document);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find(&self, type_: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let users = self.users.read();
        Ok(users.get(&(type_.to_string(), id.to_string())).cloned())
    }

    async fn create(&self, type_: &str, document: &Value) -> Result<Value, StoreError> {
        let data = document
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| StoreError::InvalidDocument("missing data object".to_string()))?;

        let id = match data.get("id").and_then(json_id) {
            Some(id) if !id.is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };
        let attributes = data.get("attributes").cloned().unwrap_or_else(|| json!({}));
        let stored = json!({
            "data": {
                "id": id,
                "type": type_,
                "attributes": attributes,
            }
        });

        let mut users = self.users.write();
        users.insert((type_.to_string(), id), stored.clone());
        Ok(stored)
    }

    async fn update(&self, type_: &str, id: &str, document: &Value) -> Result<Value, StoreError> {
        let mut users = self.users.write();
        let stored = users
            .get_mut(&(type_.to_string(), id.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                type_: type_.to_string(),
                id: id.to_string(),
            })?;

        if let Some(incoming) = document
            .get("data")
            .and_then(|data| data.get("attributes"))
            .and_then(Value::as_object)
        {
            let attributes = stored
                .get_mut("data")
                .and_then(|data| data.get_mut("attributes"))
                .and_then(Value::as_object_mut)
                .ok_or_else(|| StoreError::InvalidDocument("stored document has no attributes".to_string()))?;
            for (key, value) in incoming {
                attributes.insert(key.clone(), value.clone());
            }
        }
        Ok(stored.clone())
    }
}

#[async_trait]
impl UserSearch for MemoryStore {
    async fn find_by_attribute(
        &self,
        type_: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Option<Value>, StoreError> {
        let users = self.users.read();
        Ok(users
            .iter()
            .find(|((t, _), document)| {
                t == type_
                    && document
                        .get("data")
                        .and_then(|data| data.get("attributes"))
                        .and_then(|attrs| attrs.get(attribute))
                        .and_then(Value::as_str)
                        == Some(value)
            })
            .map(|(_, document)| document.clone()))
    }
}
