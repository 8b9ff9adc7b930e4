//! User store adapter
//!
//! The contract the session and grant layers consume for reading and
//! writing user resources. Real deployments implement [`UserStore`]
//! over their data layer; the bundled [`MemoryStore`] backs tests,
//! demos and single-process setups.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Storage-related errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Resource not found: {type_}/{id}")]
    NotFound { type_: String, id: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Trait for user resource storage backends.
///
/// Documents are full JSON:API documents (`{"data": {id, type,
/// attributes}}`). A single `create` or `update` call is atomic; any
/// coordination beyond that belongs to the implementation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user document by type and id
    async fn find(&self, type_: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Create a user resource, assigning an id when the document has none.
    /// Returns the stored document.
    async fn create(&self, type_: &str, document: &Value) -> Result<Value, StoreError>;

    /// Merge the document's attributes into an existing resource.
    /// Returns the updated document.
    async fn update(&self, type_: &str, id: &str, document: &Value) -> Result<Value, StoreError>;
}

/// Lookup by attribute value, consumed by authenticators that resolve
/// users from credentials (e.g. by email). This is the query interface
/// of the search subsystem; the full engine lives outside this crate.
#[async_trait]
pub trait UserSearch: Send + Sync {
    /// Find the first user of `type_` whose attribute equals `value`
    async fn find_by_attribute(
        &self,
        type_: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Option<Value>, StoreError>;
}
