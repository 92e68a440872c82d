//! Document store access.
//!
//! # Data Flow
//! ```text
//! verifier probe
//!     → DocumentStore::get       (fetch one document by id)
//!     → DocumentStore::query_eq  (equality filters, AND-combined)
//!     → memory.rs | firestore.rs
//! ```
//!
//! # Design Decisions
//! - Read-only contract: the verifier never writes, so the trait exposes no
//!   mutation (the in-memory store has inherent setters for tests)
//! - Documents are plain JSON field maps; typed store values are decoded at
//!   the adapter boundary

pub mod firestore;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use firestore::FirestoreStore;
pub use memory::InMemoryStore;

/// Snapshot of a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document ID within its collection.
    pub id: String,
    /// Top-level fields.
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a document from a JSON object literal. Non-object values yield an
    /// empty field map.
    pub fn from_json(id: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Boolean field, `None` when missing or not a boolean.
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// String field, `None` when missing, null or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Whether `field` holds exactly `value`.
    pub fn field_equals(&self, field: &str, value: &Value) -> bool {
        self.get(field) == Some(value)
    }
}

/// One equality constraint of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.field_equals(&self.field, &self.value)
    }
}

/// Errors from a store read. All of them are treated as transient by the
/// poll loop.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or request failure.
    #[error("store transport error: {0}")]
    Transport(String),

    /// The store did not answer in time.
    #[error("store request timed out after {0:?}")]
    Timeout(Duration),

    /// The store answered with a non-success status.
    #[error("store returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response could not be decoded.
    #[error("store response decode error: {0}")]
    Decode(String),

    /// The store is not reachable in this configuration.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Read side of a hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Documents of `collection` matching every filter.
    async fn query_eq(&self, collection: &str, filters: &[FieldFilter]) -> StoreResult<Vec<Document>>;
}
