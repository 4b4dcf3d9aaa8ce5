//! Document store collaborators.
//!
//! The reconciler only needs three operations from a collection: equality
//! query, get by id, and partial update by id. [`DocumentStore`] captures
//! exactly that so the redb-backed [`Collection`] and the in-memory
//! [`MemoryStore`] are interchangeable.

pub mod db;
pub mod memory;

pub use self::db::{Collection, RedbStore};
pub use self::memory::MemoryStore;

use crate::document::{Document, Fields};
use crate::error::Result;
use serde_json::Value;

pub trait DocumentStore {
    /// Collection name, used in log fields and error messages.
    fn name(&self) -> &str;

    /// All documents whose `field` equals `value`, in id order.
    fn find_eq(&self, field: &str, value: &Value, limit: Option<usize>) -> Result<Vec<Document>>;

    fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Merge `patch` into the document's fields.
    ///
    /// Fails with `DocumentNotFound` when `id` does not exist; never creates.
    fn update(&self, id: &str, patch: &Fields) -> Result<()>;
}

/// Shared filter used by both store implementations.
pub(crate) fn matches_eq(fields: &Fields, field: &str, value: &Value) -> bool {
    fields.get(field) == Some(value)
}
