//! Persistent document collections using redb.
//!
//! # Table design
//!
//! Each collection is its own table named after the collection:
//! ```text
//! key:   document id (&str)
//! value: JSON-encoded field map (&[u8])
//! ```
//!
//! Tables are created lazily on first write. Reading a collection that has
//! never been written returns no documents rather than an error.

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, TableError};

use crate::document::{Document, Fields};
use crate::error::{CustfixError, Result};
use crate::paths::validate_collection_name;

use super::{matches_eq, DocumentStore};

fn store_err(e: impl Display) -> CustfixError {
    CustfixError::Store(e.to_string())
}

fn table_def(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

fn decode(id: &str, bytes: &[u8]) -> Result<Document> {
    let fields: Fields = serde_json::from_slice(bytes).map_err(store_err)?;
    Ok(Document::new(id, fields))
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

/// An open database file holding any number of collections.
///
/// The handle owns the file lock; dropping it closes the database.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the redb database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        Ok(Self { db })
    }

    /// Handle to the named collection. The name is validated, not created.
    pub fn collection(&self, name: &str) -> Result<Collection<'_>> {
        validate_collection_name(name)?;
        Ok(Collection {
            db: &self.db,
            name: name.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

pub struct Collection<'db> {
    db: &'db Database,
    name: String,
}

impl Collection<'_> {
    /// Insert or fully replace a document.
    pub fn upsert(&self, doc: &Document) -> Result<()> {
        let value = serde_json::to_vec(&doc.fields).map_err(store_err)?;
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(table_def(&self.name)).map_err(store_err)?;
            table
                .insert(doc.id.as_str(), value.as_slice())
                .map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }

    /// Every document in the collection, in id order.
    pub fn list(&self) -> Result<Vec<Document>> {
        self.scan(|_| true, None)
    }

    fn scan(&self, keep: impl Fn(&Document) -> bool, limit: Option<usize>) -> Result<Vec<Document>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = match rt.open_table(table_def(&self.name)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(store_err(e)),
        };

        let mut result = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            if limit.is_some_and(|n| result.len() >= n) {
                break;
            }
            let (k, v) = entry.map_err(store_err)?;
            let doc = decode(k.value(), v.value())?;
            if keep(&doc) {
                result.push(doc);
            }
        }
        Ok(result)
    }
}

impl DocumentStore for Collection<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_eq(
        &self,
        field: &str,
        value: &serde_json::Value,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.scan(|doc| matches_eq(&doc.fields, field, value), limit)
    }

    fn get(&self, id: &str) -> Result<Option<Document>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = match rt.open_table(table_def(&self.name)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(store_err(e)),
        };
        match table.get(id).map_err(store_err)? {
            Some(v) => Ok(Some(decode(id, v.value())?)),
            None => Ok(None),
        }
    }

    fn update(&self, id: &str, patch: &Fields) -> Result<()> {
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(table_def(&self.name)).map_err(store_err)?;
            let existing = table
                .get(id)
                .map_err(store_err)?
                .map(|v| v.value().to_vec());
            let Some(bytes) = existing else {
                return Err(CustfixError::DocumentNotFound {
                    collection: self.name.clone(),
                    id: id.to_string(),
                });
            };
            let mut doc = decode(id, &bytes)?;
            doc.merge(patch);
            let value = serde_json::to_vec(&doc.fields).map_err(store_err)?;
            table.insert(id, value.as_slice()).map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
