use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::document::{Document, Fields};
use crate::error::{CustfixError, Result};

use super::{matches_eq, DocumentStore};

/// In-process collection backed by a `BTreeMap`, so iteration is in id order
/// like [`super::Collection`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    docs: RefCell<BTreeMap<String, Document>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn with_docs(name: impl Into<String>, docs: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new(name);
        for doc in docs {
            store.insert(doc);
        }
        store
    }

    pub fn insert(&self, doc: Document) {
        self.docs.borrow_mut().insert(doc.id.clone(), doc);
    }

    pub fn snapshot(&self, id: &str) -> Option<Document> {
        self.docs.borrow().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.borrow().is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_eq(&self, field: &str, value: &Value, limit: Option<usize>) -> Result<Vec<Document>> {
        let docs = self.docs.borrow();
        let hits = docs
            .values()
            .filter(|doc| matches_eq(&doc.fields, field, value))
            .cloned();
        Ok(match limit {
            Some(n) => hits.take(n).collect(),
            None => hits.collect(),
        })
    }

    fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.snapshot(id))
    }

    fn update(&self, id: &str, patch: &Fields) -> Result<()> {
        let mut docs = self.docs.borrow_mut();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| CustfixError::DocumentNotFound {
                collection: self.name.clone(),
                id: id.to_string(),
            })?;
        doc.merge(patch);
        Ok(())
    }
}
