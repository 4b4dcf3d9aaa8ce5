//! Generic document shape shared by every collection.

use crate::error::{CustfixError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Fields = Map<String, Value>;

/// A stored record: an opaque id plus a JSON field map.
///
/// The id is never part of `fields`; it is the store key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a document from a JSON object carrying its own `"id"` key.
    ///
    /// String and integer ids are accepted; the key is stripped from `fields`.
    pub fn from_json_object(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(CustfixError::InvalidDocument(
                "expected a JSON object".to_string(),
            ));
        };
        let id = match fields.remove("id") {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(CustfixError::InvalidDocument(format!(
                    "unsupported id value: {other}"
                )))
            }
            None => {
                return Err(CustfixError::InvalidDocument(
                    "record has no \"id\" field".to_string(),
                ))
            }
        };
        Ok(Self { id, fields })
    }

    /// Flatten back to a single JSON object that includes `"id"`.
    pub fn to_json_object(&self) -> Value {
        let mut out = Map::with_capacity(self.fields.len() + 1);
        out.insert("id".to_string(), Value::String(self.id.clone()));
        for (k, v) in &self.fields {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field value when it is a non-empty string.
    pub fn non_empty_str(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Merge `patch` into the field map, overwriting existing keys.
    pub fn merge(&mut self, patch: &Fields) {
        for (k, v) in patch {
            self.fields.insert(k.clone(), v.clone());
        }
    }
}
