// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! JSON records
//!
//! [`serde_json::Value`] is the natural record type for grid-like data: every row is an object,
//! UPDATE payloads hold only the changed fields, and child rows live in array-valued fields.
//!
//! # Examples
//!
//! ## Overlaying changes onto a row
//!
//! ```
//! use serde_json::json;
//! use txlog::record::Record;
//!
//! let mut row = json!({ "name": "A", "address": { "city": "Oslo", "zip": "0150" } });
//! row.overlay(&json!({ "address": { "city": "Bergen" } }));
//! assert_eq!(row, json!({ "name": "A", "address": { "city": "Bergen", "zip": "0150" } }));
//! ```
//!
//! ## Looking up rows by a key field
//!
//! ```
//! use serde_json::json;
//! use txlog::{json::KeyField, record::RecordKey};
//!
//! let row = json!({ "id": 7, "name": "A" });
//! assert_eq!(RecordKey::<u32, _>::key(&KeyField("id"), &row), Some(7));
//! ```
use crate::record::{ChildRecords, Record, RecordKey};
use serde::de::DeserializeOwned;
use serde_json::Value;

impl Record for Value {
    fn overlay(&mut self, changes: &Self) {
        match (self, changes) {
            (Value::Object(fields), Value::Object(changed)) => {
                for (k, v) in changed {
                    match fields.get_mut(k) {
                        Some(existing) if existing.is_object() && v.is_object() => {
                            existing.overlay(v);
                            continue;
                        }
                        _ => {}
                    }
                    fields.insert(k.clone(), v.clone());
                }
            }
            (this, changes) => *this = changes.clone(),
        }
    }

    fn strip_collections(&mut self) {
        if let Value::Object(fields) = self {
            fields.retain(|_, v| !v.is_array());
        }
    }
}

impl ChildRecords for Value {
    fn children(&self, field: &str) -> Option<&[Self]> {
        self.get(field)?.as_array().map(Vec::as_slice)
    }

    fn children_mut(&mut self, field: &str) -> Option<&mut Vec<Self>> {
        self.get_mut(field)?.as_array_mut()
    }

    fn ensure_children(&mut self, field: &str) -> Option<&mut Vec<Self>> {
        self.as_object_mut()?
            .entry(field)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
    }
}

/// Identifies JSON records by the value of one of their fields.
///
/// The field is deserialized into the identity type, so `KeyField("id")` works for numeric and
/// string keys alike. Records without the field, or whose field does not deserialize, have no
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyField<'a>(pub &'a str);

impl<K> RecordKey<K, Value> for KeyField<'_>
where
    K: DeserializeOwned,
{
    fn key(&self, record: &Value) -> Option<K> {
        K::deserialize(record.get(self.0)?).ok()
    }
}
