// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Transactions: recorded intents to add, delete or update one record.
//!
//! A [`Transaction`] names the record it affects by identity and carries the change payload.
//! Transactions are immutable once recorded. The log stores each one together with the
//! original record it was made against as an [`Action`].
//!
//! # Example
//!
//! ```
//! use txlog::transaction::{Transaction, TransactionType};
//! use serde_json::json;
//!
//! let tx = Transaction::update(1, json!({ "name": "B" }));
//! assert_eq!(tx.kind, TransactionType::Update);
//! assert_eq!(tx.to_string(), "UPDATE 1");
//!
//! let child = Transaction::add(5, json!({ "name": "leaf" })).with_parent(2);
//! assert_eq!(child.parent_id, Some(2));
//! ```

use std::fmt;

/// The kind of change a [`Transaction`] records.
///
/// When several transactions touch the same identity, the kinds combine with the precedence
/// ADD > DELETE > UPDATE. See [`StateStore::apply`](crate::state::StateStore::apply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Deserialize, ::serde::Serialize),
    serde(rename_all = "UPPERCASE")
)]
pub enum TransactionType {
    Add,
    Delete,
    Update,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionType::Add => "ADD",
            TransactionType::Delete => "DELETE",
            TransactionType::Update => "UPDATE",
        })
    }
}

/// One change intent against the record identified by `id`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Deserialize, ::serde::Serialize),
    serde(rename_all = "camelCase")
)]
pub struct Transaction<K, R> {
    /// Identity of the affected record.
    pub id: K,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: TransactionType,
    /// The full record for ADD, the changed fields for UPDATE. Ignored for DELETE.
    pub new_value: Option<R>,
    /// Identity of the parent record. Only meaningful for ADD under the hierarchical policy.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub parent_id: Option<K>,
}

impl<K, R> Transaction<K, R> {
    /// Creates a transaction adding a new record.
    pub fn add(id: K, value: R) -> Self {
        Self {
            id,
            kind: TransactionType::Add,
            new_value: Some(value),
            parent_id: None,
        }
    }

    /// Creates a transaction changing some fields of an existing record.
    pub fn update(id: K, changes: R) -> Self {
        Self {
            id,
            kind: TransactionType::Update,
            new_value: Some(changes),
            parent_id: None,
        }
    }

    /// Creates a transaction deleting an existing record.
    pub fn delete(id: K) -> Self {
        Self {
            id,
            kind: TransactionType::Delete,
            new_value: None,
            parent_id: None,
        }
    }

    /// Links this transaction to a parent record.
    #[must_use]
    pub fn with_parent(mut self, parent_id: K) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

impl<K: fmt::Display, R> fmt::Display for Transaction<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)?;
        if let Some(parent) = &self.parent_id {
            write!(f, " (parent {parent})")?;
        }
        Ok(())
    }
}

/// A logged transaction together with the original record it was made against.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Deserialize, ::serde::Serialize),
    serde(rename_all = "camelCase")
)]
pub struct Action<K, R> {
    pub transaction: Transaction<K, R>,
    /// The record as it was before any change. Absent for newly added records.
    pub record_ref: Option<R>,
}

impl<K, R> Action<K, R> {
    pub fn new(transaction: Transaction<K, R>, record_ref: Option<R>) -> Self {
        Self {
            transaction,
            record_ref,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind_and_payload() {
        let add = Transaction::add(1, "a");
        assert_eq!(add.kind, TransactionType::Add);
        assert_eq!(add.new_value, Some("a"));

        let delete = Transaction::<_, &str>::delete(1);
        assert_eq!(delete.kind, TransactionType::Delete);
        assert_eq!(delete.new_value, None);
        assert_eq!(delete.parent_id, None);
    }

    #[test]
    fn display_includes_parent() {
        let tx = Transaction::add(5, ()).with_parent(2);
        assert_eq!(tx.to_string(), "ADD 5 (parent 2)");
        assert_eq!(Transaction::<_, ()>::delete("x").to_string(), "DELETE x");
    }

    #[cfg(feature = "json")]
    #[test]
    fn serializes_with_wire_field_names() {
        let tx = Transaction::add(5, serde_json::json!({ "name": "leaf" })).with_parent(2);
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 5,
                "type": "ADD",
                "newValue": { "name": "leaf" },
                "parentId": 2
            })
        );

        let back: Transaction<u32, serde_json::Value> = serde_json::from_value(value).unwrap();
        assert_eq!(back, tx);
    }

    #[cfg(feature = "json")]
    #[test]
    fn deserializes_keys_without_default() {
        #[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
        struct RowKey(String);

        let tx: Transaction<RowKey, serde_json::Value> =
            serde_json::from_value(serde_json::json!({ "id": "r1", "type": "DELETE" })).unwrap();
        assert_eq!(tx, Transaction::delete(RowKey("r1".into())));

        let child = Transaction::add(RowKey("r2".into()), serde_json::json!({}))
            .with_parent(RowKey("r1".into()));
        let value = serde_json::to_value(&child).unwrap();
        assert_eq!(value["parentId"], "r1");
        assert_eq!(
            serde_json::from_value::<Transaction<RowKey, serde_json::Value>>(value).unwrap(),
            child
        );
    }
}
