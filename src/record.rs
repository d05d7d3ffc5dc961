// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The capabilities a record type needs to be tracked by a transaction service.
//!
//! The service never looks inside a record itself. Everything it does with a payload goes through
//! [`Record`]: accumulating UPDATE payloads, overlaying changes onto the original record, and
//! removing child collections from exposed values. Hierarchical commit additionally needs
//! [`ChildRecords`] to reach nested collections.
//!
//! Identity is not part of the record. Callers hand a [`RecordKey`] to `commit` so the service
//! can find records in an external collection.
//!
//! With the `json` feature, [`serde_json::Value`] implements both traits.

use std::fmt;

/// A record payload that can be tracked by a transaction service.
pub trait Record: Clone + PartialEq + fmt::Debug {
    /// Deep-overlays `changes` onto `self`.
    ///
    /// Fields missing from `changes` are preserved, nested field collections present on both
    /// sides merge recursively, and everything else in `changes` replaces what `self` holds.
    ///
    /// UPDATE payloads accumulate through this as well, so a merged read equals overlaying every
    /// payload onto the original record in turn. That holds as long as a field does not switch
    /// between a nested collection and a plain value across the updates of one record.
    fn overlay(&mut self, changes: &Self);

    /// Removes fields that hold child collections.
    ///
    /// Child collections are managed through their own ADD transactions, so they are not part of
    /// a record's editable value.
    fn strip_collections(&mut self) {}
}

/// A record that owns named collections of child records.
pub trait ChildRecords: Record + Sized {
    /// Returns the child collection stored under `field`, if there is one.
    fn children(&self, field: &str) -> Option<&[Self]>;

    /// Returns the child collection stored under `field` for mutation, if there is one.
    fn children_mut(&mut self, field: &str) -> Option<&mut Vec<Self>>;

    /// Returns the child collection stored under `field`, creating an empty one when absent.
    ///
    /// Returns `None` when the record cannot hold a collection under that field.
    fn ensure_children(&mut self, field: &str) -> Option<&mut Vec<Self>>;
}

/// Extracts the identity of a record in an external data collection.
pub trait RecordKey<K, R> {
    /// Returns the identity of `record`, or `None` if it has none.
    fn key(&self, record: &R) -> Option<K>;
}

impl<K, R, F> RecordKey<K, R> for F
where
    F: Fn(&R) -> Option<K>,
{
    fn key(&self, record: &R) -> Option<K> {
        self(record)
    }
}
