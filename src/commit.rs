// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Applying aggregated changes to an external data collection.
//!
//! Records are matched by the identity a [`RecordKey`] extracts from them. An UPDATE or DELETE
//! whose record cannot be found is skipped and reported in [`CommitReport::missing`]; the rest of
//! the commit still goes through.

use crate::{
    record::{ChildRecords, Record, RecordKey},
    transaction::{Transaction, TransactionType},
};
use std::fmt;

/// The outcome of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport<K> {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Identities whose record (or, for child ADDs, whose parent) was not found.
    pub missing: Vec<K>,
}

impl<K> Default for CommitReport<K> {
    fn default() -> Self {
        Self {
            added: 0,
            updated: 0,
            deleted: 0,
            missing: Vec::new(),
        }
    }
}

impl<K> CommitReport<K> {
    /// Whether every change found its target.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    fn skip(&mut self, id: &K)
    where
        K: Clone + fmt::Debug,
    {
        tracing::warn!(?id, "record referenced by a transaction is missing, skipping it");
        self.missing.push(id.clone());
    }
}

/// Applies `changes` to a flat list of records.
pub(crate) fn merge_flat<K, R, F>(
    data: &mut Vec<R>,
    changes: &[Transaction<K, R>],
    key: &F,
) -> CommitReport<K>
where
    K: Clone + PartialEq + fmt::Debug,
    R: Record,
    F: RecordKey<K, R>,
{
    let mut report = CommitReport::default();
    for tx in changes {
        match (tx.kind, &tx.new_value) {
            (TransactionType::Add, Some(value)) => {
                data.push(value.clone());
                report.added += 1;
            }
            (TransactionType::Delete, _) => match position(data, &tx.id, key) {
                Some(index) => {
                    data.remove(index);
                    report.deleted += 1;
                }
                None => report.skip(&tx.id),
            },
            (TransactionType::Update, Some(value)) => match position(data, &tx.id, key) {
                Some(index) => {
                    data[index].overlay(value);
                    report.updated += 1;
                }
                None => report.skip(&tx.id),
            },
            // ADD and UPDATE always carry a value once admitted.
            (TransactionType::Add | TransactionType::Update, None) => {}
        }
    }
    report
}

/// Applies `changes` to a tree of records whose children live under the `children` field.
pub(crate) fn merge_tree<K, R, F>(
    data: &mut Vec<R>,
    changes: &[Transaction<K, R>],
    key: &F,
    children: &str,
) -> CommitReport<K>
where
    K: Clone + PartialEq + fmt::Debug,
    R: ChildRecords,
    F: RecordKey<K, R>,
{
    let mut report = CommitReport::default();
    for tx in changes {
        match (tx.kind, &tx.new_value) {
            (TransactionType::Add, Some(value)) => {
                let collection = match &tx.parent_id {
                    None => Some(&mut *data),
                    Some(parent) => find_record_mut(data, parent, key, children)
                        .and_then(|record| record.ensure_children(children)),
                };
                match collection {
                    Some(collection) => {
                        collection.push(value.clone());
                        report.added += 1;
                    }
                    None => report.skip(&tx.id),
                }
            }
            (TransactionType::Delete, _) => {
                let removed = match find_path(data, &tx.id, key, children) {
                    Some(path) => remove_at(data, &path, children),
                    None => None,
                };
                match removed {
                    Some(_) => report.deleted += 1,
                    None => report.skip(&tx.id),
                }
            }
            (TransactionType::Update, Some(value)) => {
                match find_record_mut(data, &tx.id, key, children) {
                    Some(record) => {
                        record.overlay(value);
                        report.updated += 1;
                    }
                    None => report.skip(&tx.id),
                }
            }
            (TransactionType::Add | TransactionType::Update, None) => {}
        }
    }
    report
}

fn position<K, R, F>(records: &[R], id: &K, key: &F) -> Option<usize>
where
    K: PartialEq,
    F: RecordKey<K, R>,
{
    records
        .iter()
        .position(|record| key.key(record).as_ref() == Some(id))
}

/// Index path from the top-level records down to the record identified by `id`, depth first.
fn find_path<K, R, F>(records: &[R], id: &K, key: &F, children: &str) -> Option<Vec<usize>>
where
    K: PartialEq,
    R: ChildRecords,
    F: RecordKey<K, R>,
{
    for (index, record) in records.iter().enumerate() {
        if key.key(record).as_ref() == Some(id) {
            return Some(vec![index]);
        }
        if let Some(mut path) = record
            .children(children)
            .and_then(|nested| find_path(nested, id, key, children))
        {
            path.insert(0, index);
            return Some(path);
        }
    }
    None
}

/// The collection reached by descending through `path`.
fn collection_at<'a, R>(
    records: &'a mut Vec<R>,
    path: &[usize],
    children: &str,
) -> Option<&'a mut Vec<R>>
where
    R: ChildRecords,
{
    let mut current = records;
    for &index in path {
        current = current.get_mut(index)?.children_mut(children)?;
    }
    Some(current)
}

fn find_record_mut<'a, K, R, F>(
    records: &'a mut Vec<R>,
    id: &K,
    key: &F,
    children: &str,
) -> Option<&'a mut R>
where
    K: PartialEq,
    R: ChildRecords,
    F: RecordKey<K, R>,
{
    let path = find_path(records, id, key, children)?;
    let (index, parents) = path.split_last()?;
    collection_at(records, parents, children)?.get_mut(*index)
}

fn remove_at<R>(records: &mut Vec<R>, path: &[usize], children: &str) -> Option<R>
where
    R: ChildRecords,
{
    let (index, parents) = path.split_last()?;
    let collection = collection_at(records, parents, children)?;
    (*index < collection.len()).then(|| collection.remove(*index))
}
