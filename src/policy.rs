// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Validate incoming transactions and shape exposed values.
//!
//! A [`Policy`] decides which transactions a service accepts and post-processes every aggregated
//! value before it leaves the service. The service holds its policy by value and consults it on
//! each `add` and each aggregated read, so the flat and hierarchical flavours share one engine.
//!
//! - [`Flat`] accepts plain records and rejects parent linkage.
//! - [`Hierarchical`] accepts parent identities on ADD transactions and strips child collections
//!   from exposed values.

use crate::{
    error::TransactionError,
    record::Record,
    transaction::{Transaction, TransactionType},
};

/// Decides what a transaction service accepts and how it exposes aggregated values.
pub trait Policy {
    /// Checks a transaction before anything is recorded.
    ///
    /// The default accepts ADD and UPDATE transactions that carry a value, and any DELETE.
    fn admit<K, R>(&self, transaction: &Transaction<K, R>) -> Result<(), TransactionError> {
        check_payload(transaction)
    }

    /// Shapes a value before it is handed out by an aggregated read.
    ///
    /// The value is always a fresh copy; stored states are never touched.
    #[expect(unused_variables)]
    fn expose<R: Record>(&self, value: &mut R) {}
}

/// Policy for plain, non-nested records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flat;

impl Policy for Flat {
    fn admit<K, R>(&self, transaction: &Transaction<K, R>) -> Result<(), TransactionError> {
        if transaction.parent_id.is_some() {
            return Err(TransactionError::ParentUnsupported);
        }
        check_payload(transaction)
    }
}

/// Policy for records arranged in a parent/child tree.
///
/// Child records are tracked under their own identity, added with a `parent_id` pointing at the
/// parent. Array-valued fields are child collections, so they are removed from every exposed
/// value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hierarchical;

impl Policy for Hierarchical {
    fn admit<K, R>(&self, transaction: &Transaction<K, R>) -> Result<(), TransactionError> {
        if transaction.parent_id.is_some() && transaction.kind != TransactionType::Add {
            return Err(TransactionError::ParentOnNonAdd {
                kind: transaction.kind,
            });
        }
        check_payload(transaction)
    }

    fn expose<R: Record>(&self, value: &mut R) {
        value.strip_collections();
    }
}

fn check_payload<K, R>(transaction: &Transaction<K, R>) -> Result<(), TransactionError> {
    match transaction.kind {
        TransactionType::Add | TransactionType::Update if transaction.new_value.is_none() => {
            Err(TransactionError::MissingValue {
                kind: transaction.kind,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_rejects_parent_links() {
        assert_eq!(
            Flat.admit(&Transaction::add(5, ()).with_parent(2)),
            Err(TransactionError::ParentUnsupported)
        );
        assert_eq!(Flat.admit(&Transaction::add(5, ())), Ok(()));
    }

    #[test]
    fn hierarchical_allows_parent_on_add_only() {
        assert_eq!(Hierarchical.admit(&Transaction::add(5, ()).with_parent(2)), Ok(()));
        assert_eq!(
            Hierarchical.admit(&Transaction::update(5, ()).with_parent(2)),
            Err(TransactionError::ParentOnNonAdd {
                kind: TransactionType::Update
            })
        );
        assert_eq!(
            Hierarchical.admit(&Transaction::<_, ()>::delete(5).with_parent(2)),
            Err(TransactionError::ParentOnNonAdd {
                kind: TransactionType::Delete
            })
        );
    }

    #[test]
    fn payload_is_required_for_add_and_update() {
        let mut tx = Transaction::update(1, ());
        tx.new_value = None;
        assert_eq!(
            Flat.admit(&tx),
            Err(TransactionError::MissingValue {
                kind: TransactionType::Update
            })
        );
        assert_eq!(Hierarchical.admit(&Transaction::<_, ()>::delete(1)), Ok(()));
    }
}
