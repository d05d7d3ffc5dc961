// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! `quickcheck::Arbitrary` implementations for transaction types.
//!
//! With `cfg(test)` this also provides `Ops`, a random script of service operations over a
//! handful of identities, used by the property tests.

use crate::transaction::{Transaction, TransactionType};
use quickcheck::{Arbitrary, Gen};

impl Arbitrary for TransactionType {
    fn arbitrary(g: &mut Gen) -> Self {
        *g.choose(&[
            TransactionType::Add,
            TransactionType::Delete,
            TransactionType::Update,
        ])
        .expect("choices are non-empty")
    }
}

impl<K, R> Arbitrary for Transaction<K, R>
where
    K: Arbitrary,
    R: Arbitrary,
{
    fn arbitrary(g: &mut Gen) -> Self {
        let id = K::arbitrary(g);
        match TransactionType::arbitrary(g) {
            TransactionType::Add => Transaction::add(id, R::arbitrary(g)),
            TransactionType::Update => Transaction::update(id, R::arbitrary(g)),
            TransactionType::Delete => Transaction::delete(id),
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let Some(value) = self.new_value.clone() else {
            return quickcheck::empty_shrinker();
        };
        let (id, kind) = (self.id.clone(), self.kind);
        Box::new(value.shrink().map(move |value| Transaction {
            id: id.clone(),
            kind,
            new_value: Some(value),
            parent_id: None,
        }))
    }
}

#[cfg(all(test, feature = "json"))]
pub(crate) use script::{Ops, Scripted, original};
