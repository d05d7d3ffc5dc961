// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Per-identity aggregated change state.
//!
//! A [`State`] is the combined effect of every logged transaction for one record identity. The
//! [`StateStore`] keeps one such entry per identity and updates it incrementally as transactions
//! are appended. The log stays the source of truth: replaying the log entries of an identity into
//! an empty store through [`StateStore::rebuild`] always yields the same entry.
//!
//! # Update rules
//!
//! | incoming | no entry | ADD entry | DELETE entry | UPDATE entry |
//! |----------|----------|-----------|--------------|--------------|
//! | ADD      | ADD      | ADD, value replaced | ADD, value replaced | ADD, value replaced |
//! | DELETE   | DELETE   | entry removed | DELETE | DELETE |
//! | UPDATE   | UPDATE   | ADD, value merged | DELETE, unchanged | UPDATE, value merged |
//!
//! Deleting a record that only exists as a pending ADD cancels the ADD, since there is nothing
//! left to delete once the addition is undone.

use crate::{
    record::Record,
    transaction::{Action, Transaction, TransactionType},
};
use ahash::RandomState;
use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
    hash::Hash,
};

/// The aggregated effect of all transactions recorded for one identity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Deserialize, ::serde::Serialize),
    serde(rename_all = "camelCase")
)]
pub struct State<K, R> {
    /// The merged change payload. `None` marks a deleted record.
    pub value: Option<R>,
    /// The original record the changes apply to. Absent for added records.
    pub record_ref: Option<R>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: TransactionType,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub parent_id: Option<K>,
}

impl<K, R> State<K, R>
where
    R: Record,
{
    /// Whether the record is marked for deletion.
    pub fn is_deleted(&self) -> bool {
        self.value.is_none()
    }

    /// Returns the effective value of the record.
    ///
    /// With `merge_changes`, the change payload is overlaid onto the original record; without it
    /// the change payload is returned as-is. Deleted records have no value.
    pub fn aggregate(&self, merge_changes: bool) -> Option<R> {
        let value = self.value.as_ref()?;
        match (&self.record_ref, merge_changes) {
            (Some(base), true) => {
                let mut merged = base.clone();
                merged.overlay(value);
                Some(merged)
            }
            _ => Some(value.clone()),
        }
    }
}

impl<K, R> State<K, R>
where
    K: Clone,
    R: Clone,
{
    /// Turns this state back into the single transaction that reproduces it.
    pub(crate) fn to_action(&self, id: K) -> Action<K, R> {
        Action::new(
            Transaction {
                id,
                kind: self.kind,
                new_value: self.value.clone(),
                parent_id: self.parent_id.clone(),
            },
            self.record_ref.clone(),
        )
    }
}

/// Map from record identity to its aggregated [`State`].
#[derive(Clone)]
pub struct StateStore<K, R> {
    states: HashMap<K, State<K, R>, RandomState>,
}

impl<K, R> Default for StateStore<K, R> {
    fn default() -> Self {
        Self {
            states: HashMap::default(),
        }
    }
}

impl<K, R> fmt::Debug for StateStore<K, R>
where
    K: fmt::Debug,
    R: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.states.iter()).finish()
    }
}

impl<K, R> PartialEq for StateStore<K, R>
where
    K: Eq + Hash,
    R: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.states == other.states
    }
}

impl<K, R> StateStore<K, R>
where
    K: Clone + Eq + Hash + fmt::Debug,
    R: Record,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &K) -> Option<&State<K, R>> {
        self.states.get(id)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.states.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterates over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &State<K, R>)> {
        self.states.iter()
    }

    pub fn remove(&mut self, id: &K) -> Option<State<K, R>> {
        self.states.remove(id)
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub(crate) fn insert(&mut self, id: K, state: State<K, R>) {
        self.states.insert(id, state);
    }

    /// Folds one transaction into the entry for its identity.
    ///
    /// `record_ref` is only recorded if the entry has no original record yet (or the transaction
    /// is an ADD, which starts over).
    pub fn apply(&mut self, transaction: &Transaction<K, R>, record_ref: Option<&R>) {
        tracing::trace!(id = ?transaction.id, kind = %transaction.kind, "applying transaction");
        let new_value = match transaction.kind {
            TransactionType::Delete => None,
            TransactionType::Add | TransactionType::Update => transaction.new_value.clone(),
        };

        let mut slot = match self.states.entry(transaction.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(State {
                    value: new_value,
                    record_ref: record_ref.cloned(),
                    kind: transaction.kind,
                    parent_id: transaction.parent_id.clone(),
                });
                return;
            }
            Entry::Occupied(slot) => slot,
        };

        let state = slot.get_mut();
        match transaction.kind {
            TransactionType::Add => {
                state.value = new_value;
                state.kind = TransactionType::Add;
                state.record_ref = record_ref.cloned();
                state.parent_id = transaction.parent_id.clone();
            }
            TransactionType::Delete if state.kind == TransactionType::Add => {
                slot.remove();
            }
            TransactionType::Delete => {
                state.kind = TransactionType::Delete;
                state.value = None;
                if state.record_ref.is_none() {
                    state.record_ref = record_ref.cloned();
                }
            }
            TransactionType::Update => {
                if state.record_ref.is_none() {
                    state.record_ref = record_ref.cloned();
                }
                if state.kind == TransactionType::Delete {
                    return;
                }
                if let Some(value) = state.value.as_mut() {
                    if let Some(changes) = &new_value {
                        value.overlay(changes);
                    }
                } else {
                    state.value = new_value;
                }
            }
        }
    }

    /// Recomputes the entry for `id` from scratch by replaying `actions` in order.
    ///
    /// Actions for other identities are skipped.
    pub fn rebuild<'a, I>(&mut self, id: &K, actions: I)
    where
        I: IntoIterator<Item = &'a Action<K, R>>,
        K: 'a,
        R: 'a,
    {
        self.states.remove(id);
        for action in actions {
            if &action.transaction.id == id {
                self.apply(&action.transaction, action.record_ref.as_ref());
            }
        }
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn store() -> StateStore<u32, Value> {
        StateStore::new()
    }

    #[test]
    fn update_creates_entry_with_record_ref() {
        let mut states = store();
        let original = json!({ "name": "A", "age": 30 });
        states.apply(&Transaction::update(1, json!({ "name": "B" })), Some(&original));

        let state = states.get(&1).unwrap();
        assert_eq!(state.kind, TransactionType::Update);
        assert_eq!(state.value, Some(json!({ "name": "B" })));
        assert_eq!(state.record_ref, Some(original));
        assert_eq!(state.aggregate(true), Some(json!({ "name": "B", "age": 30 })));
        assert_eq!(state.aggregate(false), Some(json!({ "name": "B" })));
    }

    #[test]
    fn updates_accumulate_and_keep_first_record_ref() {
        let mut states = store();
        let first = json!({ "name": "A", "age": 30 });
        states.apply(&Transaction::update(1, json!({ "name": "B" })), Some(&first));
        states.apply(
            &Transaction::update(1, json!({ "age": 31 })),
            Some(&json!({ "other": true })),
        );

        let state = states.get(&1).unwrap();
        assert_eq!(state.value, Some(json!({ "name": "B", "age": 31 })));
        assert_eq!(state.record_ref, Some(first));
    }

    #[test]
    fn add_stays_add_after_update() {
        let mut states = store();
        states.apply(&Transaction::add(1, json!({ "name": "A" })), None);
        states.apply(&Transaction::update(1, json!({ "age": 3 })), None);

        let state = states.get(&1).unwrap();
        assert_eq!(state.kind, TransactionType::Add);
        assert_eq!(state.aggregate(true), Some(json!({ "name": "A", "age": 3 })));
    }

    #[test]
    fn delete_is_terminal_for_updates() {
        let mut states = store();
        let original = json!({ "name": "A" });
        states.apply(&Transaction::delete(1), Some(&original));
        states.apply(&Transaction::update(1, json!({ "name": "B" })), None);

        let state = states.get(&1).unwrap();
        assert_eq!(state.kind, TransactionType::Delete);
        assert!(state.is_deleted());
        assert_eq!(state.aggregate(true), None);
        assert_eq!(state.record_ref, Some(original));
    }

    #[test]
    fn delete_after_update_keeps_record_ref() {
        let mut states = store();
        let original = json!({ "name": "A" });
        states.apply(&Transaction::update(1, json!({ "name": "B" })), Some(&original));
        states.apply(&Transaction::delete(1), None);

        let state = states.get(&1).unwrap();
        assert_eq!(state.kind, TransactionType::Delete);
        assert_eq!(state.value, None);
        assert_eq!(state.record_ref, Some(original));
    }

    #[test]
    fn delete_cancels_add() {
        let mut states = store();
        states.apply(&Transaction::add(1, json!({ "name": "A" })), None);
        states.apply(&Transaction::delete(1), None);
        assert!(states.get(&1).is_none());
        assert!(states.is_empty());
    }

    #[test]
    fn add_replaces_value_wholesale() {
        let mut states = store();
        states.apply(&Transaction::update(1, json!({ "a": 1 })), Some(&json!({ "a": 0 })));
        states.apply(&Transaction::add(1, json!({ "b": 2 })).with_parent(9), None);

        let state = states.get(&1).unwrap();
        assert_eq!(state.kind, TransactionType::Add);
        assert_eq!(state.value, Some(json!({ "b": 2 })));
        assert_eq!(state.record_ref, None);
        assert_eq!(state.parent_id, Some(9));
    }

    #[test]
    fn rebuild_replays_only_matching_actions() {
        let actions = [
            Action::new(Transaction::update(1, json!({ "a": 1 })), Some(json!({}))),
            Action::new(Transaction::add(2, json!({ "x": 1 })), None),
            Action::new(Transaction::update(1, json!({ "b": 2 })), None),
        ];
        let mut incremental = store();
        for a in &actions {
            incremental.apply(&a.transaction, a.record_ref.as_ref());
        }

        let mut rebuilt = store();
        rebuilt.rebuild(&1, &actions);
        rebuilt.rebuild(&2, &actions);
        assert_eq!(rebuilt, incremental);

        rebuilt.rebuild(&1, &actions[..1]);
        assert_eq!(rebuilt.get(&1).unwrap().value, Some(json!({ "a": 1 })));
    }

    #[test]
    fn nested_updates_fold_into_each_other() {
        let mut states = store();
        let original = json!({ "n": { "x": 0, "y": 0, "z": 0 } });
        states.apply(&Transaction::update(1, json!({ "n": { "x": 1 } })), Some(&original));
        states.apply(&Transaction::update(1, json!({ "n": { "y": 2 } })), None);

        let state = states.get(&1).unwrap();
        assert_eq!(state.value, Some(json!({ "n": { "x": 1, "y": 2 } })));
        assert_eq!(
            state.aggregate(true),
            Some(json!({ "n": { "x": 1, "y": 2, "z": 0 } }))
        );
    }

    #[test]
    fn state_deserializes_without_parent() {
        let state: State<u32, Value> = serde_json::from_value(json!({
            "value": { "a": 1 },
            "recordRef": null,
            "type": "UPDATE"
        }))
        .unwrap();
        assert_eq!(state.parent_id, None);
        assert_eq!(state.kind, TransactionType::Update);
    }

    #[test]
    fn to_action_reproduces_state() {
        let mut states = store();
        states.apply(&Transaction::update(1, json!({ "a": 1 })), Some(&json!({ "a": 0 })));
        let action = states.get(&1).unwrap().to_action(1);

        let mut replayed = store();
        replayed.apply(&action.transaction, action.record_ref.as_ref());
        assert_eq!(replayed, states);
    }
}
