// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The transaction service: change tracking with undo/redo over a log of transactions.
//!
//! A [`TransactionService`] ties the pieces of this crate together:
//!
//! - the [`TransactionLog`] records every accepted transaction, grouped into undo steps;
//! - the [`StateStore`] keeps the aggregated state of each tracked identity in sync with the log;
//! - an optional [`PendingBuffer`] isolates a pending session;
//! - the [`Policy`] decides what is accepted and how aggregated values are exposed.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use txlog::{Config, Transaction, TransactionService, json::KeyField};
//!
//! let mut service = TransactionService::<u32, serde_json::Value>::new(Config::default());
//! let original = json!({ "id": 1, "name": "A", "age": 30 });
//!
//! service
//!     .add(Transaction::update(1, json!({ "name": "B" })), Some(original.clone()))
//!     .unwrap();
//! assert_eq!(
//!     service.aggregated_value(&1, true),
//!     Some(json!({ "id": 1, "name": "B", "age": 30 }))
//! );
//!
//! service.undo();
//! assert!(service.state(&1).is_none());
//! service.redo();
//!
//! let mut data = vec![original];
//! let report = service.commit(&mut data, KeyField("id")).unwrap();
//! assert!(report.is_complete());
//! assert_eq!(data[0]["name"], "B");
//! assert!(service.state(&1).is_none());
//! ```

use crate::{
    commit::{self, CommitReport},
    config::Config,
    error::TransactionError,
    event::{Observer, Observers, StateUpdateOrigin},
    log::TransactionLog,
    pending::PendingBuffer,
    policy::{Flat, Hierarchical, Policy},
    record::{ChildRecords, Record, RecordKey},
    state::{State, StateStore},
    transaction::{Action, Transaction, TransactionType},
};
use ahash::RandomState;
use smallvec::smallvec;
use std::{collections::HashSet, fmt, hash::Hash};

/// In-memory change tracking for records identified by `K`.
///
/// The service is single-threaded by nature: every operation runs to completion before it
/// returns. It is `Send`, so a multi-threaded host can wrap one instance in a `Mutex`.
pub struct TransactionService<K, R, P = Flat> {
    config: Config,
    policy: P,
    log: TransactionLog<K, R>,
    states: StateStore<K, R>,
    pending: Option<PendingBuffer<K, R>>,
    observers: Observers<K, R>,
}

/// A transaction service tracking records arranged in a parent/child tree.
pub type HierarchicalTransactionService<K, R> = TransactionService<K, R, Hierarchical>;

impl<K, R, P> fmt::Debug for TransactionService<K, R, P>
where
    K: fmt::Debug,
    R: fmt::Debug,
    P: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionService")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("log", &self.log)
            .field("states", &self.states)
            .field("pending", &self.pending)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<K, R, P> Default for TransactionService<K, R, P>
where
    P: Default,
{
    fn default() -> Self {
        Self::with_policy(Config::default(), P::default())
    }
}

impl<K, R, P> TransactionService<K, R, P> {
    /// Creates a service with the given configuration and the default policy.
    pub fn new(config: Config) -> Self
    where
        P: Default,
    {
        Self::with_policy(config, P::default())
    }

    /// Creates a service with an explicit policy.
    pub fn with_policy(config: Config, policy: P) -> Self {
        Self {
            config,
            policy,
            log: TransactionLog::default(),
            states: StateStore::default(),
            pending: None,
            observers: Observers::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Whether the service tracks anything at all.
    pub fn transactions_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Registers an observer that is notified after every state change.
    pub fn on_state_update(&mut self, observer: impl Observer<K, R> + 'static) {
        self.observers.register(Box::new(observer));
    }
}

impl<K, R, P> TransactionService<K, R, P>
where
    K: Clone + Eq + Hash + fmt::Debug,
    R: Record,
    P: Policy,
{
    /// Records a transaction.
    ///
    /// `record_ref` is the record as it was before any change, used as the merge base for
    /// aggregated reads. It is only taken from the first transaction for an identity.
    ///
    /// Nothing is recorded when this returns an error. During a pending session the transaction
    /// goes to the pending buffer and no observer is notified.
    pub fn add(
        &mut self,
        transaction: Transaction<K, R>,
        record_ref: Option<R>,
    ) -> Result<(), TransactionError> {
        if !self.config.enabled {
            return Err(TransactionError::Disabled);
        }
        if let Err(error) = self.policy.admit(&transaction) {
            tracing::warn!(id = ?transaction.id, %error, "rejected transaction");
            return Err(error);
        }

        if let Some(pending) = &mut self.pending {
            tracing::trace!(id = ?transaction.id, kind = %transaction.kind, "recording pending transaction");
            pending.record(transaction, record_ref);
            return Ok(());
        }

        tracing::debug!(id = ?transaction.id, kind = %transaction.kind, "recording transaction");
        self.states.apply(&transaction, record_ref.as_ref());
        self.log
            .push(smallvec![Action::new(transaction, record_ref)]);
        self.notify_last_step(StateUpdateOrigin::Add);
        Ok(())
    }

    /// Iterates over every logged transaction, oldest first.
    pub fn transaction_log(&self) -> impl DoubleEndedIterator<Item = &Transaction<K, R>> {
        self.log.transactions()
    }

    /// Returns the most recent logged transaction for `id`.
    pub fn last_transaction(&self, id: &K) -> Option<&Transaction<K, R>> {
        self.log.last_for(id)
    }

    pub fn can_undo(&self) -> bool {
        self.pending.is_none() && self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.pending.is_none() && self.log.can_redo()
    }

    /// Reverts the most recent step.
    ///
    /// The states of the affected identities are recomputed from the remaining log. Returns
    /// false when there was nothing to undo, or while a pending session is open.
    pub fn undo(&mut self) -> bool {
        if self.pending.is_some() {
            tracing::debug!("undo ignored while a pending session is active");
            return false;
        }
        let Some(step) = self.log.undo() else {
            return false;
        };
        let ids: Vec<K> = step
            .iter()
            .map(|action| action.transaction.id.clone())
            .collect();
        for id in &ids {
            self.states.rebuild(id, self.log.actions());
        }
        tracing::debug!(?ids, "undid step");

        let log = &self.log;
        self.observers.notify_with(StateUpdateOrigin::Undo, || {
            log.last_undone().map(|step| step.to_vec()).unwrap_or_default()
        });
        true
    }

    /// Re-applies the most recently undone step.
    ///
    /// Returns false when there was nothing to redo, or while a pending session is open.
    pub fn redo(&mut self) -> bool {
        if self.pending.is_some() {
            tracing::debug!("redo ignored while a pending session is active");
            return false;
        }
        let Some(step) = self.log.redo() else {
            return false;
        };
        for action in step {
            self.states
                .apply(&action.transaction, action.record_ref.as_ref());
        }
        tracing::debug!(actions = step.len(), "redid step");
        self.notify_last_step(StateUpdateOrigin::Redo);
        true
    }

    /// Drops all tracked changes.
    ///
    /// While a pending session is open only the pending buffer is emptied; the session stays
    /// open and the outer log is left alone.
    pub fn clear(&mut self) {
        if let Some(pending) = &mut self.pending {
            pending.clear();
            return;
        }
        self.log.clear();
        self.states.clear();
        tracing::debug!("cleared transaction log");
        self.observers
            .notify_with(StateUpdateOrigin::Clear, Vec::new);
    }

    /// Drops all tracked changes for one identity, including undone ones.
    ///
    /// While a pending session is open only the pending buffer is affected.
    pub fn clear_id(&mut self, id: &K) {
        if let Some(pending) = &mut self.pending {
            pending.forget(id);
            return;
        }
        self.forget(id);
        tracing::debug!(?id, "cleared transactions for record");
        self.observers
            .notify_with(StateUpdateOrigin::Clear, Vec::new);
    }

    /// Returns the aggregated state recorded in the outer log.
    pub fn state(&self, id: &K) -> Option<&State<K, R>> {
        self.states.get(id)
    }

    /// Returns the aggregated state recorded in the current pending session.
    pub fn pending_state(&self, id: &K) -> Option<&State<K, R>> {
        self.pending.as_ref()?.state(id)
    }

    /// Returns the effective value of the record identified by `id`.
    ///
    /// With `merge_changes`, the recorded changes are overlaid onto the original record;
    /// otherwise only the change payload is returned. Returns `None` for records that are not
    /// tracked or are marked for deletion (see [`Self::state`] to tell the two apart).
    ///
    /// During a pending session this is the value the record would have if the session were
    /// committed now.
    pub fn aggregated_value(&self, id: &K, merge_changes: bool) -> Option<R> {
        let mut value = match &self.pending {
            Some(pending) => pending
                .preview(id, self.states.get(id))?
                .aggregate(merge_changes)?,
            None => self.states.get(id)?.aggregate(merge_changes)?,
        };
        self.policy.expose(&mut value);
        Some(value)
    }

    /// Returns one transaction per tracked identity describing its aggregated change.
    ///
    /// Identities are reported in the order they first appear in the log. Values are merged onto
    /// their original record when `merge_changes` is set and shaped by the policy. Only the
    /// outer log is reported.
    pub fn aggregated_state(&self, merge_changes: bool) -> Vec<Transaction<K, R>> {
        self.changes(merge_changes, |_| true)
    }

    /// Aggregated changes in log order, shaped by the policy where `expose` says so.
    fn changes(
        &self,
        merge_changes: bool,
        expose: impl Fn(TransactionType) -> bool,
    ) -> Vec<Transaction<K, R>> {
        let mut seen = HashSet::with_hasher(RandomState::new());
        self.log
            .transactions()
            .map(|tx| &tx.id)
            .filter(|id| seen.insert(*id))
            .filter_map(|id| {
                let state = self.states.get(id)?;
                let new_value = state.aggregate(merge_changes).map(|mut value| {
                    if expose(state.kind) {
                        self.policy.expose(&mut value);
                    }
                    value
                });
                Some(Transaction {
                    id: id.clone(),
                    kind: state.kind,
                    new_value,
                    parent_id: state.parent_id.clone(),
                })
            })
            .collect()
    }

    /// Whether a pending session is open.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Opens a pending session. Does nothing if one is already open.
    pub fn start_pending(&mut self) {
        if self.pending.is_none() {
            tracing::debug!("starting pending session");
            self.pending = Some(PendingBuffer::new());
        }
    }

    /// Closes the pending session. Does nothing if none is open.
    ///
    /// With `commit`, the pending changes are folded into the outer log as a single undo step
    /// holding one synthesized action per changed identity (see [`PendingBuffer::into_step`]).
    /// Otherwise they are discarded.
    pub fn end_pending(&mut self, commit: bool) {
        let Some(buffer) = self.pending.take() else {
            return;
        };
        if !commit {
            tracing::debug!(discarded = buffer.actions().len(), "discarded pending session");
            return;
        }

        let step = buffer.into_step(&self.states);
        if step.is_empty() {
            return;
        }
        for action in &step {
            self.states
                .apply(&action.transaction, action.record_ref.as_ref());
        }
        tracing::debug!(actions = step.len(), "committed pending session");
        self.log.push(step);
        self.notify_last_step(StateUpdateOrigin::EndPending);
    }

    /// Applies every tracked change to `data` and resets the service.
    ///
    /// ADDs are appended, DELETEs remove the record whose key matches, UPDATEs overlay the
    /// aggregated value onto the matching record. Changes whose record cannot be found are
    /// skipped and listed in the report. The log and all states are cleared afterwards.
    pub fn commit<F>(&mut self, data: &mut Vec<R>, key: F) -> Result<CommitReport<K>, TransactionError>
    where
        F: RecordKey<K, R>,
    {
        self.commit_with(None, |changes| commit::merge_flat(data, changes, &key))
    }

    /// Like [`Self::commit`], restricted to the changes for `id`.
    ///
    /// Changes for other identities stay tracked.
    pub fn commit_id<F>(
        &mut self,
        data: &mut Vec<R>,
        id: &K,
        key: F,
    ) -> Result<CommitReport<K>, TransactionError>
    where
        F: RecordKey<K, R>,
    {
        self.commit_with(Some(id), |changes| commit::merge_flat(data, changes, &key))
    }

    fn commit_with(
        &mut self,
        only: Option<&K>,
        merge: impl FnOnce(&[Transaction<K, R>]) -> CommitReport<K>,
    ) -> Result<CommitReport<K>, TransactionError> {
        if self.pending.is_some() {
            return Err(TransactionError::PendingSession);
        }

        // added records keep their child collections
        let mut changes = self.changes(true, |kind| kind != TransactionType::Add);
        if let Some(id) = only {
            changes.retain(|tx| &tx.id == id);
        }
        let report = merge(&changes);

        let committed: Vec<_> = if self.observers.len() > 0 {
            self.log
                .actions()
                .filter(|action| only.is_none_or(|id| &action.transaction.id == id))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        match only {
            Some(id) => self.forget(id),
            None => {
                self.log.clear();
                self.states.clear();
            }
        }
        tracing::debug!(
            added = report.added,
            updated = report.updated,
            deleted = report.deleted,
            missing = report.missing.len(),
            "committed transactions"
        );
        self.observers
            .notify_with(StateUpdateOrigin::Commit, || committed);
        Ok(report)
    }

    fn forget(&mut self, id: &K) {
        self.log.forget(id);
        self.states.remove(id);
    }

    fn notify_last_step(&mut self, origin: StateUpdateOrigin) {
        let log = &self.log;
        self.observers.notify_with(origin, || {
            log.last_step().map(|step| step.to_vec()).unwrap_or_default()
        });
    }
}

impl<K, R> TransactionService<K, R, Hierarchical>
where
    K: Clone + Eq + Hash + fmt::Debug,
    R: ChildRecords,
{
    /// Creates a hierarchical service.
    pub fn hierarchical(config: Config) -> Self {
        Self::with_policy(config, Hierarchical)
    }

    /// Applies every tracked change to a tree of records and resets the service.
    ///
    /// Child records live in the collection stored under `children` on their parent. An ADD
    /// with a parent is appended to that collection (created if needed), an ADD without one to
    /// `data`. Added records are committed as recorded, child collections included. DELETEs and
    /// UPDATEs find their record anywhere in the tree; an UPDATE leaves the child collections of
    /// its record alone. Changes whose record or parent cannot be found are skipped and listed in
    /// the report.
    pub fn commit_tree<F>(
        &mut self,
        data: &mut Vec<R>,
        key: F,
        children: &str,
    ) -> Result<CommitReport<K>, TransactionError>
    where
        F: RecordKey<K, R>,
    {
        self.commit_with(None, |changes| {
            commit::merge_tree(data, changes, &key, children)
        })
    }
}
