// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The isolated buffer used during a pending session.
//!
//! While a session is open, every accepted transaction goes here instead of the outer log. The
//! buffer keeps its own action list and state store. Ending the session either drops the buffer or
//! folds it into the outer log as one step, see [`PendingBuffer::into_step`].

use crate::{
    log::Step,
    record::Record,
    state::{State, StateStore},
    transaction::{Action, Transaction, TransactionType},
};
use ahash::RandomState;
use std::{collections::HashSet, fmt, hash::Hash};

/// Transactions recorded during a pending session, with their aggregated states.
#[derive(Clone)]
pub struct PendingBuffer<K, R> {
    actions: Vec<Action<K, R>>,
    states: StateStore<K, R>,
}

impl<K, R> Default for PendingBuffer<K, R> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            states: StateStore::default(),
        }
    }
}

impl<K, R> fmt::Debug for PendingBuffer<K, R>
where
    K: fmt::Debug,
    R: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingBuffer")
            .field("actions", &self.actions)
            .field("states", &self.states)
            .finish()
    }
}

impl<K, R> PendingBuffer<K, R>
where
    K: Clone + Eq + Hash + fmt::Debug,
    R: Record,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transaction in the buffer.
    pub fn record(&mut self, transaction: Transaction<K, R>, record_ref: Option<R>) {
        self.states.apply(&transaction, record_ref.as_ref());
        self.actions.push(Action::new(transaction, record_ref));
    }

    pub fn state(&self, id: &K) -> Option<&State<K, R>> {
        self.states.get(id)
    }

    pub fn actions(&self) -> &[Action<K, R>] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Drops every recorded change for `id`.
    pub fn forget(&mut self, id: &K) {
        self.actions.retain(|action| &action.transaction.id != id);
        self.states.remove(id);
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.states.clear();
    }

    /// Returns the state `id` would have if the buffer were folded onto `outer` now.
    pub fn preview(&self, id: &K, outer: Option<&State<K, R>>) -> Option<State<K, R>> {
        self.replay(id, outer).state
    }

    /// Folds the buffer into a step to apply on top of `outer`.
    ///
    /// Each changed identity contributes one synthesized action reproducing its final state, in
    /// the order the identities were first touched. An outer entry cancelled during the session is
    /// removed first, by the DELETE alone when the entry was an ADD and otherwise by the ADD and
    /// DELETE that cancelled it. Applying the step lands on the same states as applying every
    /// buffered transaction in turn.
    pub fn into_step(self, outer: &StateStore<K, R>) -> Step<K, R> {
        let mut seen = HashSet::with_hasher(RandomState::new());
        let mut step = Step::new();
        for id in self.actions.iter().map(|action| &action.transaction.id) {
            if !seen.insert(id) {
                continue;
            }
            let before = outer.get(id);
            let replay = self.replay(id, before);
            if let Some((add, delete)) = replay.removal {
                match before {
                    None => {}
                    Some(state) if state.kind == TransactionType::Add => step.push(delete.clone()),
                    Some(_) => step.extend(add.into_iter().chain([delete]).cloned()),
                }
            }
            if let Some(state) = replay.state {
                step.push(state.to_action(id.clone()));
            }
        }
        step
    }

    fn replay<'a>(&'a self, id: &K, outer: Option<&State<K, R>>) -> Replay<'a, K, R> {
        let mut scratch = StateStore::new();
        if let Some(state) = outer {
            scratch.insert(id.clone(), state.clone());
        }
        let mut last_add = None;
        let mut removal = None;
        for action in self.actions.iter().filter(|action| &action.transaction.id == id) {
            let present = scratch.contains(id);
            scratch.apply(&action.transaction, action.record_ref.as_ref());
            if action.transaction.kind == TransactionType::Add {
                last_add = Some(action);
            }
            if present && !scratch.contains(id) {
                removal = Some((last_add, action));
            }
        }
        Replay {
            state: scratch.remove(id),
            removal,
        }
    }
}

/// The buffered changes for one identity replayed over its outer state.
struct Replay<'a, K, R> {
    state: Option<State<K, R>>,
    /// The latest ADD and the DELETE that cancelled the entry, if it was removed on the way.
    removal: Option<(Option<&'a Action<K, R>>, &'a Action<K, R>)>,
}
