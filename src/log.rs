// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The ordered transaction log and its redo buffer.
//!
//! The log is a sequence of [`Step`]s. Each step is what one call to `undo` reverts: a single
//! action for a plain `add`, or one action per changed identity when a pending session is
//! committed. Reading the log flattens the steps back into the order the transactions were
//! recorded in.

use crate::transaction::{Action, Transaction};
use smallvec::SmallVec;
use std::fmt;

/// The actions reverted together by one undo.
///
/// Almost every step holds exactly one action, so it is stored inline.
pub type Step<K, R> = SmallVec<[Action<K, R>; 1]>;

/// Append-only transaction history with undo/redo stacks.
#[derive(Clone, PartialEq)]
pub struct TransactionLog<K, R> {
    steps: Vec<Step<K, R>>,
    redo: Vec<Step<K, R>>,
}

impl<K, R> Default for TransactionLog<K, R> {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            redo: Vec::new(),
        }
    }
}

impl<K, R> fmt::Debug for TransactionLog<K, R>
where
    K: fmt::Debug,
    R: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionLog")
            .field("steps", &self.steps)
            .field("redo", &self.redo)
            .finish()
    }
}

impl<K, R> TransactionLog<K, R>
where
    K: PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step and forgets everything that was undone before it.
    ///
    /// Empty steps are ignored.
    pub fn push(&mut self, step: Step<K, R>) {
        if step.is_empty() {
            return;
        }
        self.redo.clear();
        self.steps.push(step);
    }

    /// Moves the most recent step to the redo buffer and returns it.
    pub fn undo(&mut self) -> Option<&Step<K, R>> {
        let step = self.steps.pop()?;
        self.redo.push(step);
        self.redo.last()
    }

    /// Moves the most recently undone step back onto the log and returns it.
    pub fn redo(&mut self) -> Option<&Step<K, R>> {
        let step = self.redo.pop()?;
        self.steps.push(step);
        self.steps.last()
    }

    /// The step `undo` would revert next.
    pub fn last_step(&self) -> Option<&Step<K, R>> {
        self.steps.last()
    }

    /// The step `redo` would re-apply next.
    pub fn last_undone(&self) -> Option<&Step<K, R>> {
        self.redo.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Iterates over every logged action in the order it was recorded.
    pub fn actions(&self) -> impl DoubleEndedIterator<Item = &Action<K, R>> {
        self.steps.iter().flatten()
    }

    /// Iterates over every logged transaction in the order it was recorded.
    pub fn transactions(&self) -> impl DoubleEndedIterator<Item = &Transaction<K, R>> {
        self.actions().map(|action| &action.transaction)
    }

    /// Returns the most recent transaction recorded for `id`.
    pub fn last_for(&self, id: &K) -> Option<&Transaction<K, R>> {
        self.transactions().rev().find(|tx| &tx.id == id)
    }

    /// Number of logged transactions.
    pub fn len(&self) -> usize {
        self.steps.iter().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Drops every action for `id` from the log and the redo buffer.
    ///
    /// Steps left without actions disappear, so undo skips straight to the previous change.
    pub fn forget(&mut self, id: &K) {
        for stack in [&mut self.steps, &mut self.redo] {
            for step in stack.iter_mut() {
                step.retain(|action| &action.transaction.id != id);
            }
            stack.retain(|step| !step.is_empty());
        }
    }

    pub fn clear(&mut self) {
        self.steps.clear();
        self.redo.clear();
    }
}
