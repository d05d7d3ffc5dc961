// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Observe state changes of a transaction service.
//!
//! Observers are notified synchronously, after the mutation has completed and before the
//! mutating call returns. They are typically used by presentation layers to refresh whatever shows
//! the tracked records.
//!
//! Any `FnMut(&StateUpdateEvent<K, R>) + Send` closure is an [`Observer`]. For tests, the
//! [`RecordingObserver`] keeps a human readable line per event.

use crate::transaction::Action;
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

/// What caused a state update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateUpdateOrigin {
    Add,
    Undo,
    Redo,
    EndPending,
    Commit,
    Clear,
}

impl fmt::Display for StateUpdateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StateUpdateOrigin::Add => "add",
            StateUpdateOrigin::Undo => "undo",
            StateUpdateOrigin::Redo => "redo",
            StateUpdateOrigin::EndPending => "end-pending",
            StateUpdateOrigin::Commit => "commit",
            StateUpdateOrigin::Clear => "clear",
        })
    }
}

/// A notification about a completed state change.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdateEvent<K, R> {
    pub origin: StateUpdateOrigin,
    /// The actions that were added, undone, redone or committed.
    ///
    /// Empty for [`StateUpdateOrigin::Clear`].
    pub actions: Vec<Action<K, R>>,
}

/// Receives [`StateUpdateEvent`]s.
pub trait Observer<K, R>: Send {
    fn state_updated(&mut self, event: &StateUpdateEvent<K, R>);
}

impl<K, R, F> Observer<K, R> for F
where
    F: FnMut(&StateUpdateEvent<K, R>) + Send,
{
    fn state_updated(&mut self, event: &StateUpdateEvent<K, R>) {
        self(event)
    }
}

/// The observers registered with one service.
pub(crate) struct Observers<K, R> {
    observers: Vec<Box<dyn Observer<K, R>>>,
}

impl<K, R> Default for Observers<K, R> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
        }
    }
}

impl<K, R> Observers<K, R> {
    pub(crate) fn register(&mut self, observer: Box<dyn Observer<K, R>>) {
        self.observers.push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Builds the event lazily, so an unobserved service never clones actions.
    pub(crate) fn notify_with(
        &mut self,
        origin: StateUpdateOrigin,
        actions: impl FnOnce() -> Vec<Action<K, R>>,
    ) {
        if self.observers.is_empty() {
            return;
        }
        let event = StateUpdateEvent {
            origin,
            actions: actions(),
        };
        for observer in &mut self.observers {
            observer.state_updated(&event);
        }
    }
}

/// An observer that records every event as one line of text.
///
/// Clones share the same record, so keep one clone to inspect what the registered one saw.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    /// A string-representation of each event the observer has received.
    changes_seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lines recorded so far.
    pub fn changes_seen(&self) -> Vec<String> {
        self.changes_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<K, R> Observer<K, R> for RecordingObserver
where
    K: fmt::Display,
{
    fn state_updated(&mut self, event: &StateUpdateEvent<K, R>) {
        let actions: Vec<_> = event
            .actions
            .iter()
            .map(|action| action.transaction.to_string())
            .collect();
        self.changes_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{}: [{}]", event.origin, actions.join(", ")));
    }
}
