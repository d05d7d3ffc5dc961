// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # txlog: In-Memory Change Tracking with Undo/Redo
//!
//! This crate provides a transaction log for editing collections of records in memory. Edits are
//! recorded as **transactions** (add, delete, update) against a record identity instead of being
//! applied to the data right away. The log can be undone and redone, inspected, merged over the
//! original records for display, and finally **committed** onto the real data collection in one
//! go.
//!
//! The typical consumer is an editing surface (a data grid, a form, a tree view) that needs to
//! show pending changes, let the user revert them, and write them back only when the user
//! confirms.
//!
//! ## Core Concepts
//!
//! - [`Transaction`]: one recorded intent to add, delete or update the record with a given
//!   identity.
//! - [`State`]: the aggregated effect of every transaction recorded for one identity. States are
//!   kept in a [`StateStore`] and always equal the fold of the log entries for that identity.
//! - [`TransactionLog`]: the ordered history of transactions, grouped into undo steps, plus a
//!   redo buffer for undone steps.
//! - **Pending sessions**: a temporary, isolated scope whose transactions are either discarded or
//!   folded into the log as a single undo step.
//! - [`Policy`](policy::Policy): decides which transactions are accepted and how aggregated values
//!   are exposed. [`Flat`](policy::Flat) tracks plain records,
//!   [`Hierarchical`](policy::Hierarchical) tracks records arranged in a parent/child tree.
//!
//! ## Type Precedence
//!
//! When several transactions touch the same identity, their kinds combine with the precedence
//! ADD > DELETE > UPDATE:
//!
//! - an ADD followed by UPDATEs stays an ADD, with the updates merged into the added record;
//! - a DELETE is terminal, later UPDATEs do not bring the record back;
//! - an ADD followed by a DELETE cancels out entirely.
//!
//! ## Getting Started
//!
//! ```rust
//! use serde_json::json;
//! use txlog::{Config, Transaction, TransactionService, TransactionType, json::KeyField};
//!
//! let mut data = vec![
//!     json!({ "id": 1, "name": "Alice", "age": 30 }),
//!     json!({ "id": 2, "name": "Bob", "age": 41 }),
//! ];
//! let mut service = TransactionService::<u32, serde_json::Value>::new(Config::default());
//!
//! // 1. RECORD EDITS
//! // Updates carry the changed fields and the record as it currently is.
//! service
//!     .add(Transaction::update(1, json!({ "name": "Alicia" })), Some(data[0].clone()))
//!     .unwrap();
//! service.add(Transaction::delete(2), Some(data[1].clone())).unwrap();
//! service
//!     .add(Transaction::add(3, json!({ "id": 3, "name": "Carol" })), None)
//!     .unwrap();
//!
//! // 2. READ THE EDITED VIEW
//! assert_eq!(
//!     service.aggregated_value(&1, true),
//!     Some(json!({ "id": 1, "name": "Alicia", "age": 30 }))
//! );
//! assert_eq!(service.state(&2).unwrap().kind, TransactionType::Delete);
//!
//! // 3. CHANGE YOUR MIND
//! service.undo();
//! assert!(service.state(&3).is_none());
//! service.redo();
//!
//! // 4. COMMIT
//! let report = service.commit(&mut data, KeyField("id")).unwrap();
//! assert!(report.is_complete());
//! assert_eq!(
//!     data,
//!     [
//!         json!({ "id": 1, "name": "Alicia", "age": 30 }),
//!         json!({ "id": 3, "name": "Carol" }),
//!     ]
//! );
//! assert_eq!(service.transaction_log().count(), 0);
//! ```
//!
//! ## Pending Sessions
//!
//! A pending session collects transactions without touching the log, for example while a row
//! is in edit mode. Ending the session with `commit = true` folds everything into one undo step;
//! `commit = false` throws it away.
//!
//! ```rust
//! use serde_json::json;
//! use txlog::{Transaction, TransactionService};
//!
//! let mut service = TransactionService::<u32, serde_json::Value>::default();
//! let row = json!({ "id": 1, "name": "A", "age": 30 });
//!
//! service.start_pending();
//! service.add(Transaction::update(1, json!({ "name": "B" })), Some(row.clone())).unwrap();
//! service.add(Transaction::update(1, json!({ "age": 31 })), Some(row.clone())).unwrap();
//! assert!(service.state(&1).is_none());
//! assert_eq!(service.aggregated_value(&1, false), Some(json!({ "name": "B", "age": 31 })));
//! service.end_pending(true);
//!
//! assert_eq!(service.transaction_log().count(), 1);
//! service.undo();
//! assert!(service.state(&1).is_none());
//! ```
//!
//! ## Scope of this Crate
//!
//! The log is an in-process, single-user change buffer. **It does not persist anything, sync
//! over a network, or resolve conflicts between users.** All operations are synchronous and
//! cheap; a multi-threaded host should guard a whole service with one `Mutex`.
//!
//! ## Observability
//!
//! Observers registered with
//! [`TransactionService::on_state_update`] are notified synchronously after every state change.
//! The crate logs through [`tracing`]; install a subscriber to see what it does.
//!
//! ## Features
//!
//! - `json`: Lets `serde_json::Value` be used as a record type. This feature is enabled by
//!   default.
//! - `serde`: Provides `serde` support for transactions, states and configuration.
//! - `arbitrary`: Implements `quickcheck::Arbitrary` for transaction types, useful for
//!   property-based testing.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub mod commit;
pub use commit::CommitReport;
pub mod config;
pub use config::Config;
pub mod error;
pub use error::TransactionError;
pub mod event;
pub use event::{Observer, StateUpdateEvent, StateUpdateOrigin};
#[cfg(feature = "json")]
pub mod json;
pub mod log;
pub use log::{Step, TransactionLog};
/// Macros usable for tests and initialization
pub mod macros;
pub mod pending;
pub mod policy;
pub mod record;
pub use record::{ChildRecords, Record, RecordKey};
pub mod service;
pub use service::{HierarchicalTransactionService, TransactionService};
pub mod state;
pub use state::{State, StateStore};
pub mod transaction;
pub use transaction::{Action, Transaction, TransactionType};

#[cfg(any(test, feature = "arbitrary"))]
mod arbitrary;
