// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Errors reported by the transaction service.
//!
//! None of these are fatal. A rejected operation leaves the service exactly as it was before the
//! call.

use crate::transaction::TransactionType;

/// Why a transaction service refused an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// The service was configured with transactions disabled (pass-through mode).
    #[error("transactions are disabled")]
    Disabled,

    /// An ADD or UPDATE transaction arrived without a payload.
    #[error("{kind} transaction carries no value")]
    MissingValue { kind: TransactionType },

    /// A parent identity was attached to something other than an ADD.
    #[error("parent id is only valid on ADD transactions, got {kind}")]
    ParentOnNonAdd { kind: TransactionType },

    /// A parent identity was attached to a transaction for a flat service.
    #[error("parent linkage requires a hierarchical transaction service")]
    ParentUnsupported,

    /// The operation would touch the outer log while a pending session is open.
    #[error("operation not allowed while a pending session is active")]
    PendingSession,
}
