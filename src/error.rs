//! Error vocabulary for the reconciliation engine.
//!
//! Two layers: [`StoreError`] is what the south-bound adapter surfaces,
//! [`ReconcileError`] is what the engine surfaces to its caller. The
//! reconciler classifies every [`StoreError`] into a retry decision;
//! nothing here is swallowed.

use thiserror::Error;

/// Failures the store adapter can report back to the reconciler.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated on (email, phone, linked_id)")]
    UniqueConflict,

    #[error("transaction aborted due to a conflicting interleaving")]
    Serialization,

    #[error("transaction exceeded its time bound")]
    Timeout,

    #[error("store unreachable: {0}")]
    Unavailable(String),

    /// A write targeted a row that is not a live primary (e.g. `demote`
    /// racing a concurrent soft-delete or an already-demoted row).
    #[error("target row {0} is not a live primary")]
    NotLive(i64),

    /// A stored row could not be decoded — an unknown `precedence` value
    /// or similar schema drift. Always a programming/migration bug, never
    /// retried.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("driver error: {0}")]
    Driver(#[from] tokio_postgres::Error),

    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
}

/// Errors the reconciler surfaces to its north-bound caller.
///
/// This is the vocabulary from the error handling design: exactly six
/// kinds, none of which are ever silently downgraded.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Both `email` and `phone` were absent. Caller-side bug — the
    /// precondition is the caller's responsibility, so this is never
    /// produced by a malformed *value*, only by a missing pair.
    #[error("at least one of email or phone must be present")]
    InvalidPrecondition,

    /// The store rejected an insert on the `(email, phone, linked_id)`
    /// index. Retried once by the reconciler; surfaced if it recurs.
    #[error("unique constraint conflict")]
    UniqueConflict,

    /// The store aborted the transaction for serializability. Retried
    /// once by the reconciler; surfaced if it recurs.
    #[error("serialization failure")]
    Serialization,

    /// A transaction exceeded `max_wait` or `statement_timeout`.
    #[error("transaction timed out")]
    Timeout,

    /// A stored invariant was found broken while reading: a dangling
    /// `linked_id`, a secondary pointing at a non-primary, or a primary
    /// row that itself carries a `linked_id`. Never retried.
    #[error("identity graph invariant broken: {0}")]
    InvariantBroken(String),

    /// Transport or connectivity failure talking to the store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueConflict => ReconcileError::UniqueConflict,
            StoreError::Serialization => ReconcileError::Serialization,
            StoreError::Timeout => ReconcileError::Timeout,
            StoreError::Unavailable(msg) => ReconcileError::StoreUnavailable(msg),
            StoreError::NotLive(id) => {
                ReconcileError::InvariantBroken(format!("row {id} is not a live primary"))
            }
            StoreError::CorruptRow(msg) => ReconcileError::InvariantBroken(msg),
            StoreError::Driver(e) => ReconcileError::StoreUnavailable(e.to_string()),
            StoreError::Pool(e) => ReconcileError::StoreUnavailable(e.to_string()),
        }
    }
}

impl ReconcileError {
    /// Whether the reconciler should retry the whole attempt from stage 1.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconcileError::UniqueConflict | ReconcileError::Serialization)
    }
}
