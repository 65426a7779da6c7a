//! Store abstraction — the reconciler's south-bound interface.
//!
//! A backend-agnostic `Store` trait and the `StoreTransaction` it hands
//! out, plus two implementations: [`postgres::PgStore`] for production,
//! and [`testing::FakeStore`] for hermetic tests (unit tests and the
//! property-based suite don't need a running database).

pub mod postgres;
pub mod testing;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Contact, Precedence};

/// A single transactional attempt. Every method here corresponds 1:1 to
/// an operation the reconciler's stages need; there is no query surface
/// beyond this.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Disjunctive match on `email` or `phone`, live rows only, ordered
    /// by `created_at ASC, id ASC`. A `None` field drops that disjunct —
    /// it is never matched against a stored `NULL`.
    async fn find_live_matching(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>, StoreError>;

    /// Batched fetch by id, live rows only, ordered by `created_at ASC, id ASC`.
    async fn find_live_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Contact>, StoreError>;

    /// The primary plus all of its live secondaries, ordered by `created_at ASC, id ASC`.
    async fn find_live_group(&mut self, primary_id: i64) -> Result<Vec<Contact>, StoreError>;

    /// Inserts a new row. May fail with `StoreError::UniqueConflict` if
    /// `(email, phone, linked_id)` already exists among live rows.
    async fn insert_contact(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
        linked_id: Option<i64>,
        precedence: Precedence,
    ) -> Result<Contact, StoreError>;

    /// Flips a live primary to a secondary pointing at `linked_id`.
    async fn demote(&mut self, id: i64, linked_id: i64) -> Result<(), StoreError>;

    /// Bulk re-parents every live secondary whose `linked_id` is
    /// `from_linked_id` to point at `to_linked_id` instead. Returns the
    /// number of rows touched.
    async fn relink_children(
        &mut self,
        from_linked_id: i64,
        to_linked_id: i64,
    ) -> Result<u64, StoreError>;

    /// Commits the attempt. Consumes the transaction.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Rolls back the attempt. Consumes the transaction.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// The store handle the reconciler is constructed with. One `Store` is
/// built once at process start and passed in by value — there is no
/// hidden global connection pool.
#[async_trait]
pub trait Store: Send + Sync {
    /// Starts a new transactional attempt at serializable isolation,
    /// bounded by the store's configured `max_wait`/`statement_timeout`.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// A trivial round-trip query used by external health checks. Never
    /// called by the reconciler itself.
    async fn ping(&self) -> Result<(), StoreError>;
}
