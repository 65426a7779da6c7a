//! In-memory [`Store`] double — no database required. Used by the unit
//! tests in every stage module plus the property-based suite; each
//! transaction works against a private snapshot of the table and only
//! publishes it back on commit, giving the same read-your-writes and
//! rollback semantics the real store provides without needing Postgres.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::StoreError;
use crate::model::{Contact, Precedence};

use super::{Store, StoreTransaction};

#[derive(Debug, Clone, Default)]
struct FakeDb {
    rows: Vec<Contact>,
    next_id: i64,
}

impl FakeDb {
    fn live(&self) -> impl Iterator<Item = &Contact> {
        self.rows.iter().filter(|c| c.deleted_at.is_none())
    }
}

/// A hermetic, in-process stand-in for a transactional Postgres store.
/// Every [`begin`](Store::begin) acquires the same lock, so at most one
/// transaction is ever in flight — trivially serializable, which is all
/// a fake needs to be for deterministic unit tests.
#[derive(Clone)]
pub struct FakeStore {
    inner: Arc<Mutex<FakeDb>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeDb::default())),
        }
    }

    /// Snapshot of every row (including soft-deleted ones, for tests that
    /// want to assert nothing changed at all). Not part of the `Store`
    /// trait — it's a test-only inspection hook.
    pub async fn snapshot(&self) -> Vec<Contact> {
        self.inner.lock().await.rows.clone()
    }
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = self.inner.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(FakeTransaction { guard, working }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct FakeTransaction {
    guard: OwnedMutexGuard<FakeDb>,
    working: FakeDb,
}

#[async_trait]
impl StoreTransaction for FakeTransaction {
    async fn find_live_matching(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>, StoreError> {
        let mut hits: Vec<Contact> = self
            .working
            .live()
            .filter(|c| {
                (email.is_some() && c.email.as_deref() == email)
                    || (phone.is_some() && c.phone.as_deref() == phone)
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(hits)
    }

    async fn find_live_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Contact>, StoreError> {
        let mut hits: Vec<Contact> = self
            .working
            .live()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(hits)
    }

    async fn find_live_group(&mut self, primary_id: i64) -> Result<Vec<Contact>, StoreError> {
        let mut hits: Vec<Contact> = self
            .working
            .live()
            .filter(|c| c.id == primary_id || c.linked_id == Some(primary_id))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(hits)
    }

    async fn insert_contact(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
        linked_id: Option<i64>,
        precedence: Precedence,
    ) -> Result<Contact, StoreError> {
        // Mirrors Postgres' default NULLS DISTINCT behavior on the
        // composite `(email, phone, linked_id)` unique index: a NULL in
        // any of the three columns makes that row distinct from every
        // other row, even one that is also NULL there. Only a triple
        // that is fully non-null can actually collide.
        let conflict = email.is_some()
            && phone.is_some()
            && linked_id.is_some()
            && self.working.live().any(|c| {
                c.email.as_deref() == email
                    && c.phone.as_deref() == phone
                    && c.linked_id == linked_id
            });
        if conflict {
            return Err(StoreError::UniqueConflict);
        }

        let id = self.working.next_id + 1;
        self.working.next_id = id;
        let now = Utc::now();
        let row = Contact {
            id,
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            linked_id,
            precedence,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.working.rows.push(row.clone());
        Ok(row)
    }

    async fn demote(&mut self, id: i64, linked_id: i64) -> Result<(), StoreError> {
        let row = self
            .working
            .rows
            .iter_mut()
            .find(|c| c.id == id && c.deleted_at.is_none() && c.is_primary())
            .ok_or(StoreError::NotLive(id))?;
        row.precedence = Precedence::Secondary;
        row.linked_id = Some(linked_id);
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn relink_children(
        &mut self,
        from_linked_id: i64,
        to_linked_id: i64,
    ) -> Result<u64, StoreError> {
        let mut touched = 0u64;
        for row in self.working.rows.iter_mut() {
            if row.deleted_at.is_none() && row.linked_id == Some(from_linked_id) {
                row.linked_id = Some(to_linked_id);
                row.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // `working` is dropped without being written back; `guard` is
        // released unchanged.
        Ok(())
    }
}
