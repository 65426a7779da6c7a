//! Reconciler — §4.1. The orchestrator: one transactional attempt per
//! call, sequencing match → resolve roots → merge → attach → respond,
//! with a single bounded retry on a retryable store error.

use crate::error::ReconcileError;
use crate::match_resolver;
use crate::merge::{self, MergePlan};
use crate::model::{Contact, ConsolidatedContact, ReconcileInput};
use crate::mutator;
use crate::response;
use crate::store::{Store, StoreTransaction};

/// The engine's single entry point. Constructed once with a store handle
/// and a retry budget, then called per request — it holds no mutable
/// state between calls (§5 "shared resources").
pub struct Reconciler<S> {
    store: S,
    retry_attempts: u8,
}

impl<S: Store> Reconciler<S> {
    /// `retry_attempts` is the number of *extra* attempts after the
    /// first — the spec's "one full retry" is `retry_attempts = 1`.
    pub fn new(store: S, retry_attempts: u8) -> Self {
        Self { store, retry_attempts }
    }

    /// Runs the full reconciliation, retrying once on a retryable error
    /// (`UniqueConflict` or `Serialization`) with a fresh transaction and
    /// fresh reads. A second failure of any kind is surfaced as-is.
    pub async fn reconcile(
        &self,
        input: ReconcileInput<'_>,
    ) -> Result<ConsolidatedContact, ReconcileError> {
        if !input.has_any() {
            return Err(ReconcileError::InvalidPrecondition);
        }

        let mut last_err = None;
        for attempt in 0..=self.retry_attempts {
            match self.attempt(input).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_retryable() && attempt < self.retry_attempts => {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "retryable error — re-running reconciliation from a fresh snapshot"
                    );
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        // Unreachable unless retry_attempts == 0 and the loop above
        // already returned; kept defensive rather than `unreachable!()`
        // since `last_err` is always `Some` by the time we get here.
        Err(last_err.expect("loop always returns or records an error before exiting"))
    }

    /// One transactional attempt: begin, run the pipeline, commit on
    /// success or roll back on any error.
    async fn attempt(
        &self,
        input: ReconcileInput<'_>,
    ) -> Result<ConsolidatedContact, ReconcileError> {
        let mut tx = self.store.begin().await?;

        match run_pipeline(tx.as_mut(), input).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            }
            Err(err) => {
                // Best-effort rollback; the original error is what the
                // caller needs to see either way.
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback after failed attempt also failed");
                }
                Err(err)
            }
        }
    }
}

/// Stages 1–5 of §4.1, run against a single open transaction.
async fn run_pipeline(
    tx: &mut dyn StoreTransaction,
    input: ReconcileInput<'_>,
) -> Result<ConsolidatedContact, ReconcileError> {
    tracing::debug!(
        email_present = input.email.is_some(),
        phone_present = input.phone.is_some(),
        "matching existing contacts"
    );
    let matches = match_resolver::find_matches(tx, input.email, input.phone).await?;

    if matches.is_empty() {
        tracing::info!("no match — creating new primary");
        let primary = mutator::create_primary(tx, input.email, input.phone).await?;
        return Ok(response::build(&primary, &[]));
    }

    let primaries = resolve_root_primaries(tx, &matches).await?;
    let plan = MergePlan::from_sorted_primaries(&primaries);
    let survivor = plan.survivor.clone();

    if !plan.losers.is_empty() {
        tracing::info!(
            survivor_id = survivor.id,
            loser_count = plan.losers.len(),
            "merging groups under survivor"
        );
        merge::execute(tx, &plan).await?;
    }

    // Re-read the full group post-merge: the initial match may not have
    // covered every secondary already in the survivor's group.
    let group = tx.find_live_group(survivor.id).await?;
    let carries_new_email = input
        .email
        .is_some_and(|e| !group.iter().any(|row| row.email.as_deref() == Some(e)));
    let carries_new_phone = input
        .phone
        .is_some_and(|p| !group.iter().any(|row| row.phone.as_deref() == Some(p)));
    let carries_new_info = carries_new_email || carries_new_phone;

    let mut secondaries: Vec<Contact> =
        group.into_iter().filter(|row| row.id != survivor.id).collect();

    if carries_new_info {
        tracing::info!(survivor_id = survivor.id, "attaching new secondary");
        let new_secondary =
            mutator::attach_secondary(tx, survivor.id, input.email, input.phone).await?;
        secondaries.push(new_secondary);
    } else {
        tracing::debug!(survivor_id = survivor.id, "no new information — no write");
    }

    Ok(response::build(&survivor, &secondaries))
}

/// Projects a set of matched contacts onto the distinct primaries that
/// root them, fetches those primaries, and returns them sorted by
/// `(created_at ASC, id ASC)` — survivor first, per §4.1 step 2.
async fn resolve_root_primaries(
    tx: &mut dyn StoreTransaction,
    matches: &[Contact],
) -> Result<Vec<Contact>, ReconcileError> {
    let mut root_ids: Vec<i64> = matches.iter().map(Contact::root_id).collect();
    root_ids.sort_unstable();
    root_ids.dedup();

    let mut primaries = tx.find_live_by_ids(&root_ids).await?;

    if primaries.len() != root_ids.len() {
        return Err(ReconcileError::InvariantBroken(
            "a matched row's linked_id points at a primary that is not live".to_string(),
        ));
    }
    if let Some(bad) = primaries.iter().find(|row| !row.is_primary()) {
        return Err(ReconcileError::InvariantBroken(format!(
            "row {} resolved as a root but is not a primary",
            bad.id
        )));
    }

    primaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(primaries)
}
