//! Merge planner — §4.3. Given ≥2 root primaries, names the oldest the
//! survivor and folds the rest into it.

use crate::error::StoreError;
use crate::model::Contact;
use crate::mutator;
use crate::store::StoreTransaction;

/// A merge decision: `survivor` is the primary every loser will be
/// demoted under. `losers` must already be sorted ascending by
/// `(created_at, id)` — the caller (the reconciler) derives that order
/// from the same primary fetch that produced the survivor, so there is
/// no reason to re-sort here.
pub struct MergePlan<'a> {
    pub survivor: &'a Contact,
    pub losers: &'a [Contact],
}

impl<'a> MergePlan<'a> {
    /// Splits a `(created_at ASC, id ASC)`-sorted, non-empty slice of
    /// primaries into a survivor (the head) and losers (the rest).
    ///
    /// Panics if `primaries` is empty — the reconciler never calls the
    /// merge planner with zero primaries (a single match always resolves
    /// to at least one root).
    pub fn from_sorted_primaries(primaries: &'a [Contact]) -> Self {
        let (survivor, losers) = primaries
            .split_first()
            .expect("merge planner requires at least one primary");
        Self { survivor, losers }
    }
}

/// Executes a merge: demotes every loser and re-parents its children
/// onto the survivor. Losers are processed in the order given
/// (ascending `created_at` per §4.3) though the final state does not
/// depend on the order — re-parenting is idempotent and depth-one holds
/// after each individual step.
pub async fn execute(
    tx: &mut dyn StoreTransaction,
    plan: &MergePlan<'_>,
) -> Result<(), StoreError> {
    for loser in plan.losers {
        tracing::debug!(
            survivor_id = plan.survivor.id,
            loser_id = loser.id,
            "demoting loser and re-parenting its children"
        );
        mutator::demote_and_relink(tx, loser.id, plan.survivor.id).await?;
    }
    Ok(())
}
