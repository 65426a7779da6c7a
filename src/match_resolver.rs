//! Match resolver — §4.2. Finds the live contacts a request touches.
//!
//! This is a thin wrapper over [`StoreTransaction::find_live_matching`]:
//! the disjunctive-match semantics (an absent field drops its disjunct,
//! never matching a stored `NULL`) live in the store adapter because the
//! predicate has to be pushed down to the query. The wrapper exists so
//! the reconciler calls a named stage instead of a raw store method,
//! mirroring the five-stage pipeline in the design.

use crate::error::StoreError;
use crate::model::Contact;
use crate::store::StoreTransaction;

/// Returns every live contact whose `email` equals the request's email,
/// or whose `phone` equals the request's phone, ordered by
/// `created_at ASC, id ASC`.
///
/// The caller is responsible for the precondition that at least one of
/// `email`/`phone` is present — this function does not special-case the
/// all-absent case, it simply asks the store, which would otherwise
/// match nothing.
pub async fn find_matches(
    tx: &mut dyn StoreTransaction,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<Vec<Contact>, StoreError> {
    tx.find_live_matching(email, phone).await
}
