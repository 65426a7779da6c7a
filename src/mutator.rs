//! Mutator — §4.4. The only component that writes. Three operations:
//! `create_primary`, `attach_secondary`, `demote_and_relink`. Centralizing
//! writes here keeps unique-constraint handling (and its mapping onto
//! [`StoreError::UniqueConflict`]) in one place instead of scattered
//! across the reconciler and merge planner.

use crate::error::StoreError;
use crate::model::{Contact, Precedence};
use crate::store::StoreTransaction;

/// Inserts a brand-new primary: no prior match existed for the request.
pub async fn create_primary(
    tx: &mut dyn StoreTransaction,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<Contact, StoreError> {
    tx.insert_contact(email, phone, None, Precedence::Primary).await
}

/// Inserts a new secondary under an existing survivor — either because
/// the request carries new information about an existing group, or
/// because a merge demoted another primary and it is being re-attached
/// as a child of the survivor (merges use [`demote_and_relink`] instead,
/// this path is only for attaching genuinely new rows).
pub async fn attach_secondary(
    tx: &mut dyn StoreTransaction,
    survivor_id: i64,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<Contact, StoreError> {
    tx.insert_contact(email, phone, Some(survivor_id), Precedence::Secondary)
        .await
}

/// Demotes `loser_id` to a secondary of `survivor_id` and re-parents
/// every one of the loser's former children onto the survivor — the two
/// writes §4.3 describes for folding one primary into another.
pub async fn demote_and_relink(
    tx: &mut dyn StoreTransaction,
    loser_id: i64,
    survivor_id: i64,
) -> Result<(), StoreError> {
    tx.demote(loser_id, survivor_id).await?;
    tx.relink_children(loser_id, survivor_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FakeStore;
    use crate::store::Store;

    #[tokio::test]
    async fn create_primary_has_no_linked_id() {
        let store = FakeStore::new();
        let mut tx = store.begin().await.unwrap();
        let c = create_primary(tx.as_mut(), Some("a@b.com"), None).await.unwrap();
        assert!(c.is_primary());
        assert!(c.linked_id.is_none());
    }

    #[tokio::test]
    async fn attach_secondary_points_at_survivor() {
        let store = FakeStore::new();
        let mut tx = store.begin().await.unwrap();
        let primary = create_primary(tx.as_mut(), Some("a@b.com"), None).await.unwrap();
        let secondary = attach_secondary(tx.as_mut(), primary.id, None, Some("100"))
            .await
            .unwrap();
        assert!(!secondary.is_primary());
        assert_eq!(secondary.linked_id, Some(primary.id));
    }

    #[tokio::test]
    async fn demote_and_relink_moves_children_to_survivor() {
        let store = FakeStore::new();
        let mut tx = store.begin().await.unwrap();
        let survivor = create_primary(tx.as_mut(), Some("george@hv.edu"), Some("919191"))
            .await
            .unwrap();
        let loser = create_primary(tx.as_mut(), Some("biff@hv.edu"), Some("717171"))
            .await
            .unwrap();
        let child = attach_secondary(tx.as_mut(), loser.id, Some("biff2@hv.edu"), None)
            .await
            .unwrap();

        demote_and_relink(tx.as_mut(), loser.id, survivor.id)
            .await
            .unwrap();

        let group = tx.find_live_group(survivor.id).await.unwrap();
        let ids: Vec<i64> = group.iter().map(|c| c.id).collect();
        assert!(ids.contains(&loser.id));
        assert!(ids.contains(&child.id));
        for row in &group {
            if row.id != survivor.id {
                assert_eq!(row.linked_id, Some(survivor.id));
            }
        }
    }
}
