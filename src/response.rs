//! Response builder — §4.5. Deterministically flattens a group (a
//! survivor plus its live secondaries) into the public payload.

use crate::model::{Contact, ConsolidatedContact};

/// Builds the consolidated payload from a survivor and its secondaries.
///
/// `secondaries` need not be pre-sorted — this function sorts them by
/// `(created_at ASC, id ASC)` itself so every caller gets the same
/// ordering guarantee regardless of how the group was assembled.
pub fn build(survivor: &Contact, secondaries: &[Contact]) -> ConsolidatedContact {
    let mut ordered: Vec<&Contact> = secondaries.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut emails = Vec::new();
    let mut phone_numbers = Vec::new();

    if let Some(email) = &survivor.email {
        emails.push(email.clone());
    }
    if let Some(phone) = &survivor.phone {
        phone_numbers.push(phone.clone());
    }

    let mut secondary_contact_ids = Vec::with_capacity(ordered.len());
    for row in ordered {
        if let Some(email) = &row.email {
            if !emails.contains(email) {
                emails.push(email.clone());
            }
        }
        if let Some(phone) = &row.phone {
            if !phone_numbers.contains(phone) {
                phone_numbers.push(phone.clone());
            }
        }
        secondary_contact_ids.push(row.id);
    }

    ConsolidatedContact {
        primary_contact_id: survivor.id,
        emails,
        phone_numbers,
        secondary_contact_ids,
    }
}
