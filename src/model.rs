//! The data model: a `Contact` row and its position in the identity graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a contact is the root of its identity group or points at one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precedence {
    Primary,
    Secondary,
}

impl Precedence {
    pub fn as_str(self) -> &'static str {
        match self {
            Precedence::Primary => "primary",
            Precedence::Secondary => "secondary",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "primary" => Some(Precedence::Primary),
            "secondary" => Some(Precedence::Secondary),
            _ => None,
        }
    }
}

/// One stored (email, phone) observation plus its graph position.
///
/// `email`/`phone` are stored exactly as handed to the engine — the core
/// does not re-validate or normalize beyond what the caller already did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linked_id: Option<i64>,
    pub precedence: Precedence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn is_primary(&self) -> bool {
        matches!(self.precedence, Precedence::Primary)
    }

    /// The id of the primary this row belongs to: itself if it is one,
    /// else its `linked_id`. Panics if called on a secondary with no
    /// `linked_id` — that state is an invariant violation the caller
    /// should have already rejected.
    pub fn root_id(&self) -> i64 {
        match self.precedence {
            Precedence::Primary => self.id,
            Precedence::Secondary => self
                .linked_id
                .expect("secondary contact without linked_id"),
        }
    }

}

/// The public, consolidated view of an identity group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedContact {
    pub primary_contact_id: i64,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub secondary_contact_ids: Vec<i64>,
}

/// An already-validated, already-normalized request the engine consumes.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
}

impl<'a> ReconcileInput<'a> {
    pub fn new(email: Option<&'a str>, phone: Option<&'a str>) -> Self {
        Self { email, phone }
    }

    pub fn has_any(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}
