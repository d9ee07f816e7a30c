//! Ledger references: canonical workflow state of one achievement

use crate::ids::{DocumentKey, ReferenceId, StudentId, UserId};
use crate::status::AchievementStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relational record holding the authoritative status of an achievement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementReference {
    pub id: ReferenceId,
    /// Owning student
    pub student_id: StudentId,
    /// Key of the content document (cross-store, not enforced by the ledger)
    pub document_key: DocumentKey,
    pub status: AchievementStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    /// Reviewer who verified or rejected
    pub verified_by: Option<UserId>,
    pub rejection_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AchievementReference {
    /// Fresh draft reference pointing at `document_key`
    #[must_use]
    pub fn draft(student_id: StudentId, document_key: DocumentKey, now: DateTime<Utc>) -> Self {
        Self {
            id: ReferenceId::new(),
            student_id,
            document_key,
            status: AchievementStatus::Draft,
            submitted_at: None,
            verified_at: None,
            verified_by: None,
            rejection_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `student` owns this reference
    #[inline]
    #[must_use]
    pub fn is_owned_by(&self, student: StudentId) -> bool {
        self.student_id == student
    }
}

/// Fields written by a status transition
///
/// Applied atomically by the ledger only if the stored status still equals the
/// expected prior status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Target status
    pub to: AchievementStatus,
    /// Transition time, written to `updated_at`
    pub at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<UserId>,
    pub rejection_note: Option<String>,
}

impl StatusChange {
    fn bare(to: AchievementStatus, at: DateTime<Utc>) -> Self {
        Self {
            to,
            at,
            submitted_at: None,
            verified_at: None,
            verified_by: None,
            rejection_note: None,
        }
    }

    /// `draft → submitted`
    #[must_use]
    pub fn submit(at: DateTime<Utc>) -> Self {
        Self {
            submitted_at: Some(at),
            ..Self::bare(AchievementStatus::Submitted, at)
        }
    }

    /// `submitted → verified`
    #[must_use]
    pub fn verify(by: UserId, at: DateTime<Utc>) -> Self {
        Self {
            verified_at: Some(at),
            verified_by: Some(by),
            ..Self::bare(AchievementStatus::Verified, at)
        }
    }

    /// `submitted → rejected`
    #[must_use]
    pub fn reject(by: UserId, note: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            verified_at: Some(at),
            verified_by: Some(by),
            rejection_note: Some(note.into()),
            ..Self::bare(AchievementStatus::Rejected, at)
        }
    }

    /// `draft → deleted`
    #[must_use]
    pub fn delete(at: DateTime<Utc>) -> Self {
        Self::bare(AchievementStatus::Deleted, at)
    }

    /// Write the change into `reference`; unset optional fields are left untouched.
    pub fn apply_to(&self, reference: &mut AchievementReference) {
        reference.status = self.to;
        reference.updated_at = self.at;
        if let Some(at) = self.submitted_at {
            reference.submitted_at = Some(at);
        }
        if let Some(at) = self.verified_at {
            reference.verified_at = Some(at);
        }
        if let Some(by) = self.verified_by {
            reference.verified_by = Some(by);
        }
        if let Some(note) = &self.rejection_note {
            reference.rejection_note = Some(note.clone());
        }
    }
}
