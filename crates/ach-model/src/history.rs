//! Append-only transition history

use crate::error::{ChainBreak, ModelError};
use crate::ids::{HistoryId, ReferenceId, UserId};
use crate::status::{validate_transition, AchievementStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub reference_id: ReferenceId,
    pub old_status: AchievementStatus,
    pub new_status: AchievementStatus,
    /// Account that caused the transition
    pub changed_by: UserId,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// History entry before the log assigns its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub reference_id: ReferenceId,
    pub old_status: AchievementStatus,
    pub new_status: AchievementStatus,
    pub changed_by: UserId,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl NewHistoryEntry {
    /// Record `from → to` on `reference_id` by `actor`
    #[must_use]
    pub fn new(
        reference_id: ReferenceId,
        from: AchievementStatus,
        to: AchievementStatus,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            reference_id,
            old_status: from,
            new_status: to,
            changed_by: actor,
            note: None,
            changed_at: at,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Materialize with a fresh id
    #[must_use]
    pub fn into_entry(self) -> HistoryEntry {
        HistoryEntry {
            id: HistoryId::new(),
            reference_id: self.reference_id,
            old_status: self.old_status,
            new_status: self.new_status,
            changed_by: self.changed_by,
            note: self.note,
            changed_at: self.changed_at,
        }
    }
}

/// Verify that `entries` (chronological) form a valid chain for `reference`.
///
/// The first entry must leave `draft`; each subsequent `old_status` must equal
/// the previous `new_status`; every edge must exist in the state machine.
/// An empty history is valid (a reference still in `draft`).
pub fn verify_chain(reference: ReferenceId, entries: &[HistoryEntry]) -> Result<(), ModelError> {
    let broken = |index, reason| ModelError::BrokenChain {
        reference,
        index,
        reason,
    };

    let mut expected = AchievementStatus::Draft;
    let mut last_at: Option<DateTime<Utc>> = None;

    for (index, entry) in entries.iter().enumerate() {
        if entry.reference_id != reference {
            return Err(broken(index, ChainBreak::ForeignEntry));
        }
        if entry.old_status != expected {
            let reason = if index == 0 {
                ChainBreak::BadOrigin(entry.old_status)
            } else {
                ChainBreak::Discontinuity {
                    expected,
                    found: entry.old_status,
                }
            };
            return Err(broken(index, reason));
        }
        if validate_transition(entry.old_status, entry.new_status).is_err() {
            return Err(broken(
                index,
                ChainBreak::IllegalEdge {
                    from: entry.old_status,
                    to: entry.new_status,
                },
            ));
        }
        if last_at.is_some_and(|prev| entry.changed_at < prev) {
            return Err(broken(index, ChainBreak::OutOfOrder));
        }
        expected = entry.new_status;
        last_at = Some(entry.changed_at);
    }
    Ok(())
}
