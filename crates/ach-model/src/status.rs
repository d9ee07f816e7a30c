//! Achievement status and its state machine
//!
//! ```text
//!   draft ──submit──▶ submitted ──verify──▶ verified
//!     │                   └──────reject──▶ rejected
//!     └──delete──▶ deleted
//! ```
//!
//! `verified`, `rejected` and `deleted` are terminal.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow status of an achievement reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementStatus {
    /// Created, editable by its owner
    Draft,
    /// Awaiting advisor review
    Submitted,
    /// Accepted by an advisor or admin
    Verified,
    /// Refused by an advisor or admin, with a note
    Rejected,
    /// Soft-deleted by its owner while still a draft
    Deleted,
}

impl AchievementStatus {
    /// Every status, in lifecycle order
    pub const ALL: [AchievementStatus; 5] = [
        AchievementStatus::Draft,
        AchievementStatus::Submitted,
        AchievementStatus::Verified,
        AchievementStatus::Rejected,
        AchievementStatus::Deleted,
    ];

    /// Canonical lowercase name, as persisted in the ledger
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementStatus::Draft => "draft",
            AchievementStatus::Submitted => "submitted",
            AchievementStatus::Verified => "verified",
            AchievementStatus::Rejected => "rejected",
            AchievementStatus::Deleted => "deleted",
        }
    }

    /// No outgoing edges
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        allowed_transitions(*self).is_empty()
    }
}

impl fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AchievementStatus::Draft),
            "submitted" => Ok(AchievementStatus::Submitted),
            "verified" => Ok(AchievementStatus::Verified),
            "rejected" => Ok(AchievementStatus::Rejected),
            "deleted" => Ok(AchievementStatus::Deleted),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// A requested edge that the state machine does not contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to}")]
pub struct TransitionError {
    /// Current status
    pub from: AchievementStatus,
    /// Requested status
    pub to: AchievementStatus,
}

/// Validates a status transition against the lifecycle table.
pub fn validate_transition(
    from: AchievementStatus,
    to: AchievementStatus,
) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// Outgoing edges of `from`.
#[must_use]
pub fn allowed_transitions(from: AchievementStatus) -> &'static [AchievementStatus] {
    match from {
        AchievementStatus::Draft => &[AchievementStatus::Submitted, AchievementStatus::Deleted],
        AchievementStatus::Submitted => &[AchievementStatus::Verified, AchievementStatus::Rejected],
        AchievementStatus::Verified | AchievementStatus::Rejected | AchievementStatus::Deleted => {
            &[]
        }
    }
}
