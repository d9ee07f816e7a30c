//! Errors raised while building or parsing model values

use crate::ids::ReferenceId;
use crate::status::AchievementStatus;

/// Model-level error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Status string outside the closed set
    #[error("unknown achievement status `{0}`")]
    UnknownStatus(String),

    /// Role string outside the closed set
    #[error("unknown role `{0}`")]
    UnknownRole(String),

    /// Permission string not of the form `resource:action`
    #[error("malformed permission `{0}`")]
    MalformedPermission(String),

    /// A required field is missing or blank
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// History entries do not form a valid chain
    #[error("broken history chain for {reference} at entry {index}: {reason}")]
    BrokenChain {
        /// Reference whose history is broken
        reference: ReferenceId,
        /// Position of the offending entry
        index: usize,
        /// What went wrong
        reason: ChainBreak,
    },
}

/// Reason a history chain failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChainBreak {
    /// First entry does not start from the creation state
    #[error("first entry starts from {0} instead of draft")]
    BadOrigin(AchievementStatus),

    /// `old_status` does not match the preceding `new_status`
    #[error("expected old status {expected}, found {found}")]
    Discontinuity {
        /// Preceding entry's new status
        expected: AchievementStatus,
        /// This entry's old status
        found: AchievementStatus,
    },

    /// Edge is not part of the state machine
    #[error("illegal edge {from} -> {to}")]
    IllegalEdge {
        /// Old status
        from: AchievementStatus,
        /// New status
        to: AchievementStatus,
    },

    /// Entry belongs to another reference
    #[error("entry belongs to a different reference")]
    ForeignEntry,

    /// Timestamps go backwards
    #[error("entry recorded before its predecessor")]
    OutOfOrder,
}
