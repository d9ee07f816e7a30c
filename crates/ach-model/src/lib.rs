//! Achievement model
//!
//! Domain types shared by the stores and the workflow engine:
//! - [`AchievementDocument`]: rich content held by the document store
//! - [`AchievementReference`]: canonical workflow state held by the ledger
//! - [`HistoryEntry`]: append-only transition records
//! - [`AchievementStatus`]: the closed status set and its state machine
//!
//! # Example
//!
//! ```rust
//! use ach_model::{validate_transition, AchievementStatus};
//!
//! assert!(validate_transition(AchievementStatus::Draft, AchievementStatus::Submitted).is_ok());
//! assert!(validate_transition(AchievementStatus::Verified, AchievementStatus::Rejected).is_err());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod actor;
pub mod document;
pub mod error;
pub mod history;
pub mod ids;
pub mod notification;
pub mod reference;
pub mod status;

pub use actor::{Actor, LecturerProfile, Role, StudentProfile};
pub use document::{AchievementContent, AchievementDocument, NewDocument};
pub use error::{ChainBreak, ModelError};
pub use history::{verify_chain, HistoryEntry, NewHistoryEntry};
pub use ids::{DocumentKey, HistoryId, LecturerId, NotificationId, ReferenceId, StudentId, UserId};
pub use notification::{NewNotification, Notification};
pub use reference::{AchievementReference, StatusChange};
pub use status::{allowed_transitions, validate_transition, AchievementStatus, TransitionError};
