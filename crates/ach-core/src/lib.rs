//! Achievement lifecycle engine
//!
//! Coordinates an achievement split across two stores:
//! - Permission checks (role table, ownership, advisor scope)
//! - State machine transitions with compare-and-swap on the ledger
//! - Create saga with compensation
//! - Best-effort history and notifications
//! - Out-of-band reconciliation sweep
//!
//! # Example
//!
//! ```rust,ignore
//! use ach_core::prelude::*;
//!
//! # async fn example(stores: Stores, student: Actor) -> WorkflowResult<()> {
//! let engine = WorkflowEngine::new(stores, EngineConfig::new());
//! let reference = engine
//!     .create(&student, AchievementContent::new("Robotics cup", "competition"))
//!     .await?;
//! engine.submit(&student, reference.id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod access;
pub mod config;
pub mod engine;
pub mod error;
pub mod sweep;

// Re-exports for convenience
pub use access::{permissions_for_role, Permission, PermissionResolver, PermissionSet};
pub use config::{ConfigError, EngineConfig, SweepConfig};
pub use engine::{AchievementDetail, AchievementPage, Stores, WorkflowEngine};
pub use error::{WorkflowError, WorkflowResult};
pub use sweep::{ReconciliationSweep, SweepReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{
        AchievementDetail, EngineConfig, Permission, ReconciliationSweep, Stores, WorkflowEngine,
        WorkflowError, WorkflowResult,
    };
    pub use ach_model::{AchievementContent, AchievementStatus, Actor, ReferenceId, Role};
    pub use ach_store::PageRequest;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
