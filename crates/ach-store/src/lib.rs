//! Achievement stores
//!
//! Storage contracts used by the workflow engine:
//! - [`DocumentStore`]: schema-flexible content, keyed by [`DocumentKey`](ach_model::DocumentKey)
//! - [`ReferenceLedger`]: authoritative status with compare-and-swap updates
//! - [`HistoryLog`]: append-only transitions
//! - [`NotificationSink`]: best-effort side channel
//! - [`ProfileDirectory`]: student/lecturer lookups
//!
//! [`memory`] holds in-process implementations. The `postgres` feature adds
//! [`postgres::PostgresAchievementStore`], which implements every trait.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{StoreError, StoreResult};
pub use traits::{
    DocumentStore, HistoryLog, NotificationSink, PageRequest, ProfileDirectory, ReferenceLedger,
};
