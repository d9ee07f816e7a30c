//! In-memory reference implementations of the store traits.
//!
//! Deterministic and test-friendly. Production deployments use the
//! `postgres` feature for the ledger side and a real document database.

mod directory;
mod documents;
mod history;
mod ledger;
mod notifications;

pub use directory::InMemoryDirectory;
pub use documents::InMemoryDocumentStore;
pub use history::InMemoryHistoryLog;
pub use ledger::InMemoryLedger;
pub use notifications::InMemoryNotificationSink;

use crate::PageRequest;

pub(crate) fn apply_page<T>(values: Vec<T>, page: PageRequest) -> Vec<T> {
    let iter = values.into_iter().skip(page.offset());
    if page.limit == 0 {
        iter.collect()
    } else {
        iter.take(page.limit).collect()
    }
}
