use crate::traits::HistoryLog;
use crate::StoreResult;
use ach_model::{HistoryEntry, NewHistoryEntry, ReferenceId};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Append-only history held in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryHistoryLog {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Every entry across all references.
    pub fn all(&self) -> Vec<HistoryEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl HistoryLog for InMemoryHistoryLog {
    async fn append(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry> {
        let entry = entry.into_entry();
        self.entries.lock().push(entry.clone());
        Ok(entry)
    }

    async fn list_for_reference(&self, reference: ReferenceId) -> StoreResult<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> = self
            .entries
            .lock()
            .iter()
            .filter(|e| e.reference_id == reference)
            .cloned()
            .collect();
        // stable: equal timestamps keep append order
        entries.sort_by_key(|e| e.changed_at);
        Ok(entries)
    }
}
