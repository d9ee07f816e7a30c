use super::apply_page;
use crate::traits::{PageRequest, ReferenceLedger};
use crate::{StoreError, StoreResult};
use ach_model::{
    AchievementReference, AchievementStatus, DocumentKey, ReferenceId, StatusChange, StudentId,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct LedgerState {
    by_id: HashMap<ReferenceId, AchievementReference>,
    by_document: HashMap<DocumentKey, ReferenceId>,
}

/// Reference ledger guarded by a single lock.
///
/// The status compare-and-swap runs under the write lock, which gives the
/// same guarantee as `UPDATE ... WHERE status = $expected` on a real ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every reference, in no particular order.
    pub fn all(&self) -> Vec<AchievementReference> {
        self.state.read().by_id.values().cloned().collect()
    }
}

#[async_trait]
impl ReferenceLedger for InMemoryLedger {
    async fn insert_reference(&self, reference: &AchievementReference) -> StoreResult<()> {
        let mut state = self.state.write();
        if state.by_id.contains_key(&reference.id) {
            return Err(StoreError::Conflict(format!(
                "reference {} already exists",
                reference.id
            )));
        }
        if state.by_document.contains_key(&reference.document_key) {
            return Err(StoreError::Conflict(format!(
                "document {} is already referenced",
                reference.document_key
            )));
        }
        state
            .by_document
            .insert(reference.document_key.clone(), reference.id);
        state.by_id.insert(reference.id, reference.clone());
        Ok(())
    }

    async fn get_reference(&self, id: ReferenceId) -> StoreResult<AchievementReference> {
        self.state
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("reference {id} not found")))
    }

    async fn get_reference_by_document_key(
        &self,
        key: &DocumentKey,
    ) -> StoreResult<AchievementReference> {
        let state = self.state.read();
        state
            .by_document
            .get(key)
            .and_then(|id| state.by_id.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("no reference for document {key}")))
    }

    async fn conditional_update_status(
        &self,
        id: ReferenceId,
        expected: AchievementStatus,
        change: &StatusChange,
    ) -> StoreResult<AchievementReference> {
        let mut state = self.state.write();
        let reference = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("reference {id} not found")))?;

        if reference.status != expected {
            return Err(StoreError::Conflict(format!(
                "reference {id} is {}, expected {expected}",
                reference.status
            )));
        }

        change.apply_to(reference);
        Ok(reference.clone())
    }

    async fn list_references_by_students(
        &self,
        students: &[StudentId],
        statuses: &[AchievementStatus],
        page: PageRequest,
    ) -> StoreResult<Vec<AchievementReference>> {
        Ok(self.newest_first(|r| students.contains(&r.student_id), statuses, page))
    }

    async fn list_references(
        &self,
        statuses: &[AchievementStatus],
        page: PageRequest,
    ) -> StoreResult<Vec<AchievementReference>> {
        Ok(self.newest_first(|_| true, statuses, page))
    }
}

impl InMemoryLedger {
    fn newest_first(
        &self,
        keep: impl Fn(&AchievementReference) -> bool,
        statuses: &[AchievementStatus],
        page: PageRequest,
    ) -> Vec<AchievementReference> {
        let state = self.state.read();
        let mut values: Vec<AchievementReference> = state
            .by_id
            .values()
            .filter(|r| keep(r))
            .filter(|r| statuses.is_empty() || statuses.contains(&r.status))
            .cloned()
            .collect();
        values.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        apply_page(values, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ach_model::UserId;
    use chrono::{Duration, Utc};

    fn draft(student: StudentId) -> AchievementReference {
        AchievementReference::draft(student, DocumentKey::generate(), Utc::now())
    }

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let ledger = InMemoryLedger::new();
        let reference = draft(StudentId::new());
        ledger.insert_reference(&reference).await.unwrap();

        let again = ledger.insert_reference(&reference).await.unwrap_err();
        assert!(matches!(again, StoreError::Conflict(_)));

        let mut same_document = draft(reference.student_id);
        same_document.document_key = reference.document_key.clone();
        assert!(matches!(
            ledger.insert_reference(&same_document).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn lookup_by_document_key() {
        let ledger = InMemoryLedger::new();
        let reference = draft(StudentId::new());
        ledger.insert_reference(&reference).await.unwrap();

        let found = ledger
            .get_reference_by_document_key(&reference.document_key)
            .await
            .unwrap();
        assert_eq!(found.id, reference.id);
        assert!(ledger
            .get_reference_by_document_key(&DocumentKey::generate())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn conditional_update_is_compare_and_swap() {
        let ledger = InMemoryLedger::new();
        let reference = draft(StudentId::new());
        ledger.insert_reference(&reference).await.unwrap();

        let now = Utc::now();
        let updated = ledger
            .conditional_update_status(reference.id, AchievementStatus::Draft, &StatusChange::submit(now))
            .await
            .unwrap();
        assert_eq!(updated.status, AchievementStatus::Submitted);
        assert_eq!(updated.submitted_at, Some(now));

        // stale expectation loses
        let stale = ledger
            .conditional_update_status(reference.id, AchievementStatus::Draft, &StatusChange::delete(now))
            .await
            .unwrap_err();
        assert!(matches!(stale, StoreError::Conflict(_)));
        assert_eq!(
            ledger.get_reference(reference.id).await.unwrap().status,
            AchievementStatus::Submitted
        );

        let missing = ledger
            .conditional_update_status(
                ReferenceId::new(),
                AchievementStatus::Submitted,
                &StatusChange::verify(UserId::new(), now),
            )
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn concurrent_swaps_have_one_winner() {
        let ledger = std::sync::Arc::new(InMemoryLedger::new());
        let reference = draft(StudentId::new());
        ledger.insert_reference(&reference).await.unwrap();
        ledger
            .conditional_update_status(
                reference.id,
                AchievementStatus::Draft,
                &StatusChange::submit(Utc::now()),
            )
            .await
            .unwrap();

        let tasks = (0..8).map(|i| {
            let ledger = ledger.clone();
            let change = if i % 2 == 0 {
                StatusChange::verify(UserId::new(), Utc::now())
            } else {
                StatusChange::reject(UserId::new(), "no", Utc::now())
            };
            tokio::spawn(async move {
                ledger
                    .conditional_update_status(reference.id, AchievementStatus::Submitted, &change)
                    .await
            })
        });
        let results = futures::future::join_all(tasks).await;
        let wins = results
            .into_iter()
            .filter(|r| r.as_ref().unwrap().is_ok())
            .count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn listing_filters_and_pages_newest_first() {
        let ledger = InMemoryLedger::new();
        let alice = StudentId::new();
        let bob = StudentId::new();
        let base = Utc::now();

        for i in 0..5 {
            let mut r = draft(alice);
            r.created_at = base + Duration::seconds(i);
            ledger.insert_reference(&r).await.unwrap();
        }
        ledger.insert_reference(&draft(bob)).await.unwrap();

        let page1 = ledger
            .list_references_by_students(&[alice], &[], PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page1.len(), 2);
        assert!(page1[0].created_at > page1[1].created_at);

        let page3 = ledger
            .list_references_by_students(&[alice], &[], PageRequest::new(3, 2))
            .await
            .unwrap();
        assert_eq!(page3.len(), 1);

        let submitted_only = ledger
            .list_references_by_students(
                &[alice, bob],
                &[AchievementStatus::Submitted],
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert!(submitted_only.is_empty());

        let everyone = ledger
            .list_references(&[AchievementStatus::Draft], PageRequest::new(1, 0))
            .await
            .unwrap();
        assert_eq!(everyone.len(), 6);
        assert!(everyone.iter().any(|r| r.student_id == bob));
    }
}
