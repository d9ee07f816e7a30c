//! Testing utilities for the achievement workspace
//!
//! Shared fixtures and fault-injecting store wrappers.

#![allow(missing_docs)]

use ach_core::{EngineConfig, Stores, WorkflowEngine};
use ach_model::{
    AchievementContent, AchievementDocument, AchievementReference, AchievementStatus, Actor,
    DocumentKey, HistoryEntry, LecturerProfile, NewDocument, NewHistoryEntry, ReferenceId,
    StatusChange, StudentId, StudentProfile, UserId,
};
use ach_store::memory::{
    InMemoryDirectory, InMemoryDocumentStore, InMemoryHistoryLog, InMemoryLedger,
    InMemoryNotificationSink,
};
use ach_store::{DocumentStore, HistoryLog, PageRequest, ReferenceLedger, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// In-memory world with one advised student, their advisor, an unrelated
/// lecturer, a student without advisor and an admin.
pub struct Campus {
    pub documents: Arc<InMemoryDocumentStore>,
    pub ledger: Arc<InMemoryLedger>,
    pub history: Arc<InMemoryHistoryLog>,
    pub notifications: Arc<InMemoryNotificationSink>,
    pub directory: Arc<InMemoryDirectory>,

    pub student: Actor,
    pub student_profile: StudentProfile,
    pub unadvised: Actor,
    pub unadvised_profile: StudentProfile,
    pub advisor: Actor,
    pub advisor_profile: LecturerProfile,
    pub stranger: Actor,
    pub stranger_profile: LecturerProfile,
    pub admin: Actor,
}

impl Campus {
    pub fn new() -> Self {
        let directory = Arc::new(InMemoryDirectory::new());

        let advisor_profile = LecturerProfile::new(UserId::new(), "L-0001");
        let stranger_profile = LecturerProfile::new(UserId::new(), "L-0002");
        let student_profile =
            StudentProfile::new(UserId::new(), "S-0001").with_advisor(advisor_profile.id);
        let unadvised_profile = StudentProfile::new(UserId::new(), "S-0002");

        directory.insert_lecturer(advisor_profile.clone());
        directory.insert_lecturer(stranger_profile.clone());
        directory.insert_student(student_profile.clone());
        directory.insert_student(unadvised_profile.clone());

        Self {
            documents: Arc::new(InMemoryDocumentStore::new()),
            ledger: Arc::new(InMemoryLedger::new()),
            history: Arc::new(InMemoryHistoryLog::new()),
            notifications: Arc::new(InMemoryNotificationSink::new()),
            directory,
            student: Actor::student(student_profile.user_id),
            student_profile,
            unadvised: Actor::student(unadvised_profile.user_id),
            unadvised_profile,
            advisor: Actor::lecturer(advisor_profile.user_id),
            advisor_profile,
            stranger: Actor::lecturer(stranger_profile.user_id),
            stranger_profile,
            admin: Actor::admin(UserId::new()),
        }
    }

    /// Store handles over the in-memory stores
    pub fn stores(&self) -> Stores {
        Stores {
            documents: self.documents.clone(),
            ledger: self.ledger.clone(),
            history: self.history.clone(),
            notifications: self.notifications.clone(),
            directory: self.directory.clone(),
        }
    }

    pub fn engine(&self) -> WorkflowEngine {
        WorkflowEngine::new(self.stores(), EngineConfig::default())
    }

    pub fn engine_with(&self, stores: Stores, config: EngineConfig) -> WorkflowEngine {
        WorkflowEngine::new(stores, config)
    }

    /// Add another student advised by the fixture's advisor
    pub fn enrol_advisee(&self, number: &str) -> Actor {
        let profile =
            StudentProfile::new(UserId::new(), number).with_advisor(self.advisor_profile.id);
        let actor = Actor::student(profile.user_id);
        self.directory.insert_student(profile);
        actor
    }
}

impl Default for Campus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sample_content(title: &str) -> AchievementContent {
    AchievementContent::new(title, "competition")
        .with_description("National level programming contest")
        .with_level("national")
}

fn injected(what: &str) -> StoreError {
    StoreError::Backend(format!("injected failure: {what}"))
}

/// Ledger wrapper that fails chosen operations
pub struct FaultyLedger {
    inner: Arc<InMemoryLedger>,
    fail_insert: AtomicBool,
    fail_updates: AtomicBool,
}

impl FaultyLedger {
    pub fn new(inner: Arc<InMemoryLedger>) -> Self {
        Self {
            inner,
            fail_insert: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
        }
    }

    pub fn failing_inserts(self) -> Self {
        self.fail_insert.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReferenceLedger for FaultyLedger {
    async fn insert_reference(&self, reference: &AchievementReference) -> StoreResult<()> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(injected("insert_reference"));
        }
        self.inner.insert_reference(reference).await
    }

    async fn get_reference(&self, id: ReferenceId) -> StoreResult<AchievementReference> {
        self.inner.get_reference(id).await
    }

    async fn get_reference_by_document_key(
        &self,
        key: &DocumentKey,
    ) -> StoreResult<AchievementReference> {
        self.inner.get_reference_by_document_key(key).await
    }

    async fn conditional_update_status(
        &self,
        id: ReferenceId,
        expected: AchievementStatus,
        change: &StatusChange,
    ) -> StoreResult<AchievementReference> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected("conditional_update_status"));
        }
        self.inner
            .conditional_update_status(id, expected, change)
            .await
    }

    async fn list_references_by_students(
        &self,
        students: &[StudentId],
        statuses: &[AchievementStatus],
        page: PageRequest,
    ) -> StoreResult<Vec<AchievementReference>> {
        self.inner
            .list_references_by_students(students, statuses, page)
            .await
    }

    async fn list_references(
        &self,
        statuses: &[AchievementStatus],
        page: PageRequest,
    ) -> StoreResult<Vec<AchievementReference>> {
        self.inner.list_references(statuses, page).await
    }
}

/// Document store wrapper that fails chosen operations
pub struct FaultyDocumentStore {
    inner: Arc<InMemoryDocumentStore>,
    fail_purge: AtomicBool,
    fail_soft_delete: AtomicBool,
}

impl FaultyDocumentStore {
    pub fn new(inner: Arc<InMemoryDocumentStore>) -> Self {
        Self {
            inner,
            fail_purge: AtomicBool::new(false),
            fail_soft_delete: AtomicBool::new(false),
        }
    }

    pub fn failing_purge(self) -> Self {
        self.fail_purge.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_soft_delete(self) -> Self {
        self.fail_soft_delete.store(true, Ordering::SeqCst);
        self
    }

    pub fn heal(&self) {
        self.fail_purge.store(false, Ordering::SeqCst);
        self.fail_soft_delete.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for FaultyDocumentStore {
    async fn create_document(&self, document: NewDocument) -> StoreResult<DocumentKey> {
        self.inner.create_document(document).await
    }

    async fn get_document(&self, key: &DocumentKey) -> StoreResult<AchievementDocument> {
        self.inner.get_document(key).await
    }

    async fn update_content(
        &self,
        key: &DocumentKey,
        content: AchievementContent,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.update_content(key, content, at).await
    }

    async fn append_files(
        &self,
        key: &DocumentKey,
        urls: &[String],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.append_files(key, urls, at).await
    }

    async fn soft_delete_document(&self, key: &DocumentKey, at: DateTime<Utc>) -> StoreResult<()> {
        if self.fail_soft_delete.load(Ordering::SeqCst) {
            return Err(injected("soft_delete_document"));
        }
        self.inner.soft_delete_document(key, at).await
    }

    async fn purge_document(&self, key: &DocumentKey) -> StoreResult<()> {
        if self.fail_purge.load(Ordering::SeqCst) {
            return Err(injected("purge_document"));
        }
        self.inner.purge_document(key).await
    }

    async fn list_documents_created_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<&DocumentKey>,
        limit: usize,
    ) -> StoreResult<Vec<AchievementDocument>> {
        self.inner
            .list_documents_created_before(cutoff, after, limit)
            .await
    }
}

/// Document store whose first content write parks until released, so a
/// test can run another operation in the gap between read and write.
pub struct GatedDocumentStore {
    inner: Arc<InMemoryDocumentStore>,
    armed: AtomicBool,
    parked: Notify,
    release: Notify,
}

impl GatedDocumentStore {
    pub fn new(inner: Arc<InMemoryDocumentStore>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(true),
            parked: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Resolves once a write is waiting at the gate
    pub async fn wait_parked(&self) {
        self.parked.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn gate(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.parked.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl DocumentStore for GatedDocumentStore {
    async fn create_document(&self, document: NewDocument) -> StoreResult<DocumentKey> {
        self.inner.create_document(document).await
    }

    async fn get_document(&self, key: &DocumentKey) -> StoreResult<AchievementDocument> {
        self.inner.get_document(key).await
    }

    async fn update_content(
        &self,
        key: &DocumentKey,
        content: AchievementContent,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.gate().await;
        self.inner.update_content(key, content, at).await
    }

    async fn append_files(
        &self,
        key: &DocumentKey,
        urls: &[String],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.gate().await;
        self.inner.append_files(key, urls, at).await
    }

    async fn soft_delete_document(&self, key: &DocumentKey, at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.soft_delete_document(key, at).await
    }

    async fn purge_document(&self, key: &DocumentKey) -> StoreResult<()> {
        self.inner.purge_document(key).await
    }

    async fn list_documents_created_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<&DocumentKey>,
        limit: usize,
    ) -> StoreResult<Vec<AchievementDocument>> {
        self.inner
            .list_documents_created_before(cutoff, after, limit)
            .await
    }
}

/// History log that is always down
#[derive(Debug, Default)]
pub struct FailingHistory;

#[async_trait]
impl HistoryLog for FailingHistory {
    async fn append(&self, _entry: NewHistoryEntry) -> StoreResult<HistoryEntry> {
        Err(injected("history append"))
    }

    async fn list_for_reference(&self, _reference: ReferenceId) -> StoreResult<Vec<HistoryEntry>> {
        Err(injected("history list"))
    }
}
