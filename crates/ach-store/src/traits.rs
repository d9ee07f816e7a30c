use crate::StoreResult;
use ach_model::{
    AchievementContent, AchievementDocument, AchievementReference, AchievementStatus,
    DocumentKey, HistoryEntry, LecturerId, LecturerProfile, NewDocument, NewHistoryEntry,
    NewNotification, Notification, ReferenceId, StatusChange, StudentId, StudentProfile, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One-based page request for paged reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    #[inline]
    #[must_use]
    pub fn new(page: usize, limit: usize) -> Self {
        Self { page, limit }
    }

    /// Rows to skip; page 0 is treated as page 1.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// Content store for achievement documents.
///
/// Owns no workflow logic; every write is driven by the workflow engine.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document and return its key.
    async fn create_document(&self, document: NewDocument) -> StoreResult<DocumentKey>;

    /// Fetch a document, including soft-deleted ones.
    async fn get_document(&self, key: &DocumentKey) -> StoreResult<AchievementDocument>;

    /// Replace the content fields, keeping creator and timestamps.
    async fn update_content(
        &self,
        key: &DocumentKey,
        content: AchievementContent,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Append file references after the existing ones.
    async fn append_files(
        &self,
        key: &DocumentKey,
        urls: &[String],
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Stamp `deleted_at`; a second call keeps the first timestamp.
    async fn soft_delete_document(&self, key: &DocumentKey, at: DateTime<Utc>)
        -> StoreResult<()>;

    /// Physically remove a document that never became part of a reference.
    async fn purge_document(&self, key: &DocumentKey) -> StoreResult<()>;

    /// Documents created before `cutoff`, ordered by key, strictly after `after`.
    async fn list_documents_created_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<&DocumentKey>,
        limit: usize,
    ) -> StoreResult<Vec<AchievementDocument>>;
}

/// Relational ledger of achievement references; owns the authoritative status.
#[async_trait]
pub trait ReferenceLedger: Send + Sync {
    /// Insert a new reference. Duplicate id or document key is a conflict.
    async fn insert_reference(&self, reference: &AchievementReference) -> StoreResult<()>;

    async fn get_reference(&self, id: ReferenceId) -> StoreResult<AchievementReference>;

    async fn get_reference_by_document_key(
        &self,
        key: &DocumentKey,
    ) -> StoreResult<AchievementReference>;

    /// Apply `change` only if the stored status equals `expected`.
    ///
    /// Returns the updated row, `Conflict` when the status moved on, or
    /// `NotFound` when the row does not exist.
    async fn conditional_update_status(
        &self,
        id: ReferenceId,
        expected: AchievementStatus,
        change: &StatusChange,
    ) -> StoreResult<AchievementReference>;

    /// References owned by any of `students`, newest first.
    ///
    /// An empty `statuses` slice matches every status.
    async fn list_references_by_students(
        &self,
        students: &[StudentId],
        statuses: &[AchievementStatus],
        page: PageRequest,
    ) -> StoreResult<Vec<AchievementReference>>;

    /// Every reference, newest first. Same status filter as above.
    async fn list_references(
        &self,
        statuses: &[AchievementStatus],
        page: PageRequest,
    ) -> StoreResult<Vec<AchievementReference>>;
}

/// Append-only transition log.
#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn append(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry>;

    /// Entries for one reference in chronological order.
    async fn list_for_reference(&self, reference: ReferenceId) -> StoreResult<Vec<HistoryEntry>>;
}

/// Fire-and-forget notification channel.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: NewNotification) -> StoreResult<()>;

    /// Notifications for one recipient, newest first.
    async fn list_for_recipient(&self, recipient: UserId) -> StoreResult<Vec<Notification>>;
}

/// Student and lecturer profiles, owned by the surrounding account system.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn student_by_user(&self, user: UserId) -> StoreResult<StudentProfile>;
    async fn student_by_id(&self, id: StudentId) -> StoreResult<StudentProfile>;
    async fn lecturer_by_user(&self, user: UserId) -> StoreResult<LecturerProfile>;
    async fn lecturer_by_id(&self, id: LecturerId) -> StoreResult<LecturerProfile>;
    async fn student_ids_by_advisor(&self, lecturer: LecturerId) -> StoreResult<Vec<StudentId>>;

    /// Set or clear a student's advisor and return the updated profile.
    async fn assign_advisor(
        &self,
        student: StudentId,
        advisor: Option<LecturerId>,
    ) -> StoreResult<StudentProfile>;
}
