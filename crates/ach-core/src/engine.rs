//! Workflow engine
//!
//! Owns every cross-store write sequence:
//! - create: document first, ledger second, compensating purge on ledger failure
//! - transitions: load, authorize, validate, compare-and-swap on the ledger
//! - side effects (history, notifications) are best-effort and never fail the
//!   primary operation

use crate::access::{Permission, PermissionResolver};
use crate::config::EngineConfig;
use crate::error::{WorkflowError, WorkflowResult};
use ach_model::{
    validate_transition, AchievementContent, AchievementDocument, AchievementReference,
    AchievementStatus, Actor, DocumentKey, HistoryEntry, LecturerId, NewDocument,
    NewHistoryEntry, NewNotification, Notification, ReferenceId, StatusChange, StudentId,
    StudentProfile, UserId,
};
use ach_store::{
    DocumentStore, HistoryLog, NotificationSink, PageRequest, ProfileDirectory, ReferenceLedger,
    StoreError,
};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Every status except `deleted`
const LIVE_STATUSES: [AchievementStatus; 4] = [
    AchievementStatus::Draft,
    AchievementStatus::Submitted,
    AchievementStatus::Verified,
    AchievementStatus::Rejected,
];

/// Store handles injected into the engine
#[derive(Clone)]
pub struct Stores {
    pub documents: Arc<dyn DocumentStore>,
    pub ledger: Arc<dyn ReferenceLedger>,
    pub history: Arc<dyn HistoryLog>,
    pub notifications: Arc<dyn NotificationSink>,
    pub directory: Arc<dyn ProfileDirectory>,
}

impl fmt::Debug for Stores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// Reference joined with its document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementDetail {
    pub reference: AchievementReference,
    pub document: AchievementDocument,
}

/// One page of achievements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementPage {
    pub page: usize,
    pub limit: usize,
    pub items: Vec<AchievementDetail>,
}

/// Achievement lifecycle engine
///
/// Stateless between calls; every operation is an independent unit of work
/// over the injected stores.
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    stores: Stores,
    access: PermissionResolver,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Create an engine over `stores`
    #[must_use]
    pub fn new(stores: Stores, config: EngineConfig) -> Self {
        let access = PermissionResolver::new(stores.directory.clone());
        Self {
            stores,
            access,
            config,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn access(&self) -> &PermissionResolver {
        &self.access
    }

    #[inline]
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Create a draft achievement for the calling student
    ///
    /// # Workflow
    /// 1. Resolve the caller's student profile
    /// 2. Write the document
    /// 3. Insert the draft reference
    /// 4. On ledger failure, purge the document and surface `StoreFailure`
    #[tracing::instrument(skip(self, content), fields(user = %actor.user_id))]
    pub async fn create(
        &self,
        actor: &Actor,
        content: AchievementContent,
    ) -> WorkflowResult<AchievementReference> {
        self.access.require(actor, Permission::AchievementsCreate)?;
        content.validate()?;
        let student = self.access.student_of(actor).await?;

        let now = Utc::now();
        let key = self
            .stores
            .documents
            .create_document(NewDocument {
                content,
                created_by: actor.user_id,
                created_at: now,
            })
            .await
            .map_err(WorkflowError::StoreFailure)?;
        tracing::debug!(document_key = %key, "document written");

        let reference = AchievementReference::draft(student.id, key.clone(), now);
        if let Err(err) = self.stores.ledger.insert_reference(&reference).await {
            tracing::warn!(document_key = %key, error = %err, "reference insert failed, compensating");
            self.compensate_create(&key).await;
            return Err(WorkflowError::StoreFailure(err));
        }

        tracing::info!(reference = %reference.id, student = %student.id, "achievement created");
        Ok(reference)
    }

    async fn compensate_create(&self, key: &DocumentKey) {
        match self.stores.documents.purge_document(key).await {
            Ok(()) | Err(StoreError::NotFound(_)) => {
                tracing::debug!(document_key = %key, "orphan document purged");
            }
            Err(err) => {
                tracing::error!(
                    document_key = %key,
                    error = %err,
                    orphan = true,
                    "compensation failed, document left for reconciliation sweep"
                );
            }
        }
    }

    /// `draft → submitted` by the owner or an admin
    #[tracing::instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn submit(
        &self,
        actor: &Actor,
        id: ReferenceId,
    ) -> WorkflowResult<AchievementReference> {
        self.access.require(actor, Permission::AchievementsSubmit)?;
        let reference = self.load(id).await?;
        self.access.ensure_owner_or_admin(actor, &reference).await?;

        let now = Utc::now();
        let updated = self
            .transition(&reference, StatusChange::submit(now))
            .await?;
        self.record_history(&reference, &updated, actor.user_id, None)
            .await;

        if self.config.notify_advisor_on_submit {
            if let Err(err) = self.notify_advisor(updated.student_id).await {
                tracing::warn!(reference = %id, error = %err, "advisor notification failed");
            }
        }

        tracing::info!(reference = %id, "achievement submitted");
        Ok(updated)
    }

    /// `submitted → verified` by the advisor or an admin
    #[tracing::instrument(skip(self), fields(user = %actor.user_id, role = %actor.role))]
    pub async fn verify(
        &self,
        actor: &Actor,
        id: ReferenceId,
    ) -> WorkflowResult<AchievementReference> {
        self.access.require(actor, Permission::AchievementsVerify)?;
        let reference = self.load(id).await?;
        self.access.ensure_reviewer(actor, &reference).await?;
        self.ensure_not_orphaned(&reference).await?;

        let updated = self
            .transition(&reference, StatusChange::verify(actor.user_id, Utc::now()))
            .await?;
        self.record_history(&reference, &updated, actor.user_id, None)
            .await;

        if self.config.notify_student_on_verify {
            self.notify_student(
                updated.student_id,
                "Achievement verified",
                "Your achievement has been verified.".to_string(),
            )
            .await;
        }

        tracing::info!(reference = %id, "achievement verified");
        Ok(updated)
    }

    /// `submitted → rejected` by the advisor or an admin; `note` is required
    #[tracing::instrument(skip(self, note), fields(user = %actor.user_id, role = %actor.role))]
    pub async fn reject(
        &self,
        actor: &Actor,
        id: ReferenceId,
        note: &str,
    ) -> WorkflowResult<AchievementReference> {
        self.access.require(actor, Permission::AchievementsReject)?;
        let note = note.trim();
        if note.is_empty() {
            return Err(WorkflowError::Validation(
                "rejection note must not be empty".into(),
            ));
        }
        let reference = self.load(id).await?;
        self.access.ensure_reviewer(actor, &reference).await?;
        self.ensure_not_orphaned(&reference).await?;

        let updated = self
            .transition(
                &reference,
                StatusChange::reject(actor.user_id, note, Utc::now()),
            )
            .await?;
        self.record_history(&reference, &updated, actor.user_id, Some(note))
            .await;

        if self.config.notify_student_on_reject {
            self.notify_student(
                updated.student_id,
                "Achievement rejected",
                format!("Your achievement was rejected: {note}"),
            )
            .await;
        }

        tracing::info!(reference = %id, "achievement rejected");
        Ok(updated)
    }

    /// `draft → deleted` by the owner; the ledger is authoritative
    #[tracing::instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn delete(
        &self,
        actor: &Actor,
        id: ReferenceId,
    ) -> WorkflowResult<AchievementReference> {
        self.access.require(actor, Permission::AchievementsDelete)?;
        let reference = self.load(id).await?;
        self.access.ensure_owner(actor, &reference).await?;

        let now = Utc::now();
        let updated = self
            .transition(&reference, StatusChange::delete(now))
            .await?;

        if let Err(err) = self
            .stores
            .documents
            .soft_delete_document(&reference.document_key, now)
            .await
        {
            tracing::warn!(
                reference = %id,
                document_key = %reference.document_key,
                error = %err,
                "document soft delete failed, left for reconciliation sweep"
            );
        }
        self.record_history(&reference, &updated, actor.user_id, None)
            .await;

        tracing::info!(reference = %id, "achievement deleted");
        Ok(updated)
    }

    /// Replace the descriptive fields of a draft; attached files are kept
    #[tracing::instrument(skip(self, content), fields(user = %actor.user_id))]
    pub async fn update_content(
        &self,
        actor: &Actor,
        id: ReferenceId,
        mut content: AchievementContent,
    ) -> WorkflowResult<AchievementDocument> {
        self.access.require(actor, Permission::AchievementsUpdate)?;
        content.validate()?;
        let reference = self.load(id).await?;
        self.access.ensure_owner(actor, &reference).await?;
        ensure_draft(&reference)?;

        let previous = self.document(&reference.document_key).await?.content;
        content.files.clone_from(&previous.files);
        self.stores
            .documents
            .update_content(&reference.document_key, content, Utc::now())
            .await?;
        self.ensure_still_draft(&reference, previous).await?;

        tracing::info!(reference = %id, "achievement content updated");
        self.document(&reference.document_key).await
    }

    /// Append proof file references to a draft
    #[tracing::instrument(skip(self, urls), fields(user = %actor.user_id, count = urls.len()))]
    pub async fn attach_files(
        &self,
        actor: &Actor,
        id: ReferenceId,
        urls: &[String],
    ) -> WorkflowResult<AchievementDocument> {
        self.access.require(actor, Permission::AchievementsUpdate)?;
        if urls.is_empty() {
            return Err(WorkflowError::Validation("no files given".into()));
        }
        if urls.iter().any(|u| u.trim().is_empty()) {
            return Err(WorkflowError::Validation("file reference must not be blank".into()));
        }
        let reference = self.load(id).await?;
        self.access.ensure_owner(actor, &reference).await?;
        ensure_draft(&reference)?;

        let previous = self.document(&reference.document_key).await?.content;
        self.stores
            .documents
            .append_files(&reference.document_key, urls, Utc::now())
            .await?;
        self.ensure_still_draft(&reference, previous).await?;
        self.document(&reference.document_key).await
    }

    /// Reference and document, visible to the owner, their advisor and admins
    pub async fn detail(&self, actor: &Actor, id: ReferenceId) -> WorkflowResult<AchievementDetail> {
        let reference = self.load_visible(actor, id).await?;
        let document = self.document(&reference.document_key).await?;
        Ok(AchievementDetail {
            reference,
            document,
        })
    }

    /// Transition history in chronological order; same visibility as [`detail`](Self::detail)
    pub async fn history(&self, actor: &Actor, id: ReferenceId) -> WorkflowResult<Vec<HistoryEntry>> {
        let reference = self.load_visible(actor, id).await?;
        Ok(self.stores.history.list_for_reference(reference.id).await?)
    }

    /// Submitted achievements of the calling lecturer's advisees, newest first
    #[tracing::instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn advisee_achievements(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> WorkflowResult<AchievementPage> {
        self.access.require(actor, Permission::StudentsAdvisees)?;
        let lecturer = self.access.lecturer_of(actor).await?;
        let page = self.clamp_page(page);

        let students = self
            .stores
            .directory
            .student_ids_by_advisor(lecturer.id)
            .await?;
        if students.is_empty() {
            return Ok(AchievementPage {
                page: page.page,
                limit: page.limit,
                items: Vec::new(),
            });
        }

        let references = self
            .stores
            .ledger
            .list_references_by_students(&students, &[AchievementStatus::Submitted], page)
            .await?;
        self.with_documents(references, page).await
    }

    /// The calling student's achievements, deleted ones excluded
    pub async fn student_achievements(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> WorkflowResult<AchievementPage> {
        self.access.require(actor, Permission::StudentsReadSelf)?;
        let student = self.access.student_of(actor).await?;
        let page = self.clamp_page(page);
        let references = self
            .stores
            .ledger
            .list_references_by_students(&[student.id], &LIVE_STATUSES, page)
            .await?;
        self.with_documents(references, page).await
    }

    /// Every achievement across all students, deleted ones excluded
    #[tracing::instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn all_achievements(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> WorkflowResult<AchievementPage> {
        self.access.require(actor, Permission::AchievementsReadAll)?;
        let page = self.clamp_page(page);
        let references = self
            .stores
            .ledger
            .list_references(&LIVE_STATUSES, page)
            .await?;
        self.with_documents(references, page).await
    }

    /// Set or clear a student's advisor; review rights follow immediately
    #[tracing::instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn assign_advisor(
        &self,
        actor: &Actor,
        student: StudentId,
        advisor: Option<LecturerId>,
    ) -> WorkflowResult<StudentProfile> {
        self.access.require(actor, Permission::StudentsAssignAdvisor)?;
        if let Some(lecturer) = advisor {
            self.stores.directory.lecturer_by_id(lecturer).await?;
        }
        let profile = self
            .stores
            .directory
            .assign_advisor(student, advisor)
            .await?;

        tracing::info!(student = %student, advisor = ?advisor, "advisor assigned");
        Ok(profile)
    }

    /// Notifications addressed to the actor, newest first
    pub async fn inbox(&self, actor: &Actor) -> WorkflowResult<Vec<Notification>> {
        Ok(self
            .stores
            .notifications
            .list_for_recipient(actor.user_id)
            .await?)
    }

    // -- internals --

    async fn load(&self, id: ReferenceId) -> WorkflowResult<AchievementReference> {
        let reference = self.stores.ledger.get_reference(id).await?;
        tracing::debug!(reference = %id, status = %reference.status, "reference loaded");
        Ok(reference)
    }

    async fn load_visible(&self, actor: &Actor, id: ReferenceId) -> WorkflowResult<AchievementReference> {
        let reference = self.load(id).await?;
        if reference.status == AchievementStatus::Deleted {
            return Err(WorkflowError::not_found(format!("reference {id} not found")));
        }
        if !self.access.can_view(actor, &reference).await? {
            return Err(WorkflowError::forbidden(format!(
                "{} may not view reference {id}",
                actor.user_id
            )));
        }
        Ok(reference)
    }

    async fn document(&self, key: &DocumentKey) -> WorkflowResult<AchievementDocument> {
        Ok(self.stores.documents.get_document(key).await?)
    }

    /// Missing or soft-deleted content cannot be reviewed
    async fn ensure_not_orphaned(&self, reference: &AchievementReference) -> WorkflowResult<()> {
        let document = self.document(&reference.document_key).await?;
        if document.is_deleted() {
            return Err(WorkflowError::not_found(format!(
                "document {} of reference {} is deleted",
                reference.document_key, reference.id
            )));
        }
        Ok(())
    }

    /// Re-check the ledger after a document edit. If a transition landed
    /// meanwhile, put `previous` back and report the lost race.
    async fn ensure_still_draft(
        &self,
        reference: &AchievementReference,
        previous: AchievementContent,
    ) -> WorkflowResult<()> {
        let latest = self.load(reference.id).await?;
        if latest.status == AchievementStatus::Draft {
            return Ok(());
        }

        if let Err(err) = self
            .stores
            .documents
            .update_content(&reference.document_key, previous, Utc::now())
            .await
        {
            tracing::error!(
                reference = %reference.id,
                document_key = %reference.document_key,
                error = %err,
                "could not restore content after a concurrent transition"
            );
        }
        Err(WorkflowError::Conflict(format!(
            "reference {} became {} during the edit",
            reference.id, latest.status
        )))
    }

    /// Validate against the state machine, then compare-and-swap on the ledger
    async fn transition(
        &self,
        reference: &AchievementReference,
        change: StatusChange,
    ) -> WorkflowResult<AchievementReference> {
        validate_transition(reference.status, change.to)?;
        let updated = self
            .stores
            .ledger
            .conditional_update_status(reference.id, reference.status, &change)
            .await?;
        Ok(updated)
    }

    async fn record_history(
        &self,
        before: &AchievementReference,
        after: &AchievementReference,
        actor: UserId,
        note: Option<&str>,
    ) {
        let mut entry = NewHistoryEntry::new(before.id, before.status, after.status, actor, after.updated_at);
        if let Some(note) = note {
            entry = entry.with_note(note);
        }
        if let Err(err) = self.stores.history.append(entry).await {
            tracing::warn!(
                reference = %before.id,
                from = %before.status,
                to = %after.status,
                error = %err,
                "history append failed"
            );
        }
    }

    async fn notify_advisor(&self, student: StudentId) -> Result<(), StoreError> {
        let profile = self.stores.directory.student_by_id(student).await?;
        let Some(advisor) = profile.advisor_id else {
            return Ok(());
        };
        let lecturer = self.stores.directory.lecturer_by_id(advisor).await?;
        self.stores
            .notifications
            .send(NewNotification::new(
                lecturer.user_id,
                "New achievement submission",
                format!(
                    "Student {} submitted an achievement for verification.",
                    profile.student_number
                ),
            ))
            .await
    }

    async fn notify_student(&self, student: StudentId, title: &str, message: String) {
        if let Err(err) = self.send_to_student(student, title, message).await {
            tracing::warn!(student = %student, error = %err, "student notification failed");
        }
    }

    async fn send_to_student(
        &self,
        student: StudentId,
        title: &str,
        message: String,
    ) -> Result<(), StoreError> {
        let profile = self.stores.directory.student_by_id(student).await?;
        self.stores
            .notifications
            .send(NewNotification::new(profile.user_id, title, message))
            .await
    }

    async fn with_documents(
        &self,
        references: Vec<AchievementReference>,
        page: PageRequest,
    ) -> WorkflowResult<AchievementPage> {
        let mut items = Vec::with_capacity(references.len());
        for reference in references {
            match self.stores.documents.get_document(&reference.document_key).await {
                Ok(document) => items.push(AchievementDetail {
                    reference,
                    document,
                }),
                Err(StoreError::NotFound(_)) => {
                    tracing::warn!(
                        reference = %reference.id,
                        document_key = %reference.document_key,
                        "document missing for reference, skipped"
                    );
                }
                Err(err) => return Err(WorkflowError::StoreFailure(err)),
            }
        }

        Ok(AchievementPage {
            page: page.page,
            limit: page.limit,
            items,
        })
    }

    fn clamp_page(&self, page: PageRequest) -> PageRequest {
        let limit = if page.limit == 0 {
            self.config.default_page_limit
        } else {
            page.limit
        };
        // never zero, even when the config was not validated
        PageRequest::new(page.page.max(1), limit.min(self.config.max_page_limit).max(1))
    }
}

/// Content edits are only allowed while the achievement is a draft
fn ensure_draft(reference: &AchievementReference) -> WorkflowResult<()> {
    if reference.status == AchievementStatus::Draft {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition {
            from: reference.status,
            to: AchievementStatus::Draft,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ach_model::{LecturerProfile, StudentProfile};
    use ach_store::memory::{
        InMemoryDirectory, InMemoryDocumentStore, InMemoryHistoryLog, InMemoryLedger,
        InMemoryNotificationSink,
    };

    struct Fixture {
        engine: WorkflowEngine,
        student: Actor,
        advisor: Actor,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryDirectory::new());
        let lecturer = LecturerProfile::new(UserId::new(), "L-1");
        let student = StudentProfile::new(UserId::new(), "S-1").with_advisor(lecturer.id);
        let actors = (Actor::student(student.user_id), Actor::lecturer(lecturer.user_id));
        directory.insert_lecturer(lecturer);
        directory.insert_student(student);

        let stores = Stores {
            documents: Arc::new(InMemoryDocumentStore::new()),
            ledger: Arc::new(InMemoryLedger::new()),
            history: Arc::new(InMemoryHistoryLog::new()),
            notifications: Arc::new(InMemoryNotificationSink::new()),
            directory,
        };
        Fixture {
            engine: WorkflowEngine::new(stores, EngineConfig::default()),
            student: actors.0,
            advisor: actors.1,
        }
    }

    #[tokio::test]
    async fn page_clamping() {
        let f = fixture();
        let engine = &f.engine;
        assert_eq!(engine.clamp_page(PageRequest::new(0, 0)), PageRequest::new(1, 10));
        assert_eq!(engine.clamp_page(PageRequest::new(2, 1000)), PageRequest::new(2, 100));
        assert_eq!(engine.clamp_page(PageRequest::new(3, 5)), PageRequest::new(3, 5));

        // unvalidated zero limits still yield a usable page
        let unchecked = WorkflowEngine::new(
            engine.stores().clone(),
            EngineConfig::new().with_page_limits(0, 0),
        );
        assert_eq!(unchecked.clamp_page(PageRequest::new(1, 50)), PageRequest::new(1, 1));
        assert_eq!(unchecked.clamp_page(PageRequest::new(0, 0)), PageRequest::new(1, 1));
    }

    #[tokio::test]
    async fn draft_only_edits() {
        let f = fixture();
        let reference = f
            .engine
            .create(&f.student, AchievementContent::new("Hackathon", "competition"))
            .await
            .unwrap();

        let doc = f
            .engine
            .attach_files(&f.student, reference.id, &["proof.pdf".to_string()])
            .await
            .unwrap();
        assert_eq!(doc.content.files, vec!["proof.pdf"]);

        let doc = f
            .engine
            .update_content(
                &f.student,
                reference.id,
                AchievementContent::new("Hackathon 2024", "competition").with_level("national"),
            )
            .await
            .unwrap();
        assert_eq!(doc.content.title, "Hackathon 2024");
        assert_eq!(doc.content.files, vec!["proof.pdf"]);

        f.engine.submit(&f.student, reference.id).await.unwrap();
        let err = f
            .engine
            .attach_files(&f.student, reference.id, &["late.pdf".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn blank_files_are_rejected_before_loading() {
        let f = fixture();
        let err = f
            .engine
            .attach_files(&f.student, ReferenceId::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        let err = f
            .engine
            .attach_files(&f.student, ReferenceId::new(), &["  ".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn advisor_sees_submission_in_queue_and_inbox() {
        let f = fixture();
        let reference = f
            .engine
            .create(&f.student, AchievementContent::new("Paper", "publication"))
            .await
            .unwrap();

        let queue = f
            .engine
            .advisee_achievements(&f.advisor, PageRequest::default())
            .await
            .unwrap();
        assert!(queue.items.is_empty());

        f.engine.submit(&f.student, reference.id).await.unwrap();
        let queue = f
            .engine
            .advisee_achievements(&f.advisor, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(queue.items.len(), 1);
        assert_eq!(queue.items[0].document.content.title, "Paper");

        let inbox = f.engine.inbox(&f.advisor).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "New achievement submission");
    }
}
