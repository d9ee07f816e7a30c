//! PostgreSQL adapter for the achievement stores.
//!
//! One pool backs every trait. Documents live in a JSONB column so their
//! schema stays open; references, history, notifications and profiles are
//! plain relational tables. Status updates are a single conditional
//! `UPDATE ... WHERE status = $expected`, so concurrent reviewers cannot both
//! win.

use crate::traits::{
    DocumentStore, HistoryLog, NotificationSink, PageRequest, ProfileDirectory, ReferenceLedger,
};
use crate::{StoreError, StoreResult};
use ach_model::{
    AchievementContent, AchievementDocument, AchievementReference, AchievementStatus,
    DocumentKey, HistoryEntry, HistoryId, LecturerId, LecturerProfile, NewDocument,
    NewHistoryEntry, NewNotification, Notification, NotificationId, ReferenceId, StatusChange,
    StudentId, StudentProfile, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

const REFERENCE_COLUMNS: &str = "id, student_id, document_key, status, submitted_at, \
     verified_at, verified_by, rejection_note, created_at, updated_at";

/// PostgreSQL-backed implementation of every store trait.
#[derive(Clone)]
pub struct PostgresAchievementStore {
    pool: PgPool,
}

impl PostgresAchievementStore {
    /// Connect and initialize the schema.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool.
    pub async fn from_pool(pool: PgPool) -> StoreResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS achievement_documents (
                doc_key TEXT PRIMARY KEY,
                content JSONB NOT NULL,
                created_by UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                deleted_at TIMESTAMPTZ
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS achievement_references (
                id UUID PRIMARY KEY,
                student_id UUID NOT NULL,
                document_key TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                submitted_at TIMESTAMPTZ,
                verified_at TIMESTAMPTZ,
                verified_by UUID,
                rejection_note TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS achievement_history (
                id UUID PRIMARY KEY,
                reference_id UUID NOT NULL,
                old_status TEXT NOT NULL,
                new_status TEXT NOT NULL,
                changed_by UUID NOT NULL,
                note TEXT,
                changed_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id UUID PRIMARY KEY,
                recipient UUID NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                is_read BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS lecturers (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL UNIQUE,
                lecturer_number TEXT NOT NULL,
                department TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL UNIQUE,
                student_number TEXT NOT NULL,
                program TEXT NOT NULL,
                academic_year TEXT NOT NULL,
                advisor_id UUID REFERENCES lecturers(id),
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS achievement_references_student_idx \
             ON achievement_references (student_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS achievement_history_reference_idx \
             ON achievement_history (reference_id, changed_at)",
            "CREATE INDEX IF NOT EXISTS achievement_documents_created_idx \
             ON achievement_documents (created_at)",
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    /// Insert or replace a lecturer profile.
    pub async fn upsert_lecturer(&self, profile: &LecturerProfile) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lecturers (id, user_id, lecturer_number, department, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
               SET lecturer_number = EXCLUDED.lecturer_number,
                   department = EXCLUDED.department
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(profile.user_id.as_uuid())
        .bind(&profile.lecturer_number)
        .bind(&profile.department)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(())
    }

    /// Insert or replace a student profile, advisor included.
    pub async fn upsert_student(&self, profile: &StudentProfile) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO students
                (id, user_id, student_number, program, academic_year, advisor_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
               SET student_number = EXCLUDED.student_number,
                   program = EXCLUDED.program,
                   academic_year = EXCLUDED.academic_year,
                   advisor_id = EXCLUDED.advisor_id
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(profile.user_id.as_uuid())
        .bind(&profile.student_number)
        .bind(&profile.program)
        .bind(&profile.academic_year)
        .bind(profile.advisor_id.map(|id| id.as_uuid()))
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresAchievementStore {
    async fn create_document(&self, document: NewDocument) -> StoreResult<DocumentKey> {
        let key = DocumentKey::generate();
        let content = serde_json::to_value(&document.content)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO achievement_documents
                (doc_key, content, created_by, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $4, NULL)
            "#,
        )
        .bind(key.as_str())
        .bind(content)
        .bind(document.created_by.as_uuid())
        .bind(document.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;

        Ok(key)
    }

    async fn get_document(&self, key: &DocumentKey) -> StoreResult<AchievementDocument> {
        let row = sqlx::query(
            r#"
            SELECT doc_key, content, created_by, created_at, updated_at, deleted_at
              FROM achievement_documents
             WHERE doc_key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(document_row_to_record)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound(format!("document {key} not found")))
    }

    async fn update_content(
        &self,
        key: &DocumentKey,
        content: AchievementContent,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let content =
            serde_json::to_value(&content).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE achievement_documents SET content = $1, updated_at = $2 WHERE doc_key = $3",
        )
        .bind(content)
        .bind(at)
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {key} not found")));
        }
        Ok(())
    }

    async fn append_files(
        &self,
        key: &DocumentKey,
        urls: &[String],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let urls = serde_json::to_value(urls).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let result = sqlx::query(
            r#"
            UPDATE achievement_documents
               SET content = jsonb_set(
                       content,
                       '{files}',
                       COALESCE(content->'files', '[]'::jsonb) || $1::jsonb
                   ),
                   updated_at = $2
             WHERE doc_key = $3
            "#,
        )
        .bind(urls)
        .bind(at)
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {key} not found")));
        }
        Ok(())
    }

    async fn soft_delete_document(
        &self,
        key: &DocumentKey,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE achievement_documents
               SET updated_at = CASE WHEN deleted_at IS NULL THEN $1 ELSE updated_at END,
                   deleted_at = COALESCE(deleted_at, $1)
             WHERE doc_key = $2
            "#,
        )
        .bind(at)
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {key} not found")));
        }
        Ok(())
    }

    async fn purge_document(&self, key: &DocumentKey) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM achievement_documents WHERE doc_key = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {key} not found")));
        }
        Ok(())
    }

    async fn list_documents_created_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<&DocumentKey>,
        limit: usize,
    ) -> StoreResult<Vec<AchievementDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT doc_key, content, created_by, created_at, updated_at, deleted_at
              FROM achievement_documents
             WHERE created_at < $1
               AND ($2::TEXT IS NULL OR doc_key > $2)
             ORDER BY doc_key
             LIMIT $3
            "#,
        )
        .bind(cutoff)
        .bind(after.map(DocumentKey::as_str))
        .bind(to_i64(limit)?)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(document_row_to_record).collect()
    }
}

#[async_trait]
impl ReferenceLedger for PostgresAchievementStore {
    async fn insert_reference(&self, reference: &AchievementReference) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO achievement_references
                (id, student_id, document_key, status, submitted_at, verified_at,
                 verified_by, rejection_note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(reference.id.as_uuid())
        .bind(reference.student_id.as_uuid())
        .bind(reference.document_key.as_str())
        .bind(reference.status.as_str())
        .bind(reference.submitted_at)
        .bind(reference.verified_at)
        .bind(reference.verified_by.map(|u| u.as_uuid()))
        .bind(&reference.rejection_note)
        .bind(reference.created_at)
        .bind(reference.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(())
    }

    async fn get_reference(&self, id: ReferenceId) -> StoreResult<AchievementReference> {
        let row = sqlx::query(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM achievement_references WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(reference_row_to_record)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound(format!("reference {id} not found")))
    }

    async fn get_reference_by_document_key(
        &self,
        key: &DocumentKey,
    ) -> StoreResult<AchievementReference> {
        let row = sqlx::query(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM achievement_references WHERE document_key = $1"
        ))
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(reference_row_to_record)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound(format!("no reference for document {key}")))
    }

    async fn conditional_update_status(
        &self,
        id: ReferenceId,
        expected: AchievementStatus,
        change: &StatusChange,
    ) -> StoreResult<AchievementReference> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE achievement_references
               SET status = $1,
                   updated_at = $2,
                   submitted_at = COALESCE($3, submitted_at),
                   verified_at = COALESCE($4, verified_at),
                   verified_by = COALESCE($5, verified_by),
                   rejection_note = COALESCE($6, rejection_note)
             WHERE id = $7
               AND status = $8
            RETURNING {REFERENCE_COLUMNS}
            "#
        ))
        .bind(change.to.as_str())
        .bind(change.at)
        .bind(change.submitted_at)
        .bind(change.verified_at)
        .bind(change.verified_by.map(|u| u.as_uuid()))
        .bind(&change.rejection_note)
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => reference_row_to_record(row),
            None => {
                // zero rows: either gone or the status moved on
                let current = self.get_reference(id).await?;
                Err(StoreError::Conflict(format!(
                    "reference {id} is {}, expected {expected}",
                    current.status
                )))
            }
        }
    }

    async fn list_references_by_students(
        &self,
        students: &[StudentId],
        statuses: &[AchievementStatus],
        page: PageRequest,
    ) -> StoreResult<Vec<AchievementReference>> {
        let student_ids: Vec<Uuid> = students.iter().map(StudentId::as_uuid).collect();
        let status_names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        // LIMIT NULL is unbounded
        let limit = if page.limit == 0 {
            None
        } else {
            Some(to_i64(page.limit)?)
        };

        let rows = sqlx::query(&format!(
            r#"
            SELECT {REFERENCE_COLUMNS}
              FROM achievement_references
             WHERE student_id = ANY($1)
               AND (cardinality($2::TEXT[]) = 0 OR status = ANY($2))
             ORDER BY created_at DESC, id
             LIMIT $3
            OFFSET $4
            "#
        ))
        .bind(student_ids)
        .bind(status_names)
        .bind(limit)
        .bind(to_i64(page.offset())?)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(reference_row_to_record).collect()
    }

    async fn list_references(
        &self,
        statuses: &[AchievementStatus],
        page: PageRequest,
    ) -> StoreResult<Vec<AchievementReference>> {
        let status_names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let limit = if page.limit == 0 {
            None
        } else {
            Some(to_i64(page.limit)?)
        };

        let rows = sqlx::query(&format!(
            r#"
            SELECT {REFERENCE_COLUMNS}
              FROM achievement_references
             WHERE cardinality($1::TEXT[]) = 0 OR status = ANY($1)
             ORDER BY created_at DESC, id
             LIMIT $2
            OFFSET $3
            "#
        ))
        .bind(status_names)
        .bind(limit)
        .bind(to_i64(page.offset())?)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(reference_row_to_record).collect()
    }
}

#[async_trait]
impl HistoryLog for PostgresAchievementStore {
    async fn append(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry> {
        let entry = entry.into_entry();
        sqlx::query(
            r#"
            INSERT INTO achievement_history
                (id, reference_id, old_status, new_status, changed_by, note, changed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.reference_id.as_uuid())
        .bind(entry.old_status.as_str())
        .bind(entry.new_status.as_str())
        .bind(entry.changed_by.as_uuid())
        .bind(&entry.note)
        .bind(entry.changed_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(entry)
    }

    async fn list_for_reference(&self, reference: ReferenceId) -> StoreResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, reference_id, old_status, new_status, changed_by, note, changed_at
              FROM achievement_history
             WHERE reference_id = $1
             ORDER BY changed_at ASC
            "#,
        )
        .bind(reference.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(HistoryEntry {
                    id: HistoryId::from(get::<Uuid>(&row, "id")?),
                    reference_id: ReferenceId::from(get::<Uuid>(&row, "reference_id")?),
                    old_status: parse_status(&get::<String>(&row, "old_status")?)?,
                    new_status: parse_status(&get::<String>(&row, "new_status")?)?,
                    changed_by: UserId::from(get::<Uuid>(&row, "changed_by")?),
                    note: get(&row, "note")?,
                    changed_at: get(&row, "changed_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl NotificationSink for PostgresAchievementStore {
    async fn send(&self, notification: NewNotification) -> StoreResult<()> {
        let notification = notification.into_notification(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient, title, message, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.recipient.as_uuid())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn list_for_recipient(&self, recipient: UserId) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, recipient, title, message, is_read, created_at
              FROM notifications
             WHERE recipient = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(recipient.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(Notification {
                    id: NotificationId::from(get::<Uuid>(&row, "id")?),
                    recipient: UserId::from(get::<Uuid>(&row, "recipient")?),
                    title: get(&row, "title")?,
                    message: get(&row, "message")?,
                    is_read: get(&row, "is_read")?,
                    created_at: get(&row, "created_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ProfileDirectory for PostgresAchievementStore {
    async fn student_by_user(&self, user: UserId) -> StoreResult<StudentProfile> {
        self.fetch_student("user_id", user.as_uuid())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("no student profile for user {user}")))
    }

    async fn student_by_id(&self, id: StudentId) -> StoreResult<StudentProfile> {
        self.fetch_student("id", id.as_uuid())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("student {id} not found")))
    }

    async fn lecturer_by_user(&self, user: UserId) -> StoreResult<LecturerProfile> {
        self.fetch_lecturer("user_id", user.as_uuid())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("no lecturer profile for user {user}")))
    }

    async fn lecturer_by_id(&self, id: LecturerId) -> StoreResult<LecturerProfile> {
        self.fetch_lecturer("id", id.as_uuid())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("lecturer {id} not found")))
    }

    async fn student_ids_by_advisor(&self, lecturer: LecturerId) -> StoreResult<Vec<StudentId>> {
        let rows = sqlx::query("SELECT id FROM students WHERE advisor_id = $1")
            .bind(lecturer.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter()
            .map(|row| get::<Uuid>(row, "id").map(StudentId::from))
            .collect()
    }

    async fn assign_advisor(
        &self,
        student: StudentId,
        advisor: Option<LecturerId>,
    ) -> StoreResult<StudentProfile> {
        let result = sqlx::query("UPDATE students SET advisor_id = $2 WHERE id = $1")
            .bind(student.as_uuid())
            .bind(advisor.as_ref().map(LecturerId::as_uuid))
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("student {student} not found")));
        }
        self.student_by_id(student).await
    }
}

impl PostgresAchievementStore {
    // `column` is always a literal from this module
    async fn fetch_student(&self, column: &str, value: Uuid) -> StoreResult<Option<StudentProfile>> {
        let row = sqlx::query(&format!(
            "SELECT id, user_id, student_number, program, academic_year, advisor_id, created_at \
             FROM students WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|row| {
            Ok(StudentProfile {
                id: StudentId::from(get::<Uuid>(&row, "id")?),
                user_id: UserId::from(get::<Uuid>(&row, "user_id")?),
                student_number: get(&row, "student_number")?,
                program: get(&row, "program")?,
                academic_year: get(&row, "academic_year")?,
                advisor_id: get::<Option<Uuid>>(&row, "advisor_id")?.map(LecturerId::from),
                created_at: get(&row, "created_at")?,
            })
        })
        .transpose()
    }

    async fn fetch_lecturer(
        &self,
        column: &str,
        value: Uuid,
    ) -> StoreResult<Option<LecturerProfile>> {
        let row = sqlx::query(&format!(
            "SELECT id, user_id, lecturer_number, department, created_at \
             FROM lecturers WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|row| {
            Ok(LecturerProfile {
                id: LecturerId::from(get::<Uuid>(&row, "id")?),
                user_id: UserId::from(get::<Uuid>(&row, "user_id")?),
                lecturer_number: get(&row, "lecturer_number")?,
                department: get(&row, "department")?,
                created_at: get(&row, "created_at")?,
            })
        })
        .transpose()
    }
}

fn document_row_to_record(row: PgRow) -> StoreResult<AchievementDocument> {
    let content: serde_json::Value = get(&row, "content")?;
    let content: AchievementContent =
        serde_json::from_value(content).map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(AchievementDocument {
        key: DocumentKey::from_raw(get::<String>(&row, "doc_key")?),
        content,
        created_by: UserId::from(get::<Uuid>(&row, "created_by")?),
        created_at: get(&row, "created_at")?,
        updated_at: get(&row, "updated_at")?,
        deleted_at: get(&row, "deleted_at")?,
    })
}

fn reference_row_to_record(row: PgRow) -> StoreResult<AchievementReference> {
    Ok(AchievementReference {
        id: ReferenceId::from(get::<Uuid>(&row, "id")?),
        student_id: StudentId::from(get::<Uuid>(&row, "student_id")?),
        document_key: DocumentKey::from_raw(get::<String>(&row, "document_key")?),
        status: parse_status(&get::<String>(&row, "status")?)?,
        submitted_at: get(&row, "submitted_at")?,
        verified_at: get(&row, "verified_at")?,
        verified_by: get::<Option<Uuid>>(&row, "verified_by")?.map(UserId::from),
        rejection_note: get(&row, "rejection_note")?,
        created_at: get(&row, "created_at")?,
        updated_at: get(&row, "updated_at")?,
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(backend)
}

fn parse_status(raw: &str) -> StoreResult<AchievementStatus> {
    raw.parse()
        .map_err(|_| StoreError::Serialization(format!("unknown status in ledger: {raw}")))
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn map_sqlx_conflict(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Backend(err.to_string())
}

fn to_i64(value: usize) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("window value too large".to_string()))
}
