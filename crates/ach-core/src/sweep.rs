//! Reconciliation sweep
//!
//! Backstop for the create saga and for delete: finds documents whose ledger
//! side never materialized or was deleted, and brings the document store in
//! line with the ledger. Runs out of band, never on the request path.

use crate::config::SweepConfig;
use crate::engine::Stores;
use crate::error::{WorkflowError, WorkflowResult};
use ach_model::{AchievementDocument, AchievementStatus, DocumentKey};
use ach_store::{DocumentStore, ReferenceLedger, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Outcome counters of one sweep run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub scanned: usize,
    /// Documents without any reference, physically removed
    pub purged: usize,
    /// Documents of deleted references, stamped `deleted_at`
    pub soft_deleted: usize,
    pub kept: usize,
    pub failed: usize,
}

/// What the sweep decided for one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Purge,
    SoftDelete,
    Keep,
}

/// Reconciles documents against the reference ledger
#[derive(Clone)]
pub struct ReconciliationSweep {
    documents: Arc<dyn DocumentStore>,
    ledger: Arc<dyn ReferenceLedger>,
    config: SweepConfig,
}

impl fmt::Debug for ReconciliationSweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationSweep")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReconciliationSweep {
    #[must_use]
    pub fn new(stores: &Stores, config: SweepConfig) -> Self {
        Self {
            documents: stores.documents.clone(),
            ledger: stores.ledger.clone(),
            config,
        }
    }

    /// Sweep every document created before `now - grace_period`
    ///
    /// Listing failures abort the run; per-document failures are counted.
    #[tracing::instrument(skip(self), fields(batch = self.config.batch_size))]
    pub async fn run(&self, now: DateTime<Utc>, dry_run: bool) -> WorkflowResult<SweepReport> {
        let cutoff = now
            .checked_sub_signed(self.config.grace_period())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let batch_size = self.config.batch_size.max(1);
        let mut report = SweepReport::default();
        let mut cursor: Option<DocumentKey> = None;

        loop {
            let batch = self
                .documents
                .list_documents_created_before(cutoff, cursor.as_ref(), batch_size)
                .await
                .map_err(WorkflowError::StoreFailure)?;
            let exhausted = batch.len() < batch_size;
            cursor = batch.last().map(|doc| doc.key.clone());

            for document in &batch {
                report.scanned += 1;
                match self.reconcile(document, now, dry_run).await {
                    Ok(Verdict::Purge) => report.purged += 1,
                    Ok(Verdict::SoftDelete) => report.soft_deleted += 1,
                    Ok(Verdict::Keep) => report.kept += 1,
                    Err(err) => {
                        report.failed += 1;
                        tracing::warn!(document_key = %document.key, error = %err, "reconcile failed");
                    }
                }
            }

            if exhausted || cursor.is_none() {
                break;
            }
        }

        tracing::info!(
            scanned = report.scanned,
            purged = report.purged,
            soft_deleted = report.soft_deleted,
            kept = report.kept,
            failed = report.failed,
            dry_run,
            "reconciliation sweep finished"
        );
        Ok(report)
    }

    async fn reconcile(
        &self,
        document: &AchievementDocument,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<Verdict, StoreError> {
        let verdict = match self.ledger.get_reference_by_document_key(&document.key).await {
            Err(StoreError::NotFound(_)) => Verdict::Purge,
            Err(err) => return Err(err),
            Ok(reference)
                if reference.status == AchievementStatus::Deleted && !document.is_deleted() =>
            {
                Verdict::SoftDelete
            }
            Ok(_) => Verdict::Keep,
        };

        if dry_run {
            tracing::debug!(document_key = %document.key, ?verdict, "dry run");
            return Ok(verdict);
        }

        match verdict {
            Verdict::Purge => match self.documents.purge_document(&document.key).await {
                // already gone counts as purged
                Ok(()) | Err(StoreError::NotFound(_)) => {
                    tracing::info!(document_key = %document.key, "orphan document purged");
                }
                Err(err) => return Err(err),
            },
            Verdict::SoftDelete => {
                self.documents
                    .soft_delete_document(&document.key, now)
                    .await?;
                tracing::info!(document_key = %document.key, "document of deleted reference soft-deleted");
            }
            Verdict::Keep => {}
        }
        Ok(verdict)
    }
}
