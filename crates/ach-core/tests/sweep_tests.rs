use ach_core::{EngineConfig, ReconciliationSweep, Stores, SweepConfig, SweepReport};
use ach_model::{AchievementStatus, NewDocument, UserId};
use ach_store::{DocumentStore, ReferenceLedger};
use ach_test_utils::{sample_content, Campus, FaultyDocumentStore, FaultyLedger};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn sweep_config() -> SweepConfig {
    SweepConfig::default()
        .with_grace_period_secs(600)
        .with_batch_size(2)
}

fn age_everything(campus: &Campus) {
    let old = Utc::now() - Duration::hours(2);
    for reference in campus.ledger.all() {
        campus.documents.backdate(&reference.document_key, old);
    }
}

#[tokio::test]
async fn test_sweep_purges_orphans_from_failed_compensation() {
    let campus = Campus::new();
    let documents = Arc::new(FaultyDocumentStore::new(campus.documents.clone()).failing_purge());
    let stores = Stores {
        ledger: Arc::new(FaultyLedger::new(campus.ledger.clone()).failing_inserts()),
        documents: documents.clone(),
        ..campus.stores()
    };
    let engine = campus.engine_with(stores, EngineConfig::default());
    for i in 0..3 {
        assert!(engine
            .create(&campus.student, sample_content(&format!("Orphan {i}")))
            .await
            .is_err());
    }
    assert_eq!(campus.documents.len(), 3);

    let orphans = campus
        .documents
        .list_documents_created_before(Utc::now() + Duration::seconds(1), None, 10)
        .await
        .unwrap();
    for orphan in &orphans {
        campus
            .documents
            .backdate(&orphan.key, Utc::now() - Duration::hours(2));
    }

    let sweep = ReconciliationSweep::new(&campus.stores(), sweep_config());
    let report = sweep.run(Utc::now(), false).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            scanned: 3,
            purged: 3,
            soft_deleted: 0,
            kept: 0,
            failed: 0,
        }
    );
    assert!(campus.documents.is_empty());
}

#[tokio::test]
async fn test_sweep_soft_deletes_documents_of_deleted_references() {
    let campus = Campus::new();
    let faulty = Arc::new(FaultyDocumentStore::new(campus.documents.clone()).failing_soft_delete());
    let stores = Stores {
        documents: faulty.clone(),
        ..campus.stores()
    };
    let engine = campus.engine_with(stores, EngineConfig::default());

    let kept = engine
        .create(&campus.student, sample_content("Kept"))
        .await
        .unwrap();
    let deleted = engine
        .create(&campus.student, sample_content("Deleted"))
        .await
        .unwrap();
    engine.delete(&campus.student, deleted.id).await.unwrap();
    assert!(!campus
        .documents
        .get_document(&deleted.document_key)
        .await
        .unwrap()
        .is_deleted());

    age_everything(&campus);
    faulty.heal();

    let sweep = ReconciliationSweep::new(&campus.stores(), sweep_config());
    let report = sweep.run(Utc::now(), false).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.soft_deleted, 1);
    assert_eq!(report.kept, 1);

    assert!(campus
        .documents
        .get_document(&deleted.document_key)
        .await
        .unwrap()
        .is_deleted());
    assert!(!campus
        .documents
        .get_document(&kept.document_key)
        .await
        .unwrap()
        .is_deleted());
    assert_eq!(
        campus.ledger.get_reference(deleted.id).await.unwrap().status,
        AchievementStatus::Deleted
    );

    // second pass has nothing to do
    let again = sweep.run(Utc::now(), false).await.unwrap();
    assert_eq!(again.soft_deleted, 0);
    assert_eq!(again.kept, 2);
}

#[tokio::test]
async fn test_sweep_respects_grace_period() {
    let campus = Campus::new();
    // a document mid-creation: written, reference not yet inserted
    campus
        .documents
        .create_document(NewDocument {
            content: sample_content("In flight"),
            created_by: UserId::new(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let sweep = ReconciliationSweep::new(&campus.stores(), sweep_config());
    let report = sweep.run(Utc::now(), false).await.unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(campus.documents.len(), 1);
}

#[tokio::test]
async fn test_dry_run_reports_without_writing() {
    let campus = Campus::new();
    let key = campus
        .documents
        .create_document(NewDocument {
            content: sample_content("Orphan"),
            created_by: UserId::new(),
            created_at: Utc::now() - Duration::days(1),
        })
        .await
        .unwrap();

    let sweep = ReconciliationSweep::new(&campus.stores(), sweep_config());
    let report = sweep.run(Utc::now(), true).await.unwrap();
    assert_eq!(report.purged, 1);
    assert!(campus.documents.contains(&key));
}

#[tokio::test]
async fn test_per_document_failures_are_counted() {
    let campus = Campus::new();
    let documents = Arc::new(FaultyDocumentStore::new(campus.documents.clone()).failing_purge());
    let stores = Stores {
        documents,
        ..campus.stores()
    };
    for i in 0..5 {
        campus
            .documents
            .create_document(NewDocument {
                content: sample_content(&format!("Orphan {i}")),
                created_by: UserId::new(),
                created_at: Utc::now() - Duration::days(1),
            })
            .await
            .unwrap();
    }

    let sweep = ReconciliationSweep::new(&stores, sweep_config());
    let report = sweep.run(Utc::now(), false).await.unwrap();
    assert_eq!(report.scanned, 5);
    assert_eq!(report.failed, 5);
    assert_eq!(campus.documents.len(), 5);
}
