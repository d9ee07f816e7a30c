use crate::traits::DocumentStore;
use crate::{StoreError, StoreResult};
use ach_model::{AchievementContent, AchievementDocument, DocumentKey, NewDocument};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Document store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<DocumentKey, AchievementDocument>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents, deleted ones included.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Whether a document with `key` exists (deleted or not).
    pub fn contains(&self, key: &DocumentKey) -> bool {
        self.documents.contains_key(key)
    }

    /// Rewrite a document's creation time; lets tests age documents past the
    /// sweep grace window.
    pub fn backdate(&self, key: &DocumentKey, created_at: DateTime<Utc>) -> bool {
        match self.documents.get_mut(key) {
            Some(mut doc) => {
                doc.created_at = created_at;
                true
            }
            None => false,
        }
    }

    fn not_found(key: &DocumentKey) -> StoreError {
        StoreError::NotFound(format!("document {key} not found"))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_document(&self, document: NewDocument) -> StoreResult<DocumentKey> {
        let key = DocumentKey::generate();
        let stored = AchievementDocument {
            key: key.clone(),
            content: document.content,
            created_by: document.created_by,
            created_at: document.created_at,
            updated_at: document.created_at,
            deleted_at: None,
        };
        self.documents.insert(key.clone(), stored);
        Ok(key)
    }

    async fn get_document(&self, key: &DocumentKey) -> StoreResult<AchievementDocument> {
        self.documents
            .get(key)
            .map(|doc| doc.clone())
            .ok_or_else(|| Self::not_found(key))
    }

    async fn update_content(
        &self,
        key: &DocumentKey,
        content: AchievementContent,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut doc = self
            .documents
            .get_mut(key)
            .ok_or_else(|| Self::not_found(key))?;
        doc.content = content;
        doc.updated_at = at;
        Ok(())
    }

    async fn append_files(
        &self,
        key: &DocumentKey,
        urls: &[String],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut doc = self
            .documents
            .get_mut(key)
            .ok_or_else(|| Self::not_found(key))?;
        doc.content.files.extend(urls.iter().cloned());
        doc.updated_at = at;
        Ok(())
    }

    async fn soft_delete_document(
        &self,
        key: &DocumentKey,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut doc = self
            .documents
            .get_mut(key)
            .ok_or_else(|| Self::not_found(key))?;
        if doc.deleted_at.is_none() {
            doc.deleted_at = Some(at);
            doc.updated_at = at;
        }
        Ok(())
    }

    async fn purge_document(&self, key: &DocumentKey) -> StoreResult<()> {
        self.documents
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(key))
    }

    async fn list_documents_created_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<&DocumentKey>,
        limit: usize,
    ) -> StoreResult<Vec<AchievementDocument>> {
        let mut docs: Vec<AchievementDocument> = self
            .documents
            .iter()
            .filter(|entry| entry.created_at < cutoff)
            .filter(|entry| after.map_or(true, |after| entry.key() > after))
            .map(|entry| entry.value().clone())
            .collect();
        docs.sort_by(|a, b| a.key.cmp(&b.key));
        docs.truncate(limit);
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ach_model::UserId;
    use chrono::Duration;

    fn new_doc(title: &str) -> NewDocument {
        NewDocument {
            content: AchievementContent::new(title, "competition"),
            created_by: UserId::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_get_and_append_files() {
        let store = InMemoryDocumentStore::new();
        let key = store.create_document(new_doc("Robotics cup")).await.unwrap();

        store
            .append_files(&key, &["a.pdf".to_string(), "b.png".to_string()], Utc::now())
            .await
            .unwrap();
        store
            .append_files(&key, &["c.jpg".to_string()], Utc::now())
            .await
            .unwrap();

        let doc = store.get_document(&key).await.unwrap();
        assert_eq!(doc.content.title, "Robotics cup");
        assert_eq!(doc.content.files, vec!["a.pdf", "b.png", "c.jpg"]);
    }

    #[tokio::test]
    async fn soft_delete_keeps_first_timestamp() {
        let store = InMemoryDocumentStore::new();
        let key = store.create_document(new_doc("x")).await.unwrap();
        let first = Utc::now();
        store.soft_delete_document(&key, first).await.unwrap();
        store
            .soft_delete_document(&key, first + Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(store.get_document(&key).await.unwrap().deleted_at, Some(first));
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let store = InMemoryDocumentStore::new();
        let key = DocumentKey::generate();
        assert!(store.get_document(&key).await.unwrap_err().is_not_found());
        assert!(store.purge_document(&key).await.unwrap_err().is_not_found());
        assert!(store
            .soft_delete_document(&key, Utc::now())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn listing_respects_cutoff_cursor_and_limit() {
        let store = InMemoryDocumentStore::new();
        let old = Utc::now() - Duration::hours(2);
        let mut keys = Vec::new();
        for i in 0..3 {
            let key = store.create_document(new_doc(&format!("doc {i}"))).await.unwrap();
            store.backdate(&key, old);
            keys.push(key);
        }
        let fresh = store.create_document(new_doc("fresh")).await.unwrap();

        let cutoff = Utc::now() - Duration::hours(1);
        let first = store.list_documents_created_before(cutoff, None, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        let rest = store
            .list_documents_created_before(cutoff, Some(&first[1].key), 2)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert!(first.iter().chain(rest.iter()).all(|d| d.key != fresh));
    }
}
