//! Process-local document store.
//!
//! Used in development mode and tests. Writers (the test harness standing in
//! for the payment webhook) use the inherent setters; the verifier only sees
//! the read-only `DocumentStore` trait.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::store::{Document, DocumentStore, FieldFilter, StoreError, StoreResult};

/// Thread-safe in-memory store keyed by (collection, id).
#[derive(Clone, Default)]
pub struct InMemoryStore {
    documents: Arc<DashMap<(String, String), Document>>,
    /// Number of upcoming reads that fail with a transport error.
    pending_failures: Arc<AtomicU32>,
    reads: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document.
    pub fn put(&self, collection: &str, document: Document) {
        self.documents
            .insert((collection.to_string(), document.id.clone()), document);
    }

    /// Insert or replace a document given as a JSON object.
    pub fn put_json(&self, collection: &str, id: &str, fields: Value) {
        self.put(collection, Document::from_json(id, fields));
    }

    /// Remove a document, returning it if it existed.
    pub fn remove(&self, collection: &str, id: &str) -> Option<Document> {
        self.documents
            .remove(&(collection.to_string(), id.to_string()))
            .map(|(_, doc)| doc)
    }

    /// Make the next `count` reads fail as if the store were unreachable.
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Total reads served (including injected failures).
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn begin_read(&self) -> StoreResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Transport("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.begin_read()?;
        Ok(self
            .documents
            .get(&(collection.to_string(), id.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn query_eq(&self, collection: &str, filters: &[FieldFilter]) -> StoreResult<Vec<Document>> {
        self.begin_read()?;
        let mut matches: Vec<Document> = self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .filter(|entry| filters.iter().all(|f| f.matches(entry.value())))
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("documents", &self.documents.len())
            .field("reads", &self.reads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_and_remove() {
        let store = InMemoryStore::new();
        assert!(store.get("artworks", "art-1").await.unwrap().is_none());

        store.put_json("artworks", "art-1", json!({ "sold": false, "paymentIntentId": null }));
        let doc = store.get("artworks", "art-1").await.unwrap().unwrap();
        assert_eq!(doc.get_bool("sold"), Some(false));

        // Same id in another collection is a different document.
        assert!(store.get("purchases", "art-1").await.unwrap().is_none());

        assert!(store.remove("artworks", "art-1").is_some());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_query_requires_all_filters() {
        let store = InMemoryStore::new();
        store.put_json(
            "purchases",
            "rec-1",
            json!({ "productId": "p1", "paymentIntentId": "pi_xyz", "buyerId": "u1" }),
        );
        store.put_json(
            "purchases",
            "rec-2",
            json!({ "productId": "p1", "paymentIntentId": "pi_other", "buyerId": "u1" }),
        );

        let filters = [
            FieldFilter::eq("productId", "p1"),
            FieldFilter::eq("paymentIntentId", "pi_xyz"),
            FieldFilter::eq("buyerId", "u1"),
        ];
        let found = store.query_eq("purchases", &filters).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "rec-1");

        let none = store.query_eq("artworks", &filters).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = InMemoryStore::new();
        store.fail_next(2);

        assert!(store.get("artworks", "x").await.is_err());
        assert!(store.query_eq("artworks", &[]).await.is_err());
        assert!(store.get("artworks", "x").await.is_ok());
        assert_eq!(store.reads(), 3);
    }
}
