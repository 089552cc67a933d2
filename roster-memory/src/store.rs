//! In-memory storage implementation.
//!
//! Collections keep their documents in insertion order, which is the order a
//! filter without a sort sees them in, so "first match" is deterministic.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document as BsonDocument, Uuid};
use tracing::debug;

use roster_core::{
    query::{Query, SortDirection},
    error::{StoreError, StoreResult},
    backend::{StoreBackend, StoreBackendBuilder},
};

use crate::evaluator::{DocumentEvaluator, sort_order};

type StoreMap = HashMap<String, MemoryCollection>;


/// Documents of one collection, keyed by ID, with their insertion order.
#[derive(Debug, Default)]
struct MemoryCollection {
    documents: HashMap<String, Bson>,
    order: Vec<String>,
}

impl MemoryCollection {
    fn contains(&self, key: &str) -> bool {
        self.documents.contains_key(key)
    }

    fn push(&mut self, key: String, document: Bson) {
        self.order.push(key.clone());
        self.documents.insert(key, document);
    }

    fn remove(&mut self, key: &str) -> Option<Bson> {
        let removed = self.documents.remove(key)?;
        self.order.retain(|k| k != key);

        Some(removed)
    }

    /// Keys of the documents matched by `query`, after sort, offset and limit.
    fn select(&self, query: &Query) -> StoreResult<Vec<&String>> {
        let mut keys = Vec::new();

        for key in &self.order {
            if let Some(document) = self.documents.get(key) {
                if DocumentEvaluator::matches(document, query.filter.as_ref())? {
                    keys.push(key);
                }
            }
        }

        if let Some(sort) = &query.sort {
            let sort_value = |key: &String| {
                self.documents
                    .get(key)
                    .and_then(Bson::as_document)
                    .and_then(|doc| doc.get(&sort.field))
            };

            // Stable, so ties keep insertion order.
            keys.sort_by(|a, b| {
                let ordering = sort_order(sort_value(a), sort_value(b));

                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        Ok(keys
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn first_key(&self, query: &Query) -> StoreResult<Option<String>> {
        Ok(self.select(query)?.first().map(|key| (*key).clone()))
    }
}


/// Thread-safe in-memory document storage backend.
///
/// Cloning is cheap and clones share the same data. One async read-write
/// lock guards all collections, so each backend call observes and applies a
/// consistent snapshot and the find-and-modify operations are atomic.
///
/// Queries scan the whole collection; there are no indexes.
///
/// # Example
///
/// ```ignore
/// use roster_memory::InMemoryStore;
/// use roster_core::backend::StoreBackend;
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
/// let id = Uuid::new();
/// store.insert_documents(vec![(id, Bson::Document(doc! { "name": "Alice" }))], "people").await?;
/// assert_eq!(store.get_documents(vec![id], "people").await?.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

fn project(mut document: Bson, query: &Query) -> Bson {
    if let (Some(projection), Some(doc)) = (&query.projection, document.as_document_mut()) {
        projection.apply(doc);
    }

    document
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let existing = store.get(collection);

        // Check the whole batch first so a failed insert writes nothing, not
        // even an empty collection.
        let mut batch = Vec::with_capacity(documents.len());
        for (id, doc) in documents {
            let key = id.to_string();

            if existing.is_some_and(|c| c.contains(&key)) || batch.iter().any(|(k, _)| k == &key) {
                return Err(StoreError::DocumentAlreadyExists(key, collection.to_string()));
            }
            if !matches!(doc, Bson::Document(_)) {
                return Err(StoreError::InvalidDocument(format!("{key} is not a document")));
            }

            batch.push((key, doc));
        }

        debug!(collection, count = batch.len(), "inserting documents");

        let collection_map = store
            .entry(collection.to_string())
            .or_default();
        for (key, doc) in batch {
            collection_map.push(key, doc);
        }

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(StoreError::CollectionNotFound(collection.to_string())),
        };

        for (id, _) in &documents {
            let key = id.to_string();

            if !collection_map.contains(&key) {
                return Err(StoreError::DocumentNotFound(key, collection.to_string()));
            }
        }

        for (id, doc) in documents {
            collection_map.documents.insert(id.to_string(), doc);
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> StoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(ids
            .into_iter()
            .filter_map(|id| collection_map.documents.get(&id.to_string()).cloned())
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(collection_map
            .select(&query)?
            .into_iter()
            .filter_map(|key| collection_map.documents.get(key).cloned())
            .map(|doc| project(doc, &query))
            .collect())
    }

    async fn find_one_and_update(
        &self,
        query: Query,
        changes: BsonDocument,
        collection: &str,
    ) -> StoreResult<Option<Bson>> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(None);
        };
        let Some(key) = collection_map.first_key(&query)? else {
            return Ok(None);
        };

        let Some(document) = collection_map
            .documents
            .get_mut(&key)
            .and_then(Bson::as_document_mut)
        else {
            return Ok(None);
        };

        for (field, value) in changes {
            document.insert(field, value);
        }

        Ok(Some(project(Bson::Document(document.clone()), &query)))
    }

    async fn find_one_and_delete(&self, query: Query, collection: &str) -> StoreResult<Option<Bson>> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(None);
        };

        Ok(match collection_map.first_key(&query)? {
            Some(key) => collection_map
                .remove(&key)
                .map(|doc| project(doc, &query)),
            None => None,
        })
    }

    async fn delete_matching(&self, query: Query, collection: &str) -> StoreResult<u64> {
        let filter_only = Query { filter: query.filter, ..Query::default() };

        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(0);
        };

        let keys = collection_map
            .select(&filter_only)?
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        for key in &keys {
            collection_map.remove(key);
        }

        debug!(collection, removed = keys.len(), "deleted matching documents");

        Ok(keys.len() as u64)
    }

    async fn create_collection(&self, name: &str) -> StoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let mut names = self.store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }
}


/// Builder for [`InMemoryStore`]; building never fails.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use roster_core::query::{Filter, Projection};

    const PEOPLE: &str = "people";

    async fn seeded(names: &[&str]) -> (InMemoryStore, Vec<Uuid>) {
        let store = InMemoryStore::new();
        let mut ids = Vec::new();

        for name in names {
            let id = Uuid::new();
            store
                .insert_documents(
                    vec![(id, Bson::Document(doc! { "id": id, "name": *name, "age": 30 }))],
                    PEOPLE,
                )
                .await
                .unwrap();
            ids.push(id);
        }

        (store, ids)
    }

    fn names(documents: &[Bson]) -> Vec<&str> {
        documents
            .iter()
            .map(|d| d.as_document().unwrap().get_str("name").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn duplicate_in_batch_writes_nothing() {
        let store = InMemoryStore::new();
        let id = Uuid::new();
        let other = Uuid::new();

        let err = store
            .insert_documents(
                vec![
                    (other, Bson::Document(doc! { "name": "A" })),
                    (id, Bson::Document(doc! { "name": "B" })),
                    (id, Bson::Document(doc! { "name": "C" })),
                ],
                PEOPLE,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DocumentAlreadyExists(..)));
        assert!(store.get_documents(vec![other], PEOPLE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_batch_does_not_create_the_collection() {
        let store = InMemoryStore::new();
        let id = Uuid::new();

        let err = store
            .insert_documents(
                vec![
                    (id, Bson::Document(doc! { "name": "A" })),
                    (id, Bson::Document(doc! { "name": "B" })),
                ],
                PEOPLE,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DocumentAlreadyExists(..)));
        assert!(store.list_collections().await.unwrap().is_empty());

        let err = store
            .insert_documents(vec![(id, Bson::String("loose".into()))], PEOPLE)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidDocument(_)));
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_limit_returns_nothing() {
        let (store, _) = seeded(&["Alice", "Bob"]).await;

        let found = store
            .query_documents(Query::builder().limit(0).build(), PEOPLE)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn unsorted_queries_follow_insertion_order() {
        let (store, _) = seeded(&["Charlie", "Alice", "Bob"]).await;

        let found = store.query_documents(Query::new(), PEOPLE).await.unwrap();
        assert_eq!(names(&found), ["Charlie", "Alice", "Bob"]);
    }

    #[tokio::test]
    async fn sort_limit_and_projection_apply_in_order() {
        let (store, _) = seeded(&["Charlie", "Alice", "Bob"]).await;

        let query = Query::builder()
            .sort("name", SortDirection::Asc)
            .limit(2)
            .projection(Projection::exclude(["age"]))
            .build();
        let found = store.query_documents(query, PEOPLE).await.unwrap();

        assert_eq!(names(&found), ["Alice", "Bob"]);
        assert!(found.iter().all(|d| !d.as_document().unwrap().contains_key("age")));
        assert!(found.iter().all(|d| d.as_document().unwrap().contains_key("id")));
    }

    #[tokio::test]
    async fn find_one_and_update_returns_new_version() {
        let (store, ids) = seeded(&["Ann", "Ann"]).await;

        let updated = store
            .find_one_and_update(Query::filtered(Filter::eq("name", "Ann")), doc! { "age": 20 }, PEOPLE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.as_document().unwrap().get_i32("age").unwrap(), 20);

        // Only the first match changes.
        let second = store.get_documents(vec![ids[1]], PEOPLE).await.unwrap();
        assert_eq!(second[0].as_document().unwrap().get_i32("age").unwrap(), 30);
    }

    #[tokio::test]
    async fn find_one_and_delete_returns_prior_contents() {
        let (store, ids) = seeded(&["Ann", "Bob"]).await;

        let removed = store
            .find_one_and_delete(Query::filtered(Filter::eq("id", ids[1])), PEOPLE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed.as_document().unwrap().get_str("name").unwrap(), "Bob");

        let missing = store
            .find_one_and_delete(Query::filtered(Filter::eq("id", ids[1])), PEOPLE)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_matching_ignores_limit_and_counts() {
        let (store, _) = seeded(&["Mary", "Bob", "Mary"]).await;

        let query = Query::builder().filter(Filter::eq("name", "Mary")).limit(1).build();
        assert_eq!(store.delete_matching(query, PEOPLE).await.unwrap(), 2);

        let left = store.query_documents(Query::new(), PEOPLE).await.unwrap();
        assert_eq!(names(&left), ["Bob"]);
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let (store, _) = seeded(&["Ann"]).await;

        let err = store
            .update_documents(vec![(Uuid::new(), Bson::Document(doc! { "name": "Ghost" }))], PEOPLE)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DocumentNotFound(..)));
    }

    #[tokio::test]
    async fn collections_can_be_listed_and_dropped() {
        let store = InMemoryStore::builder().build().await.unwrap();
        store.create_collection("people").await.unwrap();
        store.create_collection("pets").await.unwrap();

        assert_eq!(store.list_collections().await.unwrap(), ["people", "pets"]);

        store.drop_collection("pets").await.unwrap();
        assert!(matches!(
            store.drop_collection("pets").await,
            Err(StoreError::CollectionNotFound(_))
        ));
    }
}
