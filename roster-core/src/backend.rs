//! Storage backend abstraction.
//!
//! A [`StoreBackend`] stores BSON documents keyed by [`Uuid`] inside named
//! collections. It knows nothing about document types; typed access lives in
//! [`crate::collection`]. Backends must be `Send + Sync` since one instance is
//! shared by every caller for the lifetime of the process.
//!
//! [`DynStoreBackend`] is the object-safe twin, implemented for every
//! backend, and `Box<dyn DynStoreBackend>` is itself a [`StoreBackend`] so a
//! backend chosen at runtime plugs into the same generic code.

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, Uuid};
use std::fmt::Debug;

use crate::{error::StoreResult, query::Query};

/// Abstract interface for document storage backends.
///
/// # Atomicity
///
/// [`find_one_and_update`](StoreBackend::find_one_and_update),
/// [`find_one_and_delete`](StoreBackend::find_one_and_delete) and
/// [`delete_matching`](StoreBackend::delete_matching) are single operations:
/// no other write may interleave between locating and modifying a document.
///
/// # Missing documents
///
/// Reads never fail because a document is absent. They return fewer
/// documents or `None` instead.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`StoreError::DocumentAlreadyExists`](crate::error::StoreError::DocumentAlreadyExists)
    /// if any ID is already stored.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()>;

    /// Replaces existing documents entirely.
    ///
    /// # Errors
    ///
    /// [`StoreError::DocumentNotFound`](crate::error::StoreError::DocumentNotFound)
    /// if any ID is not stored.
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()>;

    /// Fetches documents by ID. Unknown IDs are omitted from the result.
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> StoreResult<Vec<Bson>>;

    /// Runs a structured query and returns the matching documents.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> StoreResult<Vec<Bson>>;

    /// Sets `changes` on the first document matched by `query` and returns
    /// the document as it is after the update.
    ///
    /// "First" honours the query's sort, falling back to the backend's
    /// natural order. Returns `Ok(None)` when nothing matches.
    async fn find_one_and_update(
        &self,
        query: Query,
        changes: BsonDocument,
        collection: &str,
    ) -> StoreResult<Option<Bson>>;

    /// Removes the first document matched by `query` and returns its prior
    /// contents, or `Ok(None)` when nothing matches.
    async fn find_one_and_delete(
        &self,
        query: Query,
        collection: &str,
    ) -> StoreResult<Option<Bson>>;

    /// Removes every document matched by the query's filter and returns the
    /// number removed. Sort, limit and projection are ignored.
    async fn delete_matching(&self, query: Query, collection: &str) -> StoreResult<u64>;

    /// Creates an empty collection. Creating an existing collection is not an error.
    async fn create_collection(&self, name: &str) -> StoreResult<()>;

    /// Drops a collection and every document in it.
    async fn drop_collection(&self, name: &str) -> StoreResult<()>;

    /// Lists the names of all collections.
    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// Releases connections and other resources held by the backend.
    async fn shutdown(self) -> StoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe form of [`StoreBackend`], implemented for every backend.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()>;
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()>;
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> StoreResult<Vec<Bson>>;
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> StoreResult<Vec<Bson>>;
    async fn find_one_and_update(
        &self,
        query: Query,
        changes: BsonDocument,
        collection: &str,
    ) -> StoreResult<Option<Bson>>;
    async fn find_one_and_delete(
        &self,
        query: Query,
        collection: &str,
    ) -> StoreResult<Option<Bson>>;
    async fn delete_matching(&self, query: Query, collection: &str) -> StoreResult<u64>;
    async fn create_collection(&self, name: &str) -> StoreResult<()>;
    async fn drop_collection(&self, name: &str) -> StoreResult<()>;
    async fn list_collections(&self) -> StoreResult<Vec<String>>;
    async fn shutdown_boxed(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()> {
        StoreBackend::insert_documents(self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()> {
        StoreBackend::update_documents(self, documents, collection).await
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> StoreResult<Vec<Bson>> {
        StoreBackend::get_documents(self, ids, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> StoreResult<Vec<Bson>> {
        StoreBackend::query_documents(self, query, collection).await
    }

    async fn find_one_and_update(
        &self,
        query: Query,
        changes: BsonDocument,
        collection: &str,
    ) -> StoreResult<Option<Bson>> {
        StoreBackend::find_one_and_update(self, query, changes, collection).await
    }

    async fn find_one_and_delete(
        &self,
        query: Query,
        collection: &str,
    ) -> StoreResult<Option<Bson>> {
        StoreBackend::find_one_and_delete(self, query, collection).await
    }

    async fn delete_matching(&self, query: Query, collection: &str) -> StoreResult<u64> {
        StoreBackend::delete_matching(self, query, collection).await
    }

    async fn create_collection(&self, name: &str) -> StoreResult<()> {
        StoreBackend::create_collection(self, name).await
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> StoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()> {
        DynStoreBackend::insert_documents(&**self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()> {
        DynStoreBackend::update_documents(&**self, documents, collection).await
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> StoreResult<Vec<Bson>> {
        DynStoreBackend::get_documents(&**self, ids, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> StoreResult<Vec<Bson>> {
        DynStoreBackend::query_documents(&**self, query, collection).await
    }

    async fn find_one_and_update(
        &self,
        query: Query,
        changes: BsonDocument,
        collection: &str,
    ) -> StoreResult<Option<Bson>> {
        DynStoreBackend::find_one_and_update(&**self, query, changes, collection).await
    }

    async fn find_one_and_delete(
        &self,
        query: Query,
        collection: &str,
    ) -> StoreResult<Option<Bson>> {
        DynStoreBackend::find_one_and_delete(&**self, query, collection).await
    }

    async fn delete_matching(&self, query: Query, collection: &str) -> StoreResult<u64> {
        DynStoreBackend::delete_matching(&**self, query, collection).await
    }

    async fn create_collection(&self, name: &str) -> StoreResult<()> {
        DynStoreBackend::create_collection(&**self, name).await
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        DynStoreBackend::drop_collection(&**self, name).await
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        DynStoreBackend::list_collections(&**self).await
    }

    async fn shutdown(self) -> StoreResult<()> {
        DynStoreBackend::shutdown_boxed(self).await
    }
}

/// Async factory for a backend, so connection setup can fail cleanly.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> StoreResult<Self::Backend>;
}
