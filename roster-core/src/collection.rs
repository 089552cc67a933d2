//! Typed access to a single collection.
//!
//! A [`TypedCollection`] converts between a [`Document`] type and the BSON a
//! backend stores, and runs [`Document::validate`] before every write.
//!
//! ```ignore
//! let pets = store.typed_collection::<Pet>();
//! pets.insert(vec![Pet { id: Uuid::new(), name: "Rex".into() }]).await?;
//! let rex = pets.find_one(Query::filtered(Filter::eq("name", "Rex"))).await?;
//! ```

use bson::{Bson, Document as BsonDocument, Uuid};
use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt, ID_FIELD},
    error::StoreResult,
    query::{Filter, Query},
};

#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a B,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents. Nothing is written if any document fails
    /// validation.
    ///
    /// # Errors
    ///
    /// Validation and serialization errors, plus whatever the backend reports
    /// (for example a duplicate ID).
    pub async fn insert(&self, documents: Vec<D>) -> StoreResult<()> {
        self.backend
            .insert_documents(Self::prepare(documents)?, self.name())
            .await
    }

    /// Replaces existing documents entirely.
    ///
    /// # Errors
    ///
    /// Validation and serialization errors, or
    /// [`StoreError::DocumentNotFound`](crate::error::StoreError::DocumentNotFound)
    /// when a document is no longer stored.
    pub async fn update(&self, documents: Vec<D>) -> StoreResult<()> {
        self.backend
            .update_documents(Self::prepare(documents)?, self.name())
            .await
    }

    /// Fetches documents by ID. Unknown IDs are omitted.
    pub async fn get<U>(&self, ids: Vec<U>) -> StoreResult<Vec<D>>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        Self::restore_all(
            self.backend
                .get_documents(ids.into_iter().map(Into::into).collect(), self.name())
                .await?,
        )
    }

    /// Runs a structured query.
    pub async fn query(&self, query: Query) -> StoreResult<Vec<D>> {
        Self::restore_all(
            self.backend
                .query_documents(query, self.name())
                .await?,
        )
    }

    /// Returns the first document matched by `query`, if any.
    pub async fn find_one(&self, mut query: Query) -> StoreResult<Option<D>> {
        query.limit = Some(1);

        Ok(self.query(query).await?.into_iter().next())
    }

    /// Returns the document with the given ID, if stored.
    pub async fn find_by_id(&self, id: &Uuid) -> StoreResult<Option<D>> {
        Ok(self.get(vec![*id]).await?.into_iter().next())
    }

    /// Sets `changes` on the first document matched by `query` and returns
    /// the updated document.
    ///
    /// `changes` bypasses [`Document::validate`]; only set fields that
    /// validation does not cover.
    pub async fn find_one_and_update(
        &self,
        query: Query,
        changes: BsonDocument,
    ) -> StoreResult<Option<D>> {
        self.backend
            .find_one_and_update(query, changes, self.name())
            .await?
            .map(D::from_bson)
            .transpose()
    }

    /// Removes the document with the given ID and returns its prior contents.
    pub async fn find_by_id_and_delete(&self, id: &Uuid) -> StoreResult<Option<D>> {
        self.backend
            .find_one_and_delete(Query::filtered(Filter::eq(ID_FIELD, *id)), self.name())
            .await?
            .map(D::from_bson)
            .transpose()
    }

    /// Removes every document matched by the query's filter and returns the count.
    pub async fn delete_many(&self, query: Query) -> StoreResult<u64> {
        self.backend
            .delete_matching(query, self.name())
            .await
    }

    fn prepare(documents: Vec<D>) -> StoreResult<Vec<(Uuid, Bson)>> {
        documents
            .into_iter()
            .map(|d| {
                d.validate()?;
                d.to_bson().map(|b| (*d.id(), b))
            })
            .collect()
    }

    fn restore_all(documents: Vec<Bson>) -> StoreResult<Vec<D>> {
        documents
            .into_iter()
            .map(D::from_bson)
            .collect()
    }
}
