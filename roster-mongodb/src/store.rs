use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Bson, Uuid, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions, ReturnDocument},
};
use tracing::{debug, info};
use roster_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{StoreError, StoreResult},
    query::Query,
};

use crate::query::MongoQueryTranslator;

/// Database used when neither the builder nor the connection string names one.
pub const DEFAULT_DATABASE: &str = "test";

fn backend_error(err: mongodb::error::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Find options for `query`, or `None` when its limit rules out every
/// document. The server reads `limit: 0` as "no limit", so that case never
/// reaches it.
fn find_options(query: &Query) -> StoreResult<Option<FindOptions>> {
    let mut options = FindOptions::default();

    if let Some(limit) = query.limit {
        if limit == 0 {
            return Ok(None);
        }
        options.limit = Some(
            i64::try_from(limit)
                .map_err(|_| StoreError::Backend(format!("limit {limit} is out of range")))?,
        );
    }
    if let Some(skip) = query.offset {
        options.skip = Some(skip as u64);
    }
    if let Some(sort) = &query.sort {
        options.sort = Some(MongoQueryTranslator::sort(sort));
    }
    if let Some(projection) = &query.projection {
        options.projection = Some(MongoQueryTranslator::projection(projection));
    }

    Ok(Some(options))
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn)
    }

    /// Name of the database this store reads and writes.
    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    /// Stores the document ID as `_id` alongside the document's own fields.
    fn prepare_document(&self, id: &Uuid, document: Bson) -> StoreResult<Document> {
        let mut prepared = match document {
            Bson::Document(doc) => doc,
            _ => return Err(StoreError::InvalidDocument(format!("{id} is not a document"))),
        };
        prepared.insert("_id", *id);

        Ok(prepared)
    }

    fn restore_document(&self, mut document: Document) -> Bson {
        document.remove("_id");

        Bson::Document(document)
    }

    async fn shutdown(self) -> StoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> StoreResult<()> {
        let prepared = documents
            .into_iter()
            .map(|(id, doc)| self.prepare_document(&id, doc))
            .collect::<StoreResult<Vec<Document>>>()?;

        if prepared.is_empty() {
            return Ok(());
        }

        debug!(collection, count = prepared.len(), "inserting documents");

        self.get_collection(collection)
            .insert_many(prepared)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> StoreResult<()> {
        for (id, doc) in documents {
            let result = self.get_collection(collection)
                .replace_one(doc! { "_id": id }, self.prepare_document(&id, doc)?)
                .await
                .map_err(backend_error)?;

            if result.matched_count == 0 {
                return Err(StoreError::DocumentNotFound(id.to_string(), collection.to_string()));
            }
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> StoreResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection)
                .find(doc! { "_id": { "$in": ids } })
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Bson>> {
        let Some(options) = find_options(&query)? else {
            return Ok(Vec::new());
        };

        Ok(
            self.get_collection(collection)
                .find(MongoQueryTranslator::filter(query.filter.as_ref())?)
                .with_options(options)
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn find_one_and_update(
        &self,
        query: Query,
        changes: Document,
        collection: &str,
    ) -> StoreResult<Option<Bson>> {
        let coll = self.get_collection(collection);
        let mut action = coll
            .find_one_and_update(
                MongoQueryTranslator::filter(query.filter.as_ref())?,
                doc! { "$set": changes },
            )
            .return_document(ReturnDocument::After);

        if let Some(sort) = &query.sort {
            action = action.sort(MongoQueryTranslator::sort(sort));
        }
        if let Some(projection) = &query.projection {
            action = action.projection(MongoQueryTranslator::projection(projection));
        }

        Ok(action
            .await
            .map_err(backend_error)?
            .map(|doc| self.restore_document(doc)))
    }

    async fn find_one_and_delete(&self, query: Query, collection: &str) -> StoreResult<Option<Bson>> {
        let coll = self.get_collection(collection);
        let mut action = coll
            .find_one_and_delete(MongoQueryTranslator::filter(query.filter.as_ref())?);

        if let Some(sort) = &query.sort {
            action = action.sort(MongoQueryTranslator::sort(sort));
        }
        if let Some(projection) = &query.projection {
            action = action.projection(MongoQueryTranslator::projection(projection));
        }

        Ok(action
            .await
            .map_err(backend_error)?
            .map(|doc| self.restore_document(doc)))
    }

    async fn delete_matching(&self, query: Query, collection: &str) -> StoreResult<u64> {
        let removed = self.get_collection(collection)
            .delete_many(MongoQueryTranslator::filter(query.filter.as_ref())?)
            .await
            .map_err(backend_error)?
            .deleted_count;

        debug!(collection, removed, "deleted matching documents");

        Ok(removed)
    }

    async fn create_collection(&self, name: &str) -> StoreResult<()> {
        if self.list_collections().await?.iter().any(|existing| existing == name) {
            return Ok(());
        }

        self.client
            .database(&self.database)
            .create_collection(name)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let mut names = self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)?;
        names.sort();

        Ok(names)
    }

    async fn shutdown(self) -> StoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: None,
        }
    }

    /// Overrides the database named in the connection string.
    pub fn database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| StoreError::Initialization(e.to_string()))?;

        let database = self.database
            .or_else(|| options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(options)
            .map_err(|e| StoreError::Initialization(e.to_string()))?;

        info!(database = %database, "connected to MongoDB");

        Ok(MongoDbStore::new(client, database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::query::{Filter, Projection, SortDirection};

    #[test]
    fn zero_limit_skips_the_server() {
        let query = Query::builder().filter(Filter::eq("name", "Ann")).limit(0).build();

        assert!(find_options(&query).unwrap().is_none());
    }

    #[test]
    fn query_stages_map_to_find_options() {
        let query = Query::builder()
            .sort("name", SortDirection::Asc)
            .offset(1)
            .limit(2)
            .projection(Projection::exclude(["age"]))
            .build();

        let options = find_options(&query).unwrap().unwrap();

        assert_eq!(options.limit, Some(2));
        assert_eq!(options.skip, Some(1));
        assert_eq!(options.sort, Some(doc! { "name": 1 }));
        assert_eq!(options.projection, Some(doc! { "age": 0 }));
    }

    #[test]
    fn oversized_limit_is_rejected() {
        let query = Query::builder().limit(usize::MAX).build();

        assert!(matches!(find_options(&query), Err(StoreError::Backend(_))));
    }
}
