//! The document store: a backend plus typed collection access.
//!
//! ```ignore
//! use roster_core::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let pets = store.typed_collection::<Pet>();
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::TypedCollection,
    document::Document,
    error::StoreResult,
};

/// A document store bound to a backend type.
///
/// Use [`DocumentStore::into_dyn`] to erase the backend type when it is only
/// known at runtime; the result is a [`DynDocumentStore`], which supports the
/// same operations.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

/// A document store whose backend was chosen at runtime.
pub type DynDocumentStore = DocumentStore<Box<dyn DynStoreBackend>>;

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Gets the collection for `D`, named by `D::collection_name()`.
    pub fn typed_collection<'a, D: Document>(&'a self) -> TypedCollection<'a, B, D> {
        TypedCollection::new(D::collection_name().to_string(), &self.backend)
    }

    /// Creates an empty collection.
    pub async fn create_collection(&self, name: &str) -> StoreResult<()> {
        self.backend.create_collection(name).await
    }

    /// Drops a collection and all its documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or deletion fails.
    pub async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> StoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: StoreBackend + 'static> DocumentStore<B> {
    /// Erases the backend type.
    pub fn into_dyn(self) -> DynDocumentStore {
        DocumentStore::new(Box::new(self.backend) as Box<dyn DynStoreBackend>)
    }
}
