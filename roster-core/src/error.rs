//! Error types shared by every store backend and the repository facade.
//!
//! Lookups that find nothing are not errors: they surface as `Ok(None)` or an
//! empty `Vec`. Everything in [`StoreError`] is a real failure.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// All failures a store operation can report.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Converting a document to or from BSON/JSON failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The backend could not be configured or connected.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document failed its own validation rules and was not written.
    #[error("Validation error: {0}")]
    Validation(String),
    /// A document with the given ID already exists.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// A write targeted a document that does not exist.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The collection does not exist.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The stored value is not shaped like a document.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The storage engine or its driver reported an error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result alias used by every fallible store operation.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<BsonError> for StoreError {
    fn from(err: BsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for StoreError {
    fn from(err: SerdeJsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
