//! A typed `Person` repository over a pluggable document store.
//!
//! The [`PersonRepository`](repository::PersonRepository) trait exposes the
//! basic document-database operations for a single record type: create one
//! or many, find by name, favorite food or identifier, fetch-edit-save,
//! atomic find-and-update, removal by identifier or by name, and a chained
//! filter/sort/limit/projection query. It is implemented for every
//! [`DocumentStore`](roster_core::store::DocumentStore), so the same code runs
//! against the in-memory backend and MongoDB.
//!
//! # Quick Start
//!
//! ```ignore
//! use roster::{prelude::*, config::StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> StoreResult<()> {
//!     roster::logging::init();
//!
//!     // MONGO_URI unset: in-memory store
//!     let store = StoreConfig::from_env().connect().await?;
//!
//!     let john = store.create_one().await?;
//!     let john = store.find_edit_then_save(&john.id).await?;
//!     println!("{john:?}");
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - in-process storage, used when no connection string is configured
//! - [`mongodb`] - MongoDB storage (requires the `mongodb` feature)

pub mod config;
pub mod logging;
pub mod person;
pub mod prelude;
pub mod repository;

pub use roster_core::{collection, document, store, backend, query, error};

pub use bson;

/// In-memory storage backend.
pub mod memory {
    pub use roster_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use roster_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
