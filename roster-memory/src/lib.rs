//! In-memory storage backend for roster.
//!
//! A thread-safe [`StoreBackend`](roster_core::backend::StoreBackend) that
//! keeps every collection in process memory behind an async read-write lock.
//! It is the default backend when no database connection string is
//! configured, and the backend the test suites run against.
//!
//! - **Insertion order** - unsorted queries return documents in the order they were inserted
//! - **Atomic batches** - a bulk insert with a duplicate ID writes nothing
//! - **Full query support** - filters, sorting, offset, limit and projection
//!
//! ```ignore
//! use roster_core::{backend::StoreBackendBuilder, store::DocumentStore};
//! use roster_memory::InMemoryStore;
//!
//! let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//! ```

pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
