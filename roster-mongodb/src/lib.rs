//! MongoDB backend for roster.
//!
//! Implements [`StoreBackend`](roster_core::backend::StoreBackend) on top of
//! the official async driver. Filters, sorting and projections are translated
//! into MongoDB query documents and executed server-side, and the
//! find-and-modify operations map onto MongoDB's atomic `findOneAndUpdate` and
//! `findOneAndDelete` commands.
//!
//! Every stored document keeps its own `id` field and is also keyed by the
//! same value under `_id`, which is stripped again on the way out.
//!
//! Enable it through the `mongodb` feature of the `roster` crate:
//!
//! ```toml
//! [dependencies]
//! roster = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! ```ignore
//! use roster_core::backend::StoreBackendBuilder;
//! use roster_mongodb::MongoDbStore;
//!
//! let store = MongoDbStore::builder("mongodb://localhost:27017/people_db")
//!     .build()
//!     .await?;
//! ```

pub mod store;
mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder, DEFAULT_DATABASE};
