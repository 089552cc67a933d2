//! Document storage layer underneath the roster repository.
//!
//! - **Documents** ([`document`]) - the [`Document`](document::Document) trait and BSON/JSON conversion
//! - **Backends** ([`backend`]) - the async [`StoreBackend`](backend::StoreBackend) trait
//! - **Queries** ([`query`]) - filter expressions, sorting, paging and projection
//! - **Collections** ([`collection`]) - typed, validated access to one collection
//! - **Store** ([`store`]) - a backend plus collection access
//! - **Errors** ([`error`]) - [`StoreError`](error::StoreError) and [`StoreResult`](error::StoreResult)

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod query;
pub mod store;
