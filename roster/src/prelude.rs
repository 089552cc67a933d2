//! Common imports for working with the repository:
//!
//! ```ignore
//! use roster::prelude::*;
//! ```

pub use roster_core::{
    store::{DocumentStore, DynDocumentStore},
    document::{Document, DocumentExt},
    backend::{StoreBackend, StoreBackendBuilder},
    query::{Query, Filter, Projection, SortDirection},
    error::{StoreError, StoreResult},
};

pub use crate::{
    person::{Person, NewPerson, DeleteSummary},
    repository::PersonRepository,
};
