//! Backend selection from the environment.

use std::env;

use tracing::info;

use roster_core::{
    backend::StoreBackendBuilder,
    error::StoreResult,
    store::{DocumentStore, DynDocumentStore},
};
use roster_memory::InMemoryStore;

/// Connection string of the MongoDB server. Unset selects the in-memory store.
pub const MONGO_URI_VAR: &str = "MONGO_URI";
/// Database name, overriding the one in the connection string.
pub const MONGO_DATABASE_VAR: &str = "MONGO_DATABASE";

/// Which backend the application stores people in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    MongoDb {
        uri: String,
        database: Option<String>,
    },
}

impl StoreConfig {
    /// Reads the configuration from the process environment, after loading a
    /// `.env` file from the working directory if there is one.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self::from_vars(
            env::var(MONGO_URI_VAR).ok(),
            env::var(MONGO_DATABASE_VAR).ok(),
        )
    }

    /// Builds the configuration from raw variable values. Blank values count
    /// as unset.
    pub fn from_vars(uri: Option<String>, database: Option<String>) -> Self {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        match present(uri) {
            Some(uri) => StoreConfig::MongoDb {
                uri,
                database: present(database),
            },
            None => StoreConfig::Memory,
        }
    }

    /// Creates the configured backend and wraps it in a store.
    ///
    /// # Errors
    ///
    /// [`StoreError::Initialization`](roster_core::error::StoreError::Initialization)
    /// when the connection string is invalid, or when MongoDB is configured
    /// but the crate was built without the `mongodb` feature.
    pub async fn connect(&self) -> StoreResult<DynDocumentStore> {
        match self {
            StoreConfig::Memory => {
                info!("using in-memory store");

                Ok(DocumentStore::new(InMemoryStore::builder().build().await?).into_dyn())
            }
            #[cfg(feature = "mongodb")]
            StoreConfig::MongoDb { uri, database } => {
                let mut builder = roster_mongodb::MongoDbStore::builder(uri);
                if let Some(database) = database {
                    builder = builder.database(database);
                }

                Ok(DocumentStore::new(builder.build().await?).into_dyn())
            }
            #[cfg(not(feature = "mongodb"))]
            StoreConfig::MongoDb { .. } => Err(roster_core::error::StoreError::Initialization(
                format!("{MONGO_URI_VAR} is set but roster was built without the `mongodb` feature"),
            )),
        }
    }
}
