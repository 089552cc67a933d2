//! Traits that turn a plain serde struct into a storable document.

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::error::StoreResult;

/// Key under which every document serializes its identifier.
pub const ID_FIELD: &str = "id";

/// A record type that can live in a collection.
///
/// Every document carries its own identifier, serialized under [`ID_FIELD`],
/// and names the collection it belongs to. Typed collections call
/// [`Document::validate`] before each write, so a type can reject values
/// that would break its invariants.
///
/// # Example
///
/// ```ignore
/// use roster_core::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Pet {
///     pub id: Uuid,
///     pub name: String,
/// }
///
/// impl Document for Pet {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "pets"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;

    /// Checks the document before it is written.
    ///
    /// # Errors
    ///
    /// Implementations return [`StoreError::Validation`](crate::error::StoreError::Validation)
    /// describing the first violated rule.
    fn validate(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// BSON and JSON conversions, implemented for every [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> StoreResult<Bson>;

    /// Creates a document from a stored BSON value.
    fn from_bson(bson: Bson) -> StoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> StoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> StoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> StoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> StoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> StoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> StoreResult<Self> {
        Ok(from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Uuid,
        body: String,
    }

    impl Document for Note {
        fn id(&self) -> &Uuid {
            &self.id
        }

        fn collection_name() -> &'static str {
            "notes"
        }

        fn validate(&self) -> StoreResult<()> {
            if self.body.is_empty() {
                return Err(StoreError::Validation("body is required".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn bson_conversion_keeps_fields() {
        let note = Note { id: Uuid::new(), body: "hello".into() };
        let bson = note.to_bson().unwrap();

        let doc = bson.as_document().unwrap();
        assert_eq!(doc.get_str("body").unwrap(), "hello");
        assert_eq!(Note::from_bson(bson).unwrap(), note);
    }

    #[test]
    fn from_bson_rejects_wrong_shape() {
        let err = Note::from_bson(Bson::String("nope".into())).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn validate_is_called_explicitly() {
        let note = Note { id: Uuid::new(), body: String::new() };
        assert!(matches!(note.validate(), Err(StoreError::Validation(_))));
    }
}
