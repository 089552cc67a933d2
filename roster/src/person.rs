//! The `Person` record and the values the repository works with.

use bson::Uuid;
use serde::{Deserialize, Serialize};

use roster_core::{
    document::Document,
    error::{StoreError, StoreResult},
};

/// Collection that holds every [`Person`].
pub const PEOPLE_COLLECTION: &str = "people";

/// Stored key of [`Person::name`].
pub const NAME_FIELD: &str = "name";
/// Stored key of [`Person::age`].
pub const AGE_FIELD: &str = "age";
/// Stored key of [`Person::favorite_foods`].
pub const FAVORITE_FOODS_FIELD: &str = "favoriteFoods";

pub const SAMPLE_NAME: &str = "John";
pub const SAMPLE_AGE: i32 = 23;
pub const SAMPLE_FAVORITE_FOODS: [&str; 2] = ["pizza", "pasta"];

/// Appended by fetch-edit-save.
pub const FOOD_TO_ADD: &str = "hamburger";
/// Set by find-one-and-update.
pub const AGE_TO_SET: i32 = 20;
/// Removed by remove-many.
pub const NAME_TO_REMOVE: &str = "Mary";
/// Searched by the query chain.
pub const FOOD_TO_SEARCH: &str = "burrito";
pub const QUERY_CHAIN_LIMIT: usize = 2;

/// A stored person.
///
/// The identifier is assigned once, when the record is created from a
/// [`NewPerson`], and never changes afterwards. `age` is left out of the
/// stored document when absent, and `favorite_foods` keeps insertion order
/// including duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl Document for Person {
    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        PEOPLE_COLLECTION
    }

    fn validate(&self) -> StoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Validation("person name is required".to_string()));
        }

        Ok(())
    }
}

impl From<NewPerson> for Person {
    fn from(new: NewPerson) -> Self {
        Self {
            id: Uuid::new(),
            name: new.name,
            age: new.age,
            favorite_foods: new.favorite_foods,
        }
    }
}

/// The fields of a person before it has been stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl NewPerson {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn favorite_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    /// The fixed record written by `create_one`.
    pub fn sample() -> Self {
        Self::new(SAMPLE_NAME)
            .age(SAMPLE_AGE)
            .favorite_foods(SAMPLE_FAVORITE_FOODS)
    }
}

/// Outcome of a bulk removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted_count: u64,
}
