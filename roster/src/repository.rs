//! The Person repository: ten fixed operations over any document store.
//!
//! [`PersonRepository`] is implemented for [`DocumentStore`] over every
//! [`StoreBackend`], including the runtime-selected
//! [`DynDocumentStore`](roster_core::store::DynDocumentStore). Each operation
//! makes a single storage call, except fetch-edit-save which makes two, and
//! delivers its outcome once as a [`StoreResult`]. Failures are logged and
//! then returned to the caller.
//!
//! The fixed operations (`create_one`, `find_edit_then_save`, ...) are thin
//! wrappers over parameterized ones that take the values explicitly.

use async_trait::async_trait;
use bson::{Uuid, doc};
use tracing::{debug, error};

use roster_core::{
    backend::StoreBackend,
    collection::TypedCollection,
    error::StoreResult,
    query::{Filter, Projection, Query, SortDirection},
    store::DocumentStore,
};

use crate::person::{
    AGE_FIELD, AGE_TO_SET, DeleteSummary, FAVORITE_FOODS_FIELD, FOOD_TO_ADD, FOOD_TO_SEARCH,
    NAME_FIELD, NAME_TO_REMOVE, NewPerson, Person, QUERY_CHAIN_LIMIT,
};

#[async_trait]
pub trait PersonRepository: Send + Sync {
    /// Creates a person from `new`, assigning a fresh identifier.
    async fn create_person(&self, new: NewPerson) -> StoreResult<Person>;

    /// Creates several people in one bulk insert. The result keeps input order.
    async fn create_many(&self, people: Vec<NewPerson>) -> StoreResult<Vec<Person>>;

    /// Every person whose name equals `name` exactly.
    async fn find_by_name(&self, name: &str) -> StoreResult<Vec<Person>>;

    /// The first person, in natural order, whose favorite foods include `food`.
    async fn find_one_by_favorite_food(&self, food: &str) -> StoreResult<Option<Person>>;

    async fn find_by_id(&self, id: &Uuid) -> StoreResult<Option<Person>>;

    /// Fetches the person, appends `food` and saves the whole record back.
    ///
    /// Not atomic: a concurrent write between the fetch and the save is
    /// overwritten. Returns `None` when no person has this identifier.
    async fn add_favorite_food(&self, id: &Uuid, food: &str) -> StoreResult<Option<Person>>;

    /// Atomically sets the age of the first person named `name` and returns
    /// the updated record.
    async fn set_age_by_name(&self, name: &str, age: i32) -> StoreResult<Option<Person>>;

    /// Atomically removes the person and returns what was stored.
    async fn remove_by_id(&self, id: &Uuid) -> StoreResult<Option<Person>>;

    async fn remove_by_name(&self, name: &str) -> StoreResult<DeleteSummary>;

    /// People who like `food`, sorted by name, at most `limit` of them, with
    /// the age left out.
    async fn favorite_food_chain(&self, food: &str, limit: usize) -> StoreResult<Vec<Person>>;

    /// Creates the sample person (John, 23, pizza and pasta).
    async fn create_one(&self) -> StoreResult<Person> {
        self.create_person(NewPerson::sample()).await
    }

    async fn find_edit_then_save(&self, id: &Uuid) -> StoreResult<Option<Person>> {
        self.add_favorite_food(id, FOOD_TO_ADD).await
    }

    async fn find_one_and_update(&self, name: &str) -> StoreResult<Option<Person>> {
        self.set_age_by_name(name, AGE_TO_SET).await
    }

    async fn remove_many(&self) -> StoreResult<DeleteSummary> {
        self.remove_by_name(NAME_TO_REMOVE).await
    }

    async fn query_chain(&self) -> StoreResult<Vec<Person>> {
        self.favorite_food_chain(FOOD_TO_SEARCH, QUERY_CHAIN_LIMIT).await
    }
}

/// Logs a failed operation before handing the result back.
fn logged<T>(operation: &'static str, result: StoreResult<T>) -> StoreResult<T> {
    result.inspect_err(|err| error!(operation, error = %err, "person operation failed"))
}

fn people<B: StoreBackend>(store: &DocumentStore<B>) -> TypedCollection<'_, B, Person> {
    store.typed_collection::<Person>()
}

fn by_name(name: &str) -> Query {
    Query::filtered(Filter::eq(NAME_FIELD, name))
}

#[async_trait]
impl<B: StoreBackend> PersonRepository for DocumentStore<B> {
    async fn create_person(&self, new: NewPerson) -> StoreResult<Person> {
        let person = Person::from(new);
        let result = people(self).insert(vec![person.clone()]).await;

        if result.is_ok() {
            debug!(id = %person.id, "created person");
        }

        logged("create_person", result.map(|_| person))
    }

    async fn create_many(&self, new: Vec<NewPerson>) -> StoreResult<Vec<Person>> {
        let created = new.into_iter().map(Person::from).collect::<Vec<_>>();
        let result = people(self).insert(created.clone()).await;

        if result.is_ok() {
            debug!(count = created.len(), "created people");
        }

        logged("create_many", result.map(|_| created))
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Vec<Person>> {
        logged("find_by_name", people(self).query(by_name(name)).await)
    }

    async fn find_one_by_favorite_food(&self, food: &str) -> StoreResult<Option<Person>> {
        let query = Query::filtered(Filter::has_element(FAVORITE_FOODS_FIELD, food));

        logged("find_one_by_favorite_food", people(self).find_one(query).await)
    }

    async fn find_by_id(&self, id: &Uuid) -> StoreResult<Option<Person>> {
        logged("find_by_id", people(self).find_by_id(id).await)
    }

    async fn add_favorite_food(&self, id: &Uuid, food: &str) -> StoreResult<Option<Person>> {
        let collection = people(self);

        let Some(mut person) = logged("add_favorite_food", collection.find_by_id(id).await)? else {
            return Ok(None);
        };
        person.favorite_foods.push(food.to_string());

        logged(
            "add_favorite_food",
            collection.update(vec![person.clone()]).await.map(|_| Some(person)),
        )
    }

    async fn set_age_by_name(&self, name: &str, age: i32) -> StoreResult<Option<Person>> {
        logged(
            "set_age_by_name",
            people(self)
                .find_one_and_update(by_name(name), doc! { AGE_FIELD: age })
                .await,
        )
    }

    async fn remove_by_id(&self, id: &Uuid) -> StoreResult<Option<Person>> {
        logged("remove_by_id", people(self).find_by_id_and_delete(id).await)
    }

    async fn remove_by_name(&self, name: &str) -> StoreResult<DeleteSummary> {
        let result = people(self)
            .delete_many(by_name(name))
            .await
            .map(|deleted_count| DeleteSummary { deleted_count });

        if let Ok(summary) = &result {
            debug!(name, deleted = summary.deleted_count, "removed people by name");
        }

        logged("remove_by_name", result)
    }

    async fn favorite_food_chain(&self, food: &str, limit: usize) -> StoreResult<Vec<Person>> {
        let query = Query::builder()
            .filter(Filter::has_element(FAVORITE_FOODS_FIELD, food))
            .sort(NAME_FIELD, SortDirection::Asc)
            .limit(limit)
            .projection(Projection::exclude([AGE_FIELD]))
            .build();

        logged("favorite_food_chain", people(self).query(query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::{backend::StoreBackendBuilder, error::StoreError};
    use roster_memory::InMemoryStore;

    async fn store() -> DocumentStore<InMemoryStore> {
        DocumentStore::new(InMemoryStore::builder().build().await.unwrap())
    }

    #[tokio::test]
    async fn create_one_stores_the_sample() {
        let store = store().await;

        let john = store.create_one().await.unwrap();

        assert_eq!(john.name, "John");
        assert_eq!(john.age, Some(23));
        assert_eq!(john.favorite_foods, ["pizza", "pasta"]);
        assert_eq!(store.find_by_id(&john.id).await.unwrap(), Some(john));
    }

    #[tokio::test]
    async fn invalid_person_is_not_written() {
        let store = store().await;

        let err = store.create_person(NewPerson::new("")).await.unwrap_err();

        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.find_by_name("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_of_unknown_person_is_none() {
        let store = store().await;

        assert_eq!(store.find_edit_then_save(&Uuid::new()).await.unwrap(), None);
        assert_eq!(store.find_one_and_update("Nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_by_name_counts_removals() {
        let store = store().await;
        store
            .create_many(vec![NewPerson::new("Mary"), NewPerson::new("Mary"), NewPerson::new("Ann")])
            .await
            .unwrap();

        let summary = store.remove_many().await.unwrap();

        assert_eq!(summary, DeleteSummary { deleted_count: 2 });
        assert_eq!(store.find_by_name("Ann").await.unwrap().len(), 1);
    }
}
