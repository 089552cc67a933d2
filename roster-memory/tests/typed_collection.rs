use bson::{Uuid, doc};
use roster_core::{
    document::Document,
    error::{StoreError, StoreResult},
    query::{Filter, Query, SortDirection},
    store::DocumentStore,
};
use roster_memory::InMemoryStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Pet {
    id: Uuid,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    legs: Option<i32>,
}

impl Pet {
    fn new(name: &str, legs: i32) -> Self {
        Pet { id: Uuid::new(), name: name.into(), legs: Some(legs) }
    }
}

impl Document for Pet {
    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        "pets"
    }

    fn validate(&self) -> StoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Validation("name is required".into()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn typed_round_trip_through_store() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pets = store.typed_collection::<Pet>();
    let rex = Pet::new("Rex", 4);

    pets.insert(vec![rex.clone(), Pet::new("Polly", 2)]).await.unwrap();

    assert_eq!(pets.name(), "pets");
    assert_eq!(pets.find_by_id(&rex.id).await.unwrap(), Some(rex.clone()));
    assert_eq!(pets.find_by_id(&Uuid::new()).await.unwrap(), None);

    let birds = pets.query(Query::filtered(Filter::eq("legs", 2))).await.unwrap();
    assert_eq!(birds.len(), 1);
    assert_eq!(birds[0].name, "Polly");
}

#[tokio::test]
async fn invalid_document_blocks_whole_batch() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pets = store.typed_collection::<Pet>();

    let err = pets
        .insert(vec![Pet::new("Rex", 4), Pet::new("  ", 4)])
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Validation(_)));
    assert!(pets.query(Query::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn find_one_honours_sort() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pets = store.typed_collection::<Pet>();
    pets.insert(vec![Pet::new("Spot", 4), Pet::new("Ant", 6)]).await.unwrap();

    let first = pets
        .find_one(Query::builder().sort("name", SortDirection::Asc).build())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.name, "Ant");
}

#[tokio::test]
async fn find_and_modify_operations() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pets = store.typed_collection::<Pet>();
    let rex = Pet::new("Rex", 4);
    pets.insert(vec![rex.clone()]).await.unwrap();

    let updated = pets
        .find_one_and_update(Query::filtered(Filter::eq("name", "Rex")), doc! { "legs": 3 })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.legs, Some(3));
    assert_eq!(updated.id, rex.id);

    let removed = pets.find_by_id_and_delete(&rex.id).await.unwrap().unwrap();
    assert_eq!(removed.legs, Some(3));
    assert_eq!(pets.find_by_id_and_delete(&rex.id).await.unwrap(), None);
}

#[tokio::test]
async fn dyn_store_behaves_like_typed_store() {
    let store = DocumentStore::new(InMemoryStore::new()).into_dyn();
    let pets = store.typed_collection::<Pet>();
    pets.insert(vec![Pet::new("Rex", 4), Pet::new("Rex", 3)]).await.unwrap();

    assert_eq!(pets.delete_many(Query::filtered(Filter::eq("name", "Rex"))).await.unwrap(), 2);
    assert_eq!(store.list_collections().await.unwrap(), ["pets"]);

    store.shutdown().await.unwrap();
}
