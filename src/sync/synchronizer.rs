//! Keeps the local item list consistent with a remote document store.
//!
//! Every mutation goes to the store first; the local list only changes once
//! the store has confirmed the write. Callers address items by their index
//! in the list, and the synchronizer turns that index into a record id
//! according to its [`Lookup`] mode.

use serde_json::Value;

use super::SyncError;
use crate::models::{Draft, Entry, Item, Lookup, QuantityPolicy, RecordId};
use crate::store::{DocumentStore, Fields, StoreError, ITEMS_COLLECTION};

/// Owns the local, ordered item list and mirrors it onto a [`DocumentStore`].
pub struct ItemSynchronizer<S> {
    store: S,
    items: Vec<Entry>,
    lookup: Lookup,
    policy: QuantityPolicy,
}

impl<S: DocumentStore> ItemSynchronizer<S> {
    /// Creates a synchronizer with an empty local list.
    ///
    /// Call [`load_all`](Self::load_all) to populate it from the store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            items: Vec::new(),
            lookup: Lookup::default(),
            policy: QuantityPolicy::default(),
        }
    }

    pub fn with_lookup(mut self, lookup: Lookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_quantity_policy(mut self, policy: QuantityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current local list, in fetch/append order.
    pub fn items(&self) -> &[Entry] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.items.get(index)
    }

    /// Replaces the local list with every record in the store.
    ///
    /// Either the whole fetch decodes or the local list is left as it was.
    pub async fn load_all(&mut self) -> Result<&[Entry], SyncError> {
        tracing::debug!("Loading all documents from '{}'", ITEMS_COLLECTION);

        let documents = self
            .store
            .list_all(ITEMS_COLLECTION)
            .await
            .map_err(SyncError::Fetch)?;

        let entries = documents
            .into_iter()
            .map(|doc| Item::from_fields(doc.fields).map(|item| Entry::new(doc.id, item)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SyncError::Fetch(StoreError::from(e)))?;

        tracing::info!("Loaded {} item(s)", entries.len());
        self.items = entries;
        Ok(&self.items)
    }

    /// Stores a new record for `item`, then appends it to the local list.
    ///
    /// The name is not validated here.
    pub async fn add_item(&mut self, mut item: Item) -> Result<&Entry, SyncError> {
        item.quantity = self.policy.apply(item.quantity);

        tracing::debug!("Inserting '{}' into '{}'", item.name, ITEMS_COLLECTION);
        let id = self
            .store
            .insert(ITEMS_COLLECTION, item.to_fields())
            .await
            .map_err(SyncError::Create)?;

        tracing::info!("Created item '{}' as {}", item.name, id);

        let index = self.items.len();
        self.items.push(Entry::new(id, item));
        Ok(&self.items[index])
    }

    /// Deletes the record behind the item at `index`, then removes it locally.
    ///
    /// Returns the removed entry.
    pub async fn delete_item(&mut self, index: usize) -> Result<Entry, SyncError> {
        let name = self.entry(index)?.name().to_string();
        let id = self.resolve(index).await?;

        tracing::debug!("Deleting {} from '{}'", id, ITEMS_COLLECTION);
        self.store
            .delete_by_id(ITEMS_COLLECTION, &id)
            .await
            .map_err(|e| remote_error(e, &name, SyncError::Delete))?;

        tracing::info!("Deleted item '{}' ({})", name, id);
        Ok(self.items.remove(index))
    }

    /// Sets the quantity of the item at `index`, leaving its name alone.
    pub async fn update_quantity(
        &mut self,
        index: usize,
        quantity: i64,
    ) -> Result<&Entry, SyncError> {
        let name = self.entry(index)?.name().to_string();
        let quantity = self.policy.apply(quantity);
        let id = self.resolve(index).await?;

        let mut partial = Fields::new();
        partial.insert("quantity".to_string(), Value::from(quantity));

        tracing::debug!("Updating quantity of {} in '{}'", id, ITEMS_COLLECTION);
        self.store
            .update_by_id(ITEMS_COLLECTION, &id, partial)
            .await
            .map_err(|e| remote_error(e, &name, SyncError::Update))?;

        tracing::info!("Set quantity of '{}' to {}", name, quantity);

        self.items[index].item.quantity = quantity;
        Ok(&self.items[index])
    }

    /// Adds `delta` (which may be negative) to the quantity at `index`.
    pub async fn adjust_quantity(&mut self, index: usize, delta: i64) -> Result<&Entry, SyncError> {
        let current = self.entry(index)?.quantity();
        self.update_quantity(index, current.saturating_add(delta)).await
    }

    /// Copies the item at `index` into a draft for editing.
    pub fn begin_edit(&self, index: usize) -> Result<Draft, SyncError> {
        self.entry(index).map(Draft::from)
    }

    /// Writes an edited draft back over the record it was taken from.
    ///
    /// The record is updated in place; no new record is created.
    pub async fn commit_edit(&mut self, draft: Draft) -> Result<&Entry, SyncError> {
        let Draft { id, mut item } = draft;

        let index = self
            .items
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| SyncError::NotFound {
                name: item.name.clone(),
            })?;
        let original_name = self.items[index].name().to_string();

        item.quantity = self.policy.apply(item.quantity);
        let target = self.resolve(index).await?;

        tracing::debug!("Replacing fields of {} in '{}'", target, ITEMS_COLLECTION);
        self.store
            .update_by_id(ITEMS_COLLECTION, &target, item.to_fields())
            .await
            .map_err(|e| remote_error(e, &original_name, SyncError::Update))?;

        tracing::info!("Updated item '{}' -> {}", original_name, item);

        self.items[index].item = item;
        Ok(&self.items[index])
    }

    /// Items whose name contains `query`, ignoring case, in list order.
    ///
    /// The iterator is lazy and borrows the list; call again for a fresh pass.
    pub fn filter<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        let needle = query.to_lowercase();
        self.items
            .iter()
            .filter(move |entry| entry.name().to_lowercase().contains(&needle))
    }

    fn entry(&self, index: usize) -> Result<&Entry, SyncError> {
        self.items.get(index).ok_or(SyncError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Finds the record id for the item at `index`.
    async fn resolve(&self, index: usize) -> Result<RecordId, SyncError> {
        let entry = self.entry(index)?;

        match self.lookup {
            Lookup::Id => Ok(entry.id.clone()),
            Lookup::Name => {
                let name = entry.name();
                tracing::debug!("Looking up '{}' by name in '{}'", name, ITEMS_COLLECTION);
                let matches = self
                    .store
                    .find_by_field(ITEMS_COLLECTION, "name", &Value::from(name))
                    .await
                    .map_err(|source| SyncError::Lookup {
                        name: name.to_string(),
                        source,
                    })?;

                if matches.len() > 1 {
                    tracing::warn!(
                        "{} records named '{}'; using the oldest",
                        matches.len(),
                        name
                    );
                }

                matches.into_iter().next().map(|doc| doc.id).ok_or_else(|| {
                    tracing::warn!("No record named '{}' in store", name);
                    SyncError::NotFound {
                        name: name.to_string(),
                    }
                })
            }
        }
    }
}

/// A missing record becomes [`SyncError::NotFound`]; anything else is `wrap`ped.
fn remote_error(e: StoreError, name: &str, wrap: fn(StoreError) -> SyncError) -> SyncError {
    if e.is_not_found() {
        tracing::warn!("Record for '{}' is gone from the store", name);
        SyncError::NotFound {
            name: name.to_string(),
        }
    } else {
        wrap(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryDocumentStore, StoreOp};

    async fn seeded(items: &[(&str, i64)]) -> ItemSynchronizer<MemoryDocumentStore> {
        let store = MemoryDocumentStore::new();
        for (name, quantity) in items {
            store
                .insert(ITEMS_COLLECTION, Item::new(*name, *quantity).to_fields())
                .await
                .unwrap();
        }
        let mut sync = ItemSynchronizer::new(store);
        sync.load_all().await.unwrap();
        sync
    }

    fn names<S: DocumentStore>(sync: &ItemSynchronizer<S>) -> Vec<&str> {
        sync.items().iter().map(|e| e.name()).collect()
    }

    async fn remote_item(sync: &ItemSynchronizer<MemoryDocumentStore>, id: &RecordId) -> Item {
        let doc = sync.store().get(ITEMS_COLLECTION, id).await.unwrap();
        Item::from_fields(doc.fields).unwrap()
    }

    #[tokio::test]
    async fn test_load_all_replaces_local_list() {
        let mut sync = seeded(&[("Apple", 10), ("Banana", 20)]).await;
        assert_eq!(names(&sync), vec!["Apple", "Banana"]);

        sync.store()
            .insert(ITEMS_COLLECTION, Item::new("Cherry", 3).to_fields())
            .await
            .unwrap();
        sync.load_all().await.unwrap();

        assert_eq!(names(&sync), vec!["Apple", "Banana", "Cherry"]);
    }

    #[tokio::test]
    async fn test_load_all_twice_is_identical() {
        let mut sync = seeded(&[("Apple", 10), ("Banana", 20)]).await;

        let first = sync.load_all().await.unwrap().to_vec();
        let second = sync.load_all().await.unwrap().to_vec();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_load_all_failure_keeps_previous_list() {
        let mut sync = seeded(&[("Apple", 10)]).await;
        sync.store().fail_on(StoreOp::ListAll).await;

        let err = sync.load_all().await.unwrap_err();

        assert!(matches!(err, SyncError::Fetch(_)));
        assert_eq!(names(&sync), vec!["Apple"]);
    }

    #[tokio::test]
    async fn test_load_all_undecodable_record_keeps_previous_list() {
        let mut sync = seeded(&[("Apple", 10)]).await;

        let mut bad = Fields::new();
        bad.insert("name".to_string(), Value::from("Broken"));
        bad.insert("quantity".to_string(), Value::from("many"));
        sync.store().insert(ITEMS_COLLECTION, bad).await.unwrap();

        let err = sync.load_all().await.unwrap_err();

        assert!(matches!(err, SyncError::Fetch(StoreError::Serialization(_))));
        assert_eq!(names(&sync), vec!["Apple"]);
    }

    #[tokio::test]
    async fn test_add_item_appends_after_insert() {
        let mut sync = seeded(&[("Apple", 10)]).await;

        let entry = sync.add_item(Item::new("Banana", 20)).await.unwrap().clone();

        assert_eq!(names(&sync), vec!["Apple", "Banana"]);
        assert_eq!(remote_item(&sync, &entry.id).await, Item::new("Banana", 20));
        assert_eq!(sync.store().count(ITEMS_COLLECTION).await, 2);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_list_unchanged() {
        let mut sync = seeded(&[("Apple", 10)]).await;
        sync.store().fail_on(StoreOp::Insert).await;

        let err = sync.add_item(Item::new("Banana", 20)).await.unwrap_err();

        assert!(matches!(err, SyncError::Create(_)));
        assert_eq!(sync.len(), 1);
        assert_eq!(sync.store().count(ITEMS_COLLECTION).await, 1);
    }

    #[tokio::test]
    async fn test_update_quantity_scenario() {
        let mut sync = seeded(&[("Apple", 10), ("Banana", 20)]).await;

        sync.update_quantity(0, 15).await.unwrap();

        let items: Vec<_> = sync.items().iter().map(|e| e.item.clone()).collect();
        assert_eq!(items, vec![Item::new("Apple", 15), Item::new("Banana", 20)]);

        let apple_id = sync.items()[0].id.clone();
        assert_eq!(remote_item(&sync, &apple_id).await, Item::new("Apple", 15));
    }

    #[tokio::test]
    async fn test_update_quantity_touches_only_target() {
        let mut sync = seeded(&[("Apple", 1), ("Banana", 2), ("Cherry", 3)]).await;
        let before = sync.items().to_vec();

        sync.update_quantity(1, 99).await.unwrap();

        assert_eq!(sync.items()[0], before[0]);
        assert_eq!(sync.items()[2], before[2]);
        assert_eq!(sync.items()[1].id, before[1].id);
        assert_eq!(sync.items()[1].name(), "Banana");
        assert_eq!(sync.items()[1].quantity(), 99);
    }

    #[tokio::test]
    async fn test_update_quantity_allows_negative_by_default() {
        let mut sync = seeded(&[("Apple", 0)]).await;

        sync.adjust_quantity(0, -1).await.unwrap();

        assert_eq!(sync.items()[0].quantity(), -1);
    }

    #[tokio::test]
    async fn test_clamp_at_zero_policy() {
        let store = MemoryDocumentStore::new();
        let mut sync =
            ItemSynchronizer::new(store).with_quantity_policy(QuantityPolicy::ClampAtZero);

        let id = sync.add_item(Item::new("Apple", -4)).await.unwrap().id.clone();
        assert_eq!(remote_item(&sync, &id).await.quantity, 0);

        sync.update_quantity(0, 3).await.unwrap();
        sync.adjust_quantity(0, -10).await.unwrap();

        assert_eq!(sync.items()[0].quantity(), 0);
        assert_eq!(remote_item(&sync, &id).await.quantity, 0);
    }

    #[tokio::test]
    async fn test_adjust_quantity_increments() {
        let mut sync = seeded(&[("Apple", 10)]).await;

        sync.adjust_quantity(0, 1).await.unwrap();
        sync.adjust_quantity(0, 1).await.unwrap();

        assert_eq!(sync.items()[0].quantity(), 12);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_list_unchanged() {
        let mut sync = seeded(&[("Apple", 10)]).await;
        sync.store().fail_on(StoreOp::UpdateById).await;

        let err = sync.update_quantity(0, 15).await.unwrap_err();

        assert!(matches!(err, SyncError::Update(_)));
        assert_eq!(sync.items()[0].quantity(), 10);
    }

    #[tokio::test]
    async fn test_delete_item_removes_remote_and_local() {
        let mut sync = seeded(&[("Apple", 10), ("Banana", 20)]).await;

        let removed = sync.delete_item(0).await.unwrap();

        assert_eq!(removed.name(), "Apple");
        assert_eq!(names(&sync), vec!["Banana"]);
        assert!(sync.store().get(ITEMS_COLLECTION, &removed.id).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_record_is_not_found() {
        let mut sync = seeded(&[("Apple", 10)]).await;
        let id = sync.items()[0].id.clone();
        sync.store().delete_by_id(ITEMS_COLLECTION, &id).await.unwrap();

        let err = sync.delete_item(0).await.unwrap_err();

        assert!(matches!(err, SyncError::NotFound { ref name } if name == "Apple"));
        assert_eq!(sync.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_list_unchanged() {
        let mut sync = seeded(&[("Apple", 10)]).await;
        sync.store().fail_on(StoreOp::DeleteById).await;

        let err = sync.delete_item(0).await.unwrap_err();

        assert!(matches!(err, SyncError::Delete(_)));
        assert_eq!(sync.len(), 1);
    }

    #[tokio::test]
    async fn test_index_out_of_range() {
        let mut sync = seeded(&[("Apple", 10)]).await;

        assert!(matches!(
            sync.delete_item(1).await,
            Err(SyncError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            sync.update_quantity(5, 1).await,
            Err(SyncError::IndexOutOfRange { index: 5, len: 1 })
        ));
        assert!(matches!(
            sync.begin_edit(1),
            Err(SyncError::IndexOutOfRange { .. })
        ));
        assert_eq!(sync.store().count(ITEMS_COLLECTION).await, 1);
    }

    #[tokio::test]
    async fn test_name_lookup_zero_matches_is_not_found() {
        let mut sync = seeded(&[("Apple", 10)]).await.with_lookup(Lookup::Name);
        let id = sync.items()[0].id.clone();
        sync.store().delete_by_id(ITEMS_COLLECTION, &id).await.unwrap();

        let err = sync.delete_item(0).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));

        let err = sync.update_quantity(0, 3).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));

        assert_eq!(sync.len(), 1);
        assert_eq!(sync.items()[0].quantity(), 10);
    }

    #[tokio::test]
    async fn test_name_lookup_uses_first_match() {
        let mut sync = seeded(&[("Apple", 1), ("Apple", 2)]).await.with_lookup(Lookup::Name);
        let first_id = sync.items()[0].id.clone();
        let second_id = sync.items()[1].id.clone();

        // Deleting index 1 removes the *oldest* Apple remotely
        let removed = sync.delete_item(1).await.unwrap();

        assert_eq!(removed.id, second_id);
        assert!(sync.store().get(ITEMS_COLLECTION, &first_id).await.is_none());
        assert!(sync.store().get(ITEMS_COLLECTION, &second_id).await.is_some());
    }

    #[tokio::test]
    async fn test_name_lookup_failure_is_lookup_error() {
        let mut sync = seeded(&[("Apple", 1)]).await.with_lookup(Lookup::Name);
        sync.store().fail_on(StoreOp::FindByField).await;

        let err = sync.update_quantity(0, 2).await.unwrap_err();

        assert!(matches!(err, SyncError::Lookup { ref name, .. } if name == "Apple"));
    }

    #[tokio::test]
    async fn test_id_lookup_ignores_duplicate_names() {
        let mut sync = seeded(&[("Apple", 1), ("Apple", 2)]).await;
        let first_id = sync.items()[0].id.clone();

        sync.update_quantity(1, 7).await.unwrap();

        assert_eq!(remote_item(&sync, &first_id).await.quantity, 1);
        assert_eq!(sync.items()[1].quantity(), 7);
    }

    #[tokio::test]
    async fn test_begin_edit_is_local_copy() {
        let sync = seeded(&[("Apple", 10)]).await;

        let mut draft = sync.begin_edit(0).unwrap();
        draft.item.name = "Green Apple".to_string();

        assert_eq!(sync.items()[0].name(), "Apple");
        assert_eq!(draft.id, sync.items()[0].id);
    }

    #[tokio::test]
    async fn test_commit_edit_updates_in_place() {
        let mut sync = seeded(&[("Apple", 10), ("Banana", 20)]).await;

        let mut draft = sync.begin_edit(0).unwrap();
        draft.item.name = "Green Apple".to_string();
        draft.item.quantity = 4;
        let id = draft.id.clone();

        sync.commit_edit(draft).await.unwrap();

        assert_eq!(sync.store().count(ITEMS_COLLECTION).await, 2);
        assert_eq!(names(&sync), vec!["Green Apple", "Banana"]);
        assert_eq!(remote_item(&sync, &id).await, Item::new("Green Apple", 4));
    }

    #[tokio::test]
    async fn test_commit_edit_unknown_draft() {
        let mut sync = seeded(&[("Apple", 10)]).await;
        let mut draft = sync.begin_edit(0).unwrap();
        sync.delete_item(0).await.unwrap();
        draft.item.quantity = 1;

        let err = sync.commit_edit(draft).await.unwrap_err();

        assert!(matches!(err, SyncError::NotFound { .. }));
        assert_eq!(sync.store().count(ITEMS_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn test_commit_edit_with_name_lookup_uses_original_name() {
        let mut sync = seeded(&[("Apple", 10)]).await.with_lookup(Lookup::Name);

        let mut draft = sync.begin_edit(0).unwrap();
        draft.item.name = "Pear".to_string();
        let id = draft.id.clone();
        sync.commit_edit(draft).await.unwrap();

        assert_eq!(remote_item(&sync, &id).await, Item::new("Pear", 10));
        assert_eq!(sync.store().count(ITEMS_COLLECTION).await, 1);
    }

    #[tokio::test]
    async fn test_filter_case_insensitive_substring() {
        let sync = seeded(&[("Apple", 1), ("Banana", 2), ("Cherry", 3)]).await;

        let found: Vec<_> = sync.filter("an").map(|e| e.item.clone()).collect();
        assert_eq!(found, vec![Item::new("Banana", 2)]);

        let found: Vec<_> = sync.filter("AP").map(|e| e.name()).collect();
        assert_eq!(found, vec!["Apple"]);
    }

    #[tokio::test]
    async fn test_filter_empty_query_returns_all_in_order() {
        let sync = seeded(&[("Cherry", 3), ("Apple", 1), ("Banana", 2)]).await;

        let found: Vec<_> = sync.filter("").map(|e| e.name()).collect();
        assert_eq!(found, vec!["Cherry", "Apple", "Banana"]);
    }

    #[tokio::test]
    async fn test_filter_is_restartable() {
        let sync = seeded(&[("Apple", 1), ("Pineapple", 2), ("Kiwi", 3)]).await;

        let first: Vec<_> = sync.filter("apple").collect();
        let second: Vec<_> = sync.filter("apple").collect();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(sync.filter("grape").count(), 0);
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_each_remote_call_is_logged_at_debug() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut sync = ItemSynchronizer::new(MemoryDocumentStore::new()).with_lookup(Lookup::Name);
        sync.load_all().await.unwrap();
        sync.add_item(Item::new("Oats", 1)).await.unwrap();
        sync.update_quantity(0, 2).await.unwrap();
        let draft = sync.begin_edit(0).unwrap();
        sync.commit_edit(draft).await.unwrap();
        sync.delete_item(0).await.unwrap();

        let output = logs.contents();
        for expected in [
            "Loading all documents from 'items'",
            "Inserting 'Oats' into 'items'",
            "Looking up 'Oats' by name in 'items'",
            "Updating quantity of",
            "Replacing fields of",
            "Deleting",
        ] {
            assert!(output.contains(expected), "missing '{}' in:\n{}", expected, output);
        }
        assert!(output.contains("DEBUG"));
    }
}
