use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::RecordId;

/// A pantry item as stored in the `items` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub quantity: i64,
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }

    /// Document fields for this item: `{ "name": ..., "quantity": ... }`.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::from(self.name.as_str()));
        fields.insert("quantity".to_string(), Value::from(self.quantity));
        fields
    }

    /// Decodes document fields back into an item. Extra fields are ignored.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (x{})", self.name, self.quantity)
    }
}

/// An item in the local list, paired with the id of its remote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: RecordId,
    #[serde(flatten)]
    pub item: Item,
}

impl Entry {
    pub fn new(id: RecordId, item: Item) -> Self {
        Self { id, item }
    }

    pub fn name(&self) -> &str {
        &self.item.name
    }

    pub fn quantity(&self) -> i64 {
        self.item.quantity
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.item)
    }
}

/// Editable copy of an entry, returned by `ItemSynchronizer::begin_edit`.
///
/// Changes to `item` only reach the store through `commit_edit`, which
/// updates the record named by `id` in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub id: RecordId,
    pub item: Item,
}

impl From<&Entry> for Draft {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id.clone(),
            item: entry.item.clone(),
        }
    }
}
