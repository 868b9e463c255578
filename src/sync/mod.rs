//! Item synchronization between the local list and a document store.
//!
//! # Usage
//!
//! ```
//! use pantry::models::Item;
//! use pantry::store::MemoryDocumentStore;
//! use pantry::sync::{ItemSynchronizer, SyncError};
//!
//! async fn restock() -> Result<(), SyncError> {
//!     let mut items = ItemSynchronizer::new(MemoryDocumentStore::new());
//!     items.load_all().await?;
//!     items.add_item(Item::new("Apple", 10)).await?;
//!     items.adjust_quantity(0, 1).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod synchronizer;

pub use error::SyncError;
pub use synchronizer::ItemSynchronizer;
