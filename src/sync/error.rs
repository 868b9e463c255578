//! Synchronizer error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by [`super::ItemSynchronizer`] operations.
///
/// The local item list is never modified when one of these is returned.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to load items: {0}")]
    Fetch(#[source] StoreError),

    #[error("Failed to create item: {0}")]
    Create(#[source] StoreError),

    #[error("Failed to update item: {0}")]
    Update(#[source] StoreError),

    #[error("Failed to delete item: {0}")]
    Delete(#[source] StoreError),

    #[error("Failed to look up item '{name}': {source}")]
    Lookup {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Item '{name}' not found in store")]
    NotFound { name: String },

    #[error("Index {index} out of range (list has {len} item(s))")]
    IndexOutOfRange { index: usize, len: usize },
}
