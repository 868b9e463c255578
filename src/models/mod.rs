mod item;
mod policy;
mod record_id;

pub use item::{Draft, Entry, Item};
pub use policy::{Lookup, QuantityPolicy};
pub use record_id::RecordId;
