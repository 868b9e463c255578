//! Pantry: an inventory tracker that mirrors a local item list onto a
//! document store.

pub mod config;
pub mod db;
pub mod models;
pub mod server;
pub mod store;
pub mod sync;
