mod config_cmd;
mod item;

pub use config_cmd::ConfigCommand;
pub use item::ItemCommand;

use clap::ValueEnum;

use pantry::config::{Backend, Config};
use pantry::db::SqliteDocumentStore;
use pantry::store::{DocumentStore, HttpDocumentStore};
use pantry::sync::ItemSynchronizer;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Item synchronizer over whichever backend the config selects
pub type Items = ItemSynchronizer<Box<dyn DocumentStore>>;

/// Opens the configured store and loads the current item list
pub async fn open_items(config: &Config) -> Result<Items, Box<dyn std::error::Error>> {
    let store: Box<dyn DocumentStore> = match config.backend.value {
        Backend::Sqlite => {
            Box::new(SqliteDocumentStore::open(&config.database_path.value).await?)
        }
        Backend::Http => {
            let url = config
                .server
                .configured_url()
                .ok_or("Backend 'http' needs server.url in config or PANTRY_SERVER_URL")?;
            Box::new(HttpDocumentStore::new(url, config.server.api_key.clone()))
        }
    };

    let mut items = ItemSynchronizer::new(store)
        .with_lookup(config.lookup.value)
        .with_quantity_policy(config.quantity_policy.value);
    items.load_all().await?;
    Ok(items)
}
