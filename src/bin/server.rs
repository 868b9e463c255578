//! Pantry document server
//!
//! Serves a SQLite-backed document store over HTTP so several `pantry`
//! clients can share one item collection.
//!
//! # Configuration
//!
//! Environment variables:
//! - `PANTRY_PORT`: Port to listen on (default: 8080)
//! - `PANTRY_DATA_DIR`: Directory holding `pantry.db` (default: ~/.local/share/pantry-server)
//! - `PANTRY_API_KEY`: Bearer key required by document routes (default: none, open access)

use std::net::SocketAddr;
use std::path::PathBuf;

use pantry::db::SqliteDocumentStore;
use pantry::server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// Directory holding the database
    data_dir: PathBuf,
    /// API key clients must present
    api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("PANTRY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("PANTRY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("pantry-server")
            });

        let api_key = std::env::var("PANTRY_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        Self {
            port,
            data_dir,
            api_key,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantry=info,pantry_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Config::from_env()).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.data_dir.join("pantry.db");
    tracing::info!("Database: {}", db_path.display());

    let store = SqliteDocumentStore::open(&db_path).await?;

    if config.api_key.is_none() {
        tracing::warn!("PANTRY_API_KEY not set - document routes are unauthenticated");
    }

    let app = server::router(store, config.api_key);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
