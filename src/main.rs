use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bookvault::config::{AppConfig, StorageBackend};
use bookvault::db::{CatalogRepository, MemoryCatalog, PostgresCatalog};
use bookvault::storage::{AttachmentStore, FilesystemStore, InlineStore};
use bookvault::{metrics, routes, services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::build()?;

    // 2. Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.rust_log))
        .init();

    tracing::info!("Starting bookvault...");

    // 3. Initialize the catalog repository
    // "memory" runs the catalog in-process (development mode), anything
    // else is treated as a Postgres connection string.
    let repo: Arc<dyn CatalogRepository> = if config.database.url == "memory" {
        tracing::warn!("using in-memory catalog; records are lost on shutdown");
        Arc::new(MemoryCatalog::new())
    } else {
        let catalog = PostgresCatalog::connect(&config.database).await?;
        catalog.init_schema().await?;
        tracing::info!("Connected to database");
        Arc::new(catalog)
    };

    // 4. Initialize the attachment storage strategy
    let store: Arc<dyn AttachmentStore> = match config.storage.backend {
        StorageBackend::Database => Arc::new(InlineStore::new()),
        StorageBackend::Filesystem => {
            let store = FilesystemStore::new(&config.storage.upload_dir);
            store.validate().await.map_err(|e| {
                anyhow::anyhow!("attachment storage validation failed: {e}")
            })?;
            tracing::info!(dir = %config.storage.upload_dir, "filesystem attachment storage ready");
            Arc::new(store)
        }
    };

    // 5. Initialize App State
    let state = services::AppState::new(repo, store, config.upload.max_bytes);

    // 6. Setup Router (with Prometheus exposition)
    let (prometheus_layer, metrics_router) = metrics::setup_metrics();
    let app = routes::create_router(state)
        .merge(metrics_router)
        .layer(prometheus_layer);

    // 7. Start Server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.host/server.port: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
