use std::sync::Arc;

use anyhow::Context;

use market_api::config::ApiConfig;
use market_infra::{CatalogService, FileSnapshotStore, NoopSnapshotStore, SnapshotStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    market_observability::init();

    let config = ApiConfig::from_env()?;

    let snapshots: Arc<dyn SnapshotStore> = match &config.snapshot_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "snapshot persistence enabled");
            Arc::new(FileSnapshotStore::new(path))
        }
        None => {
            tracing::warn!("MARKET_SNAPSHOT_PATH not set; catalog is memory-only");
            Arc::new(NoopSnapshotStore)
        }
    };

    let service = CatalogService::open(snapshots, config.sales_window)
        .context("failed to open catalog")?;
    let app = market_api::app::build_app(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
