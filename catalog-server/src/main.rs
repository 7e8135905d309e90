use std::sync::Arc;

use anyhow::Result;
use catalog_server::catalog::Catalog;
use catalog_server::config::ServerConfig;
use catalog_server::{AppState, build_router};
use dotenvy::dotenv;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let cors = config.cors_layer()?;

    let catalog = match &config.catalog_path {
        Some(path) => {
            let catalog = Catalog::load(path).await?;
            info!("loaded {} images from {}", catalog.len(), path.display());
            catalog
        }
        None => {
            warn!("CATALOG_PATH not set, serving an empty catalog");
            Catalog::default()
        }
    };

    let state = Arc::new(AppState::new(catalog, config.rate_limit_per_minute));
    let app = build_router(state, cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        "catalog-server listening on http://{} (rate_limit={}, allowed_origin={})",
        config.bind_addr,
        config
            .rate_limit_per_minute
            .map(|rate| format!("{rate}/min"))
            .unwrap_or_else(|| "disabled".to_string()),
        if config.allowed_origins.is_empty() {
            "any".to_string()
        } else {
            config.allowed_origins.join(",")
        }
    );
    axum::serve(listener, app).await?;
    Ok(())
}
