use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_digest::config::Config;
use blog_digest::fetcher::HttpFeedClient;
use blog_digest::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_digest=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("BLOG_DIGEST_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load_or_builtin(&config_path)?;
    let catalog = config.catalog();
    info!(
        "Loaded {} feeds in {} categories",
        catalog.source_count(),
        catalog.categories().len()
    );

    let client = HttpFeedClient::new(Duration::from_secs(config.request_timeout_secs))?;

    // Create app state
    let state = Arc::new(AppState::new(catalog, client, config.default_days));
    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Server starting on http://{}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
