use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{fmt, EnvFilter};

use artgen::config::AppConfig;
use artgen::enhancer::PromptEnhancer;
use artgen::pipeline::GenerationPipeline;
use artgen::provider::{chat_provider, image_provider};
use artgen::routes::{router, AppState};
use artgen::store::ImageStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        image_provider = %config.image_provider,
        chat_provider = %config.chat_provider,
        env = %config.app_env,
        storage_dir = %config.storage_dir.display(),
        "Loaded configuration"
    );

    tokio::fs::create_dir_all(&config.storage_dir).await?;
    let store = Arc::new(ImageStore::new(config.storage_dir.clone())?);
    let enhancer = PromptEnhancer::new(chat_provider(&config));
    let pipeline = Arc::new(GenerationPipeline::new(enhancer, image_provider(&config), store.clone()));

    let app = router(AppState { pipeline, store }).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
