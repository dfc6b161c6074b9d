use server::{AppState, http};
use tracing_subscriber::{EnvFilter, prelude::*};
use utils_core::assets::asset_dir;

const PORT_ENV: &str = "TUTORDESK_PORT";
const HOST_ENV: &str = "TUTORDESK_HOST";
const DEFAULT_PORT: u16 = 3400;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level},utils_core={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string)?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    // Create asset directory if it doesn't exist
    if !asset_dir().exists() {
        std::fs::create_dir_all(asset_dir())?;
    }

    let state = AppState::new().await?;
    let app = http::router(state);

    let host = std::env::var(HOST_ENV).unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = match std::env::var(PORT_ENV) {
        Ok(value) => value.parse::<u16>()?,
        Err(_) => DEFAULT_PORT,
    };
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!("Listening on http://{}:{}", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        return;
    }
    tracing::info!("Shutting down");
}
