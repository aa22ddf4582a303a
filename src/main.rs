// src/main.rs
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use trailer_loader::api;
use trailer_loader::config::AppConfig;

#[tokio::main]
async fn main() {
    // Loaded before the subscriber so RUST_LOG may come from .env.
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            tracing::warn!("could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    tracing::info!("trailer loading service starting");
    if let Err(err) = api::start_api_server(app_config.api, app_config.loader).await {
        tracing::error!("API server terminated with an error: {}", err);
        std::process::exit(1);
    }
}
