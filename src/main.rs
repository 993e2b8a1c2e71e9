use hotel_recs_api::{
    api::{create_router, AppState},
    config::Config,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; every request will use the places fallback");
    }
    if config.google_maps_api_key.is_empty() {
        tracing::warn!("GOOGLE_MAPS_API_KEY is not set; results will be unverified");
    }

    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, env = ?config.app_env, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
