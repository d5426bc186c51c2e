mod catalog;
mod configuration;
mod error;
mod routes;
mod state;

use portal::facade::ChatFacade;
use portal::providers::factory;
use portal::tools::demo_registry;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = configuration::Settings::new()?;
    let addr = settings.server.socket_addr()?;

    let provider = factory::get_provider(settings.provider.into_config())?;
    let facade = ChatFacade::new(Arc::from(provider), settings.generation.into_defaults());
    let tools = Arc::new(demo_registry()?);
    info!(
        model = %facade.defaults().default_model,
        tools = tools.len(),
        "portal facade ready"
    );

    let state = state::AppState::new(facade, tools);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
