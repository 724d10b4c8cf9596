//! navgraph HTTP/JSON gateway binary.

use clap::Parser;
use navgraph_core::QueryEngine;
use navgraph_gateway::{create_router, AppState, Args, GatewayConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "navgraph_gateway=info,navgraph_core=info,tower_http=info".into()),
        )
        .init();

    // Parse command line args
    let args = Args::parse();
    let config = GatewayConfig::from(&args);
    let engine_config = config.load_engine_config()?;

    info!(
        listen = %config.listen_addr,
        metadata = %engine_config.metadata.container,
        batch_size = engine_config.batch_size,
        "Starting navgraph gateway"
    );

    let engine = QueryEngine::from_config(&engine_config)?;
    let state = AppState::new(engine, engine_config, config.clone());

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Gateway listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
