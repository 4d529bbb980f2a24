// ==============================================================================
// main.rs - Variant API Gateway Entry Point
// ==============================================================================
// Description: Axum web server for the variant annotation API
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use variant_api_gateway::{build_router, AppState, GatewayConfig};

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "variant_annotator=info,variant_api_gateway=info,tower_http=info".into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(false).compact()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();
    init_tracing();

    let config = GatewayConfig::parse();
    info!("Starting Variant API Gateway v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::new(&config)
        .await
        .context("Failed to initialize application state")?;

    let app = build_router(state, &config.cors_origins);

    info!("API Gateway listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
