use std::env;

use anyhow::Result;
use gie_api::{build_app, parse_allowed_origins};
use gie_observability::init_tracing;
use gie_pipeline::EngineConfig;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("gie_api", "info");

    let bind = env::var("GIE_BIND").unwrap_or_else(|_| "127.0.0.1:5000".to_string());
    let config = EngineConfig::from_env();
    let allowed_origins = parse_allowed_origins();

    let app = build_app(&config, allowed_origins.clone())?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(
        bind = %bind,
        primary_classifier = config.openai.is_some(),
        allowed_origins = ?allowed_origins,
        "gie api started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
