use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quizchain_common::Config;

mod server;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("quizchain=info".parse()?))
        .init();

    info!("Quizchain solver service starting...");

    let config = Config::from_env();
    config.log_redacted();

    let state = Arc::new(server::AppState::from_config(&config));
    let app = server::app(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Quizchain API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
