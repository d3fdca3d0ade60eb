use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use vetka::core::config;
use vetka::storage::create_pool;
use vetka::web::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The subscriber's default log bridge carries log:: macros over.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let pool = Arc::new(
        create_pool(&config::DATABASE_PATH)
            .with_context(|| format!("failed to open database at {}", *config::DATABASE_PATH))?,
    );
    let state = AppState::new(pool);
    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", *config::WEB_PORT);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("server terminated")?;
    Ok(())
}
