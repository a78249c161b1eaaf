use anyhow::Result;
use bookline_api::{build_app, AppConfig};
use bookline_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("bookline_api");

    let config = AppConfig::from_env()?;
    let bind = config.bind.clone();
    let kb_root = config.kb_root.clone();

    let app = build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, kb_root = %kb_root.display(), "bookline api started");

    axum::serve(listener, app).await?;
    Ok(())
}
