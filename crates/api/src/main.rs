use anyhow::Context;

use vertobank_kernel::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vertobank_observability::init("vertobank-api");

    let config = AppConfig::load().context("failed to load configuration")?;
    let app = vertobank_api::app::build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;

    tracing::info!(modules = app.modules.len(), "listening on {}", listener.local_addr()?);

    axum::serve(listener, app.router).await?;
    Ok(())
}
