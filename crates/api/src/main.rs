use anyhow::Context;

use userhub_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber so RUST_LOG from the file applies.
    let dotenv = dotenvy::dotenv();

    userhub_observability::init();

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => tracing::warn!("no .env file, using process environment"),
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }

    let config = AppConfig::from_env().context("invalid configuration")?;
    let bind_addr = config.bind_addr;

    let app = userhub_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
