use anyhow::Context;

use backoffice_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    backoffice_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        environment = %config.environment,
        persistent = config.use_persistent_stores,
        "starting back office"
    );

    let app = backoffice_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
