use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use veda_llms::{OpenAiProvider, Provider};
use veda_runtime::RuntimeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    veda_observability::init_from_env()
        .map_err(|e| anyhow::anyhow!("telemetry init failed: {}", e))?;

    let config = RuntimeConfig::from_env();
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let provider: Arc<dyn Provider> =
        Arc::new(OpenAiProvider::from_env().context("configure LLM provider")?);

    let app = veda_server::build_app(provider, config.clone())?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, debug = config.debug, "veda server listening");

    axum::serve(listener, app).await.context("server exited")?;

    veda_observability::shutdown();
    Ok(())
}
