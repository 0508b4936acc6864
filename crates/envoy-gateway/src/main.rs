use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

mod app;
mod error;
mod http;
#[cfg(test)]
mod test_support;

/// Envoy — an HTTP/SSE gateway around a bounded conversational agent loop.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to envoy.toml. Defaults to ~/.envoy/envoy.toml.
    #[arg(long)]
    config: Option<String>,

    /// Override the bind address from config.
    #[arg(long)]
    bind: Option<String>,

    /// Override the listen port from config.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "envoy_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = envoy_core::EnvoyConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        envoy_core::EnvoyConfig::default()
    });
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let store = Arc::new(envoy_store::Store::open(&config.database.path)?);
    let bus = Arc::new(envoy_bus::EventBus::new());

    let integrations = envoy_catalog::IntegrationManager::new(config.tools.env_file.clone());
    integrations.load_into_process_env()?;

    let provider: Box<dyn envoy_agent::LlmProvider> = Box::new(envoy_agent::anthropic::AnthropicProvider::new(
        config.llm.api_key.clone(),
        Some(config.llm.base_url.clone()),
    ));
    let agent = Arc::new(envoy_agent::AgentRuntime::new(
        provider,
        config.llm.model.clone(),
        config.tools.env_file.clone(),
    ));

    let scheduler = envoy_scheduler::SchedulerEngine::new(
        store.clone(),
        bus.clone(),
        agent.clone(),
        config.tools.fs_root.clone(),
    );
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let state = Arc::new(app::AppState::new(config, store, bus, agent));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("envoy gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = scheduler_task.await;

    Ok(())
}
