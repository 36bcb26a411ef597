//! finmesh task/session controller service.

use anyhow::Context;
use clap::Parser;
use finmesh_config::{ControllerConfig, LoggingConfig, SecurityConfig, ServerConfig};
use finmesh_control::{build_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 8080;

/// finmesh controller CLI
#[derive(Parser)]
#[command(name = "finmesh-control")]
#[command(about = "Task/session controller for the finmesh platform", long_about = None)]
#[command(version)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();

    let logging = LoggingConfig::from_env();
    init_tracing(&logging);

    let server = ServerConfig::from_env(DEFAULT_PORT)?;
    let security = SecurityConfig::from_env()?;
    // Outbound agent calls reuse the platform shared secret and timeout.
    let controller = ControllerConfig::from_env()?;

    let state = AppState::build(
        None,
        security
            .api_key
            .clone()
            .unwrap_or_else(|| controller.api_key.clone()),
        controller.timeout(),
    )
    .await;

    let app = build_router(state, &security);
    let addr = server.listen_addr();
    tracing::info!(%addr, "task controller listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("server error")?;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());
    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
