//! finmesh agent host.
//!
//! Hosts one agent kind per process, selected by `AGENT_TYPE`, and
//! self-registers with the task controller when enabled.

use anyhow::Context;
use clap::Parser;
use finmesh_agents::clients::{BankingClient, MlClient};
use finmesh_agents::{build_agent, build_router, default_port, register_with_controller, AgentDeps};
use finmesh_config::{
    AgentIdentityConfig, BankingConfig, ControllerConfig, LoggingConfig, MlConfig, SecurityConfig,
    ServerConfig,
};
use finmesh_types::AgentKind;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// finmesh agent host CLI
#[derive(Parser)]
#[command(name = "finmesh-agent")]
#[command(about = "Specialist processing agent for the finmesh platform", long_about = None)]
#[command(version)]
struct Cli {
    /// Agent kind hosted by this process
    #[arg(long, env = "AGENT_TYPE", default_value = "BANKING")]
    agent_type: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_env();
    init_tracing(&logging);

    let kind: AgentKind = cli
        .agent_type
        .parse()
        .map_err(|err: String| anyhow::anyhow!(err))?;

    let server = ServerConfig::from_env(default_port(kind))?;
    let security = SecurityConfig::from_env()?;
    let identity = AgentIdentityConfig::from_env()?;
    let controller = ControllerConfig::from_env()?;

    let deps = AgentDeps {
        ml: Arc::new(MlClient::new(MlConfig::from_env()?)),
        banking: Arc::new(BankingClient::new(BankingConfig::from_env()?)),
    };
    let agent = build_agent(kind, deps).context("unsupported agent kind")?;

    if identity.auto_register {
        let controller = controller.clone();
        let identity = identity.clone();
        tokio::spawn(async move {
            register_with_controller(&controller, &identity, kind).await;
        });
    }

    let app = build_router(agent, &security);
    let addr = server.listen_addr();
    tracing::info!(%addr, agent_type = %kind, "agent listening");
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
