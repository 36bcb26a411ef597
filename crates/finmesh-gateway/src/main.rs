//! finmesh orchestrator gateway service.

use anyhow::Context;
use clap::Parser;
use finmesh_agents::clients::BankingClient;
use finmesh_config::{
    BankingConfig, ControllerConfig, LlmConfig, LoggingConfig, PollConfig, SecurityConfig,
    ServerConfig,
};
use finmesh_gateway::{build_router, ContextEnricher, ControllerClient, IntentParser, Pipeline};
use finmesh_llm::LlmClient;
use finmesh_memory::{ConversationBuffer, MemoryStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 8081;

/// finmesh gateway CLI
#[derive(Parser)]
#[command(name = "finmesh-gateway")]
#[command(about = "Intent and context orchestrator for the finmesh platform", long_about = None)]
#[command(version)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();

    let logging = LoggingConfig::from_env();
    init_tracing(&logging);

    let server = ServerConfig::from_env(DEFAULT_PORT)?;
    let security = SecurityConfig::from_env()?;
    let controller = ControllerConfig::from_env()?;
    let poll = PollConfig::from_env()?;
    let llm_config = LlmConfig::from_env()?;

    let llm = if llm_config.enabled {
        Some(Arc::new(LlmClient::new(llm_config)?))
    } else {
        None
    };
    let banking = Arc::new(BankingClient::new(BankingConfig::from_env()?));
    let memory = Arc::new(MemoryStore::with_knowledge_base(llm.clone()).await);

    let pipeline = Arc::new(Pipeline {
        parser: IntentParser::new(llm.clone()),
        enricher: ContextEnricher::new(banking),
        controller: ControllerClient::new(&controller, poll),
        memory,
        conversation: Arc::new(ConversationBuffer::new()),
        llm,
    });

    let app = build_router(pipeline, &security);
    let addr = server.listen_addr();
    tracing::info!(%addr, "orchestrator gateway listening");
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
