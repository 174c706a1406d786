use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures::future::join_all;
use node_monitor::{
    actors::{messages::AgentEvent, registry::AgentRegistry},
    api::{ApiConfig, ApiState, spawn_api_server},
    cluster::HttpClusterManagement,
    config::{Config, read_config_file},
    counters::ProcessMetadata,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn log_filter() -> filter::Targets {
    filter::Targets::new().with_targets(vec![
        ("node_monitor", LevelFilter::DEBUG),
        (env!("CARGO_CRATE_NAME"), LevelFilter::TRACE),
        ("tower_http", LevelFilter::DEBUG),
    ])
}

fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(log_filter())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let cluster = HttpClusterManagement::new(
        Duration::from_millis(config.request_timeout_ms),
        config.token.clone(),
    )?;
    let metadata = ProcessMetadata::new(Some(env!("CARGO_PKG_VERSION").to_string()));

    let registry = AgentRegistry::new(
        config.registry_config(),
        Arc::new(cluster),
        Arc::new(metadata),
    );

    tokio::spawn(log_events(registry.subscribe()));

    init_nodes(&registry, &config).await;

    let display_names: HashMap<_, _> = config
        .nodes
        .iter()
        .filter_map(|node| Some((node.address.clone(), node.display.clone()?)))
        .collect();

    let api_config = config.api.clone().map(ApiConfig::from).unwrap_or_default();
    let addr = spawn_api_server(api_config, ApiState::new(registry.clone(), display_names)).await?;
    info!("dashboard API available at http://{addr}/api/v1");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    registry.shutdown().await;

    Ok(())
}

#[instrument(skip_all)]
async fn init_nodes(registry: &AgentRegistry, config: &Config) {
    let settings = config.agent_settings();

    let results = join_all(config.nodes.iter().map(|node| {
        let settings = settings.clone();
        async move {
            debug!("initialising agent for {}", node.address);
            (node, registry.init(&node.address, Some(settings)).await)
        }
    }))
    .await;

    for (node, result) in results {
        if let Err(e) = result {
            error!("failed to initialise agent for {}: {e}", node.address);
        }
    }
}

async fn log_events(mut events: broadcast::Receiver<AgentEvent>) {
    loop {
        match events.recv().await {
            Ok(AgentEvent::Deactivated { node, instance, .. }) => {
                warn!("agent {instance} for {node} deactivated, node considered dead");
            }
            Ok(event) => trace!(node = %event.node(), "agent event: {event:?}"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("event log lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
