use std::time::Duration;

use bridge_lib::health::HealthChecker;
use bridge_lib::metrics::{create_shared_metrics, run_status_reporter};
use bridge_lib::poller::TemplatePoller;
use bridge_lib::publisher::RedisPublisher;
use bridge_lib::template_cache::TemplateCache;
use bridge_lib::template_source::NodeTemplateClient;
use dotenv::dotenv;
use kaspa_consensus_core::network::{NetworkId, NetworkType};
use kaspa_wrpc_client::client::{ConnectOptions, ConnectStrategy};
use kaspa_wrpc_client::{KaspaRpcClient, WrpcEncoding};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::api::Api;
use crate::config::{get_bridge_config, BridgeConfig};

mod api;
mod config;

const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ignore faillures as .env might not be present at runtime, and this use-case is tolerated
    dotenv()
        .inspect_err(|err| println!("[WARN] reading .env files is failed with err {err}"))
        .ok();

    let config = get_bridge_config()?;

    // logs
    let (non_blocking_appender, _guard_stdout) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_filter(config.rust_log);
    tracing_subscriber::registry()
        .with(stdout_subscriber)
        .init();

    let mining_address = config.mining_address()?;
    info!("Mining to address {}", mining_address);

    let rpc_client = create_rpc_client(&config)?;
    info!("Connecting to Kaspa node...");
    rpc_client
        .connect(Some(ConnectOptions {
            block_async_connect: true,
            connect_timeout: Some(Duration::from_millis(10_000)),
            strategy: ConnectStrategy::Fallback,
            ..Default::default()
        }))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to node: {}", e))?;

    let publisher = RedisPublisher::connect(&config.redis_url).await?;

    let node_client = NodeTemplateClient::new(rpc_client.clone());
    let cache = TemplateCache::new();
    let metrics = create_shared_metrics();

    let (shutdown_poller_tx, shutdown_poller_rx) = tokio::sync::oneshot::channel();
    let poller = TemplatePoller::builder()
        .source(node_client.clone())
        .sink(publisher.clone())
        .cache(cache.clone())
        .mining_address(mining_address)
        .extra_data(config.miner_tag().into_bytes())
        .channel(config.redis_channel.clone())
        .poll_interval(config.poll_interval())
        .shutdown_rx(shutdown_poller_rx)
        .metrics(metrics.clone())
        .build();
    let poller_handle = tokio::spawn(poller.task());

    let (shutdown_reporter_tx, shutdown_reporter_rx) = tokio::sync::oneshot::channel();
    let reporter_handle = tokio::spawn(run_status_reporter(
        shutdown_reporter_rx,
        cache,
        metrics,
        STATUS_LOG_INTERVAL,
    ));

    let (shutdown_api_tx, shutdown_api_rx) = tokio::sync::oneshot::channel();
    let api = Api::new(HealthChecker::new(
        node_client,
        publisher,
        config.probe_timeout(),
    ));
    let bind_address = config.health_bind_address.clone();
    let api_handle =
        tokio::spawn(async move { api.serve(&bind_address, shutdown_api_rx).await });

    // Handle shutdown
    tokio::signal::ctrl_c().await?;
    info!("Termination signal received. Shutting down...");

    _ = shutdown_poller_tx
        .send(())
        .inspect_err(|_err| error!("failed to shutdown template poller"));
    _ = shutdown_reporter_tx
        .send(())
        .inspect_err(|_err| error!("failed to shutdown status reporter"));
    _ = shutdown_api_tx
        .send(())
        .inspect_err(|_err| error!("failed to shutdown api server"));

    _ = poller_handle
        .await?
        .inspect(|_| info!("template poller has stopped"));
    _ = reporter_handle
        .await?
        .inspect(|_| info!("status reporter has stopped"));
    _ = api_handle
        .await?
        .inspect(|_| info!("api server has stopped"));

    _ = rpc_client
        .disconnect()
        .await
        .inspect_err(|err| error!("Error disconnecting from node: {err}"));

    info!("All tasks shut down.");

    Ok(())
}

fn create_rpc_client(config: &BridgeConfig) -> anyhow::Result<KaspaRpcClient> {
    let network_type = config.network_type;
    let encoding = WrpcEncoding::Borsh;

    let url = config.kaspa_node_wborsh_url.clone();
    let resolver = if url.is_some() {
        None
    } else {
        Some(kaspa_wrpc_client::Resolver::default())
    };

    let selected_network = if network_type == NetworkType::Mainnet {
        Some(NetworkId::new(NetworkType::Mainnet))
    } else {
        Some(NetworkId::with_suffix(network_type, 10))
    };

    let subscription_context = None;

    info!(
        "Creating RPC client for network: {:?}, with url {:?}",
        network_type, url
    );

    let client = KaspaRpcClient::new(
        encoding,
        url.as_deref(),
        resolver,
        selected_network,
        subscription_context,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create RPC client: {}", e))?;

    Ok(client)
}
