//! Chainsim
//!
//! Service-chain latency simulator. A cluster of relay nodes register
//! themselves in etcd and forward synthetic requests along chains; a
//! loader samples random chains and measures how round-trip time grows
//! with chain depth.

use anyhow::{Context, Result};
use chainsim::config::{LoaderConfig, NodeConfig, RegistryConfig};
use chainsim::loader::run_trials;
use chainsim::net;
use chainsim::registry::{member_key, member_url, run_watch_loop, RegistryClient};
use chainsim::relay::{self, RelayState};
use chainsim::sampler::LengthPolicy;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::IntoFuture;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "chainsim")]
#[command(about = "Service-chain latency simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve as a relay node
    Serve {
        /// Interface to read the advertised IP from
        #[arg(short = 'i', long, default_value = "eth0")]
        interface: String,

        /// Advertise the interface's IPv6 address instead of IPv4
        #[arg(long)]
        ipv6: bool,

        /// IP to bind the listener on
        #[arg(short = 'a', long, default_value = "0.0.0.0")]
        bind: String,

        /// Listen port
        #[arg(short = 'p', long, default_value_t = 3365)]
        port: u16,

        /// Per-hop connect timeout in seconds
        #[arg(long, default_value_t = 5)]
        timeout: u64,

        /// Disable HTTP connection reuse between hops
        #[arg(long)]
        disable_keep_alive: bool,

        /// Largest payload this node will synthesize (bytes)
        #[arg(long, default_value_t = 16 * 1024 * 1024)]
        max_payload_size: u64,

        /// etcd endpoints (comma-separated)
        #[arg(long, env = "ETCD_ENDPOINTS", default_value = "http://127.0.0.1:2379")]
        etcd_endpoints: String,

        /// Membership lease TTL in seconds
        #[arg(long, default_value_t = 5)]
        lease_ttl: i64,
    },

    /// Run the experiment loader
    Load {
        /// Number of trials
        #[arg(short = 'c', long, default_value_t = 1)]
        count: usize,

        /// Chain length per trial: 'all', 'random', or a fixed length
        #[arg(short = 'k', long, default_value = "all")]
        chain_length: LengthPolicy,

        /// Payload size requested from the terminus (bytes)
        #[arg(long, default_value_t = 64)]
        payload_size: u64,

        /// Include the sampled chain in each output record
        #[arg(long)]
        show_chain: bool,

        /// Root-call connect timeout in seconds
        #[arg(long, default_value_t = 5)]
        timeout: u64,

        /// etcd endpoints (comma-separated)
        #[arg(long, env = "ETCD_ENDPOINTS", default_value = "http://127.0.0.1:2379")]
        etcd_endpoints: String,
    },

    /// Wipe all registry entries
    Clear {
        /// etcd endpoints (comma-separated)
        #[arg(long, env = "ETCD_ENDPOINTS", default_value = "http://127.0.0.1:2379")]
        etcd_endpoints: String,
    },
}

fn registry_config(endpoints: &str) -> RegistryConfig {
    RegistryConfig {
        endpoints: endpoints.split(',').map(String::from).collect(),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            interface,
            ipv6,
            bind,
            port,
            timeout,
            disable_keep_alive,
            max_payload_size,
            etcd_endpoints,
            lease_ttl,
        } => {
            serve(
                &interface,
                ipv6,
                &bind,
                port,
                NodeConfig {
                    connect_timeout: Duration::from_secs(timeout),
                    disable_keep_alive,
                    max_payload_size,
                },
                RegistryConfig {
                    lease_ttl,
                    ..registry_config(&etcd_endpoints)
                },
            )
            .await
        }
        Commands::Load {
            count,
            chain_length,
            payload_size,
            show_chain,
            timeout,
            etcd_endpoints,
        } => {
            load(
                chain_length,
                LoaderConfig {
                    count,
                    payload_size,
                    show_chain,
                },
                Duration::from_secs(timeout),
                registry_config(&etcd_endpoints),
            )
            .await
        }
        Commands::Clear { etcd_endpoints } => clear(registry_config(&etcd_endpoints)).await,
    }
}

/// Run a relay node: discover the advertised IP, register it in etcd,
/// start the watch-driven renewal loop, and serve the relay protocol.
async fn serve(
    interface: &str,
    ipv6: bool,
    bind: &str,
    port: u16,
    node_config: NodeConfig,
    registry_cfg: RegistryConfig,
) -> Result<()> {
    let ip = net::interface_ip(interface, ipv6)?;
    info!(ip = %ip, interface = %interface, "Discovered advertised IP");

    let state = RelayState::new(node_config).context("Failed to build HTTP client")?;
    let app = relay::create_router(state);

    let bind_addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Listening");

    let mut registry = RegistryClient::connect(registry_cfg).await?;

    let key = member_key(&ip, port);
    let url = member_url(&ip, port);
    info!(key = %key, url = %url, "Registering in etcd");
    let lease_id = registry.register(&key, &url).await?;

    let current_lease = Arc::new(AtomicI64::new(lease_id));
    let watch_task = tokio::spawn(run_watch_loop(
        registry.clone(),
        key,
        url,
        current_lease.clone(),
    ));

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            result.context("Relay server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down, revoking lease");
            // Stop the watcher first so it cannot re-register the key
            // we are about to let go of.
            watch_task.abort();
            registry.revoke(current_lease.load(Ordering::Acquire)).await;
        }
    }

    Ok(())
}

/// Run the experiment driver against a membership snapshot.
async fn load(
    policy: LengthPolicy,
    config: LoaderConfig,
    connect_timeout: Duration,
    registry_cfg: RegistryConfig,
) -> Result<()> {
    let mut registry = RegistryClient::connect(registry_cfg).await?;
    let members = registry.list_members().await?;
    info!(member_count = members.len(), policy = %policy, "Starting trials");

    let http = relay::client::build_http_client(&NodeConfig {
        connect_timeout,
        ..NodeConfig::default()
    })
    .context("Failed to build HTTP client")?;

    // One seeded generator for the whole run; per-trial reseeding
    // would correlate chains sampled in quick succession.
    let mut rng = StdRng::from_entropy();

    let mut out = std::io::stdout();
    run_trials(&http, &members, policy, &config, &mut rng, &mut out).await
}

/// Administrative reset: delete every registration.
async fn clear(registry_cfg: RegistryConfig) -> Result<()> {
    let mut registry = RegistryClient::connect(registry_cfg).await?;
    let deleted = registry.clear_all().await?;
    info!(deleted = deleted, "Registry cleared");
    Ok(())
}
