//! fleetq daemon
//!
//! Main daemon process serving the fleet API and feeding the registry from
//! the configured telemetry source.

use clap::Parser;
use fleetq_api::create_router;
use fleetq_core::DaemonConfig;
use fleetq_sched::{wait_model_from_config, FleetRegistry};
use fleetq_store::FleetStore;
use fleetq_telemetry::source_from_config;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// fleetqd - GPU fleet allocation and queueing daemon
#[derive(Parser, Debug)]
#[command(name = "fleetqd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind the API server (overrides config)
    #[arg(long)]
    address: Option<String>,

    /// Port for the REST API server (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Log level (overrides config)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DaemonConfig::from_file(path).expect("Failed to load config"),
        None => DaemonConfig::default(),
    };
    if let Some(address) = args.address {
        config.api.rest_address = address;
    }
    if let Some(port) = args.port {
        config.api.rest_port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // Initialize logging
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    info!("Starting fleetq daemon v{}", env!("CARGO_PKG_VERSION"));

    // Durable node state, if configured
    let store = if config.storage.persist {
        let store = FleetStore::new(config.storage.data_path.clone());
        store
            .init()
            .await
            .expect("Failed to create state directory");
        Some(store)
    } else {
        None
    };

    // Create registry
    let wait_model = wait_model_from_config(&config.scheduling);
    let registry = Arc::new(FleetRegistry::new(
        config.scheduling.gpu_aggregation,
        wait_model,
        store,
    ));

    let restored = registry
        .load_from_store()
        .await
        .expect("Failed to restore node state");
    if restored > 0 {
        info!(nodes = restored, "Restored persisted node state");
    }

    // Telemetry poll loop
    let source = source_from_config(&config.telemetry).expect("Failed to build telemetry source");
    info!(
        source = source.name(),
        interval_secs = config.telemetry.poll_interval_secs,
        "Telemetry source ready"
    );

    {
        let registry = registry.clone();
        let source = source.clone();
        let poll_interval = Duration::from_secs(config.telemetry.poll_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                match source.sample().await {
                    Ok(snapshots) => {
                        for snapshot in snapshots {
                            if let Err(e) = registry.ingest(snapshot).await {
                                warn!(error = %e, "Failed to ingest node snapshot");
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "Telemetry sample failed"),
                }
            }
        });
    }

    // Queue wait advancement loop
    {
        let registry = registry.clone();
        let tick_secs = config.scheduling.wait_tick_secs.max(1);
        let tick_minutes = tick_secs.div_ceil(60);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(tick_secs));
            // The first interval tick fires immediately; skip it so fresh
            // entries do not age at boot.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.tick_wait(tick_minutes).await;
            }
        });
    }

    // Create API router
    let router = create_router(registry, &config.api);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.api.rest_address, config.api.rest_port)
        .parse()
        .expect("Invalid address");

    info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, router).await.expect("Server error");
}
