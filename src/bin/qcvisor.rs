//! qcvisor: live inspection-count hub over HTTP and WebSocket.
//!
//! One detector (the inspection device) registers over `/device/ws` or drives
//! the session over `/device/*` HTTP; dashboards register over `/device/ws`
//! and receive the running totals live.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qcvisor::{
    Config, Hub, LogWriter, Subscribe,
    server::{self, AppState},
    wait_for_shutdown_signal,
};

#[derive(Parser, Debug)]
#[command(name = "qcvisor")]
#[command(about = "Live aggregation hub for inspection-result streams")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "QCVISOR_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Per-dashboard outbound queue size
    #[arg(long, env = "QCVISOR_OBSERVER_QUEUE", default_value_t = Config::default().observer_queue_capacity)]
    observer_queue: usize,

    /// Dropped messages before a slow dashboard is disconnected
    #[arg(long, env = "QCVISOR_MAX_OBSERVER_DROPS", default_value_t = Config::default().max_observer_drops)]
    max_observer_drops: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "QCVISOR_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let cfg = Config {
        observer_queue_capacity: cli.observer_queue,
        max_observer_drops: cli.max_observer_drops,
        ..Config::default()
    };
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let hub = Hub::builder(cfg).with_subscribers(subscribers).build();

    let listener = TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!(addr = %listener.local_addr()?, "qcvisor listening");

    let state = AppState::new(hub.handle());
    server::serve(listener, state, async {
        if let Err(err) = wait_for_shutdown_signal().await {
            warn!(error = %err, "signal handler failed; shutting down");
        }
        info!("shutdown requested");
    })
    .await
    .context("server error")?;

    hub.shutdown().await;
    info!("qcvisor stopped");
    Ok(())
}
