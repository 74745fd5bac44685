use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;

use sensormesh_node::node::MonotonicClock;
use sensormesh_node::sim::{RunOptions, Simulation, run};
use sensormesh_node::{NodeConfig, logging};

#[derive(Parser)]
#[command(
    name = "sensormesh-node",
    about = "Run a sensormesh node against a simulated gateway"
)]
struct Cli {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Milliseconds between transport ticks
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Ticks between sensor readings once operational
    #[arg(long, default_value_t = 20)]
    report_every: u64,

    /// Send readings unsigned even when signing is configured
    #[arg(long)]
    unsigned: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match NodeConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to load config from {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => NodeConfig::default(),
    };

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        logging::init_json(&config.logging.level);
    } else {
        logging::init(&config.logging.level);
    }

    let mut sim = match Simulation::from_config(&config, MonotonicClock::new()) {
        Ok(sim) => sim,
        Err(e) => {
            tracing::error!("failed to build node: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = sim.start() {
        tracing::error!("failed to start node: {e}");
        std::process::exit(1);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received SIGINT, shutting down");
        let _ = shutdown_tx.send(true);
    });

    let options = RunOptions {
        tick: Duration::from_millis(cli.tick_ms.max(1)),
        max_ticks: cli.ticks,
        report_every: cli.report_every,
        signed: !cli.unsigned,
    };
    run(&mut sim, &options, shutdown_rx).await;
}
