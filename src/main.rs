mod cli;
mod sighup;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, LogFormat};
use rsearch_coord::cluster::manager::{run_periodic_refresh, TopologyManager, DEFAULT_REFRESH_INTERVAL};
use rsearch_coord::config::{self, Config};
use rsearch_coord::introspection::install_crash_handler;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    install_crash_handler();

    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::ValidateTopology { path } => {
            match cli::validate_topology(&path) {
                Ok(summary) => {
                    println!("{summary}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("invalid topology: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::PrintConfig => {
            let config = if cli.config.exists() {
                Config::load(&cli.config)?
            } else {
                Config::default()
            };
            println!("{}", cli::print_config(&config));
            Ok(())
        }
        Commands::Run => run(cli).await,
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = if cli.config.exists() {
        config::load(&cli.config)?
    } else {
        warn!(path = %cli.config.display(), "config file not found, using defaults");
        Arc::new(Config::default())
    };

    info!(bind = %cli.bind, "starting rsearch-coord");

    let manager = Arc::new(TopologyManager::new(
        loaded.effective_conn_per_shard(),
        loaded.topology_validation_timeout(),
    ));

    async fn poll_topology() -> rsearch_coord::error::Result<rsearch_coord::cluster::Topology> {
        // The host's topology-poll RPC is out of scope (spec §1); a
        // production build wires this to the cluster-management command
        // surface (§6 CLUSTERREFRESH).
        Err(rsearch_coord::error::Error::Generic(
            "topology poll transport not configured".into(),
        ))
    }

    let refresh_manager = manager.clone();
    let refresh_task = tokio::spawn(async move {
        run_periodic_refresh(refresh_manager, DEFAULT_REFRESH_INTERVAL, poll_topology).await;
    });

    let mut sighup = sighup::Sighup::new()?;
    loop {
        tokio::select! {
            _ = sighup.listen() => {
                match config::load(&cli.config) {
                    Ok(new) => info!(conn_per_shard = new.effective_conn_per_shard(), "config reloaded"),
                    Err(e) => warn!(error = %e, "config reload failed, keeping previous configuration"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    refresh_task.abort();
    Ok(())
}
