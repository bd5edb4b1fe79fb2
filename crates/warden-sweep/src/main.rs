//! CLI entry point for the warden-sweep grant sweeper.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use warden_graph::{GraphClient, GraphConfig};

use warden_sweep::config::SweepConfig;
use warden_sweep::sweeper::{drain_expired, GrantSweeper};

#[derive(Parser)]
#[command(name = "warden-sweep")]
#[command(about = "Expired-grant sweeper for the warden identity graph")]
struct Cli {
    /// Run a single drain pass and exit.
    #[arg(long)]
    once: bool,

    /// Run as daemon, sweeping at the configured interval.
    #[arg(long)]
    daemon: bool,

    /// Config file prefix (default: warden).
    #[arg(short, long, default_value = "warden")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let sweep_config = load_sweep_config(&cli.config)?;
    sweep_config.validate()?;

    // Connect to Neo4j.
    let graph_config = load_graph_config(&cli.config);
    let graph = GraphClient::connect(&graph_config).await?;
    tracing::info!("Connected to Neo4j");

    if cli.once {
        let stats = drain_expired(&graph, sweep_config.batch_size).await?;
        tracing::info!(
            deleted = stats.deleted,
            batches = stats.batches,
            "Drain complete"
        );
    } else if cli.daemon {
        if !sweep_config.enabled {
            anyhow::bail!("Sweeping is disabled: set sweep.enabled = true to run as daemon");
        }
        let sweeper = GrantSweeper::new(graph, sweep_config)?;
        let handle = sweeper.start();

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown signal received");
        handle.shutdown().await;
    } else {
        anyhow::bail!("Specify --once (single drain pass) or --daemon (periodic sweeping)");
    }

    Ok(())
}

fn load_sweep_config(file_prefix: &str) -> anyhow::Result<SweepConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("WARDEN_SWEEP")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<SweepConfig>("sweep") {
        Ok(c) => Ok(c),
        Err(_) => Ok(SweepConfig::default()),
    }
}

fn load_graph_config(file_prefix: &str) -> GraphConfig {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("WARDEN")
                .separator("__")
                .try_parsing(true),
        )
        .build();

    match cfg {
        Ok(c) => GraphConfig {
            uri: c
                .get_string("neo4j.uri")
                .unwrap_or_else(|_| "bolt://localhost:7687".to_string()),
            user: c
                .get_string("neo4j.user")
                .unwrap_or_else(|_| "neo4j".to_string()),
            password: c
                .get_string("neo4j.password")
                .unwrap_or_else(|_| "warden-dev".to_string()),
            ..Default::default()
        },
        Err(_) => GraphConfig::default(),
    }
}
