use anyhow::Context;
use clap::Parser;
use ferrumkv::config::ServerConfig;
use ferrumkv::server::Server;
use std::path::PathBuf;
use tracing::{error, info};

/// FerrumKV: single-threaded key/value server
#[derive(Parser, Debug)]
#[command(name = "ferrumkv", version)]
struct Cli {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long)]
    addr: Option<String>,

    /// Log level when RUST_LOG is unset (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    if let Some(addr) = &cli.addr {
        config.addr = addr.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("FerrumKV starting...");

    let mut server = Server::bind(config)?;
    if let Err(e) = server.run() {
        error!("Server error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
