//! NPSB switch entrypoint.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use npsb_switch::{Switch, SwitchConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "npsb-switch")]
#[command(about = "ISO 8583 message switch for the NPSB payments profile")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listener host
    #[arg(long)]
    host: Option<String>,

    /// Override the listener port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = SwitchConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.listener.host = host;
    }
    if let Some(port) = args.port {
        config.listener.port = port;
    }

    info!("🚀 Starting NPSB ISO 8583 switch");
    Switch::new(config).run().await?;
    info!("switch stopped");
    Ok(())
}
