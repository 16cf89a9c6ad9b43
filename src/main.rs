mod domain;
mod infrastructure;

use clap::{Parser, Subcommand};
use domain::settings::Settings;
use infrastructure::bluetooth::connection::BtleTransport;
use infrastructure::bluetooth::scanner;
use infrastructure::bluetooth::supervisor::{DiceSupervisor, SupervisorConfig};
use infrastructure::logging;
use infrastructure::publisher::SocketIoPublisher;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "godice-bridge")]
#[command(about = "Bridges GoDice smart dice to the game server")]
struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover dice and bridge their events to the server (default)
    Run,
    /// Continuous discovery probe: print BLE devices on first sight
    Scan,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let _logging = logging::init_logger(&settings.log_settings)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bridge(settings).await,
        Commands::Scan => scanner::run_discovery_probe().await,
    }
}

async fn run_bridge(settings: Settings) -> anyhow::Result<()> {
    info!(server = %settings.server_url, "starting GoDice bridge");

    let auth = json!({
        "uuid": settings.client_uuid,
        "username": settings.client_username,
    });
    let publisher = SocketIoPublisher::connect(&settings.server_url, auth).await?;

    let transport = BtleTransport::new(Duration::from_millis(settings.scan_window_ms)).await?;
    let config = SupervisorConfig::from_settings(&settings)?;

    let supervisor = DiceSupervisor::new(Arc::new(transport), Arc::new(publisher), config);
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(supervisor.run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    shutdown.cancel();
    let _ = task.await;

    Ok(())
}
