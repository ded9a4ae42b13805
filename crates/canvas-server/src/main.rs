//! Collaborative canvas server.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use canvas_server::config::Config;
use canvas_server::server;

#[derive(Parser)]
#[clap(name = "canvas-server")]
#[clap(about = "Shared pixel canvas server")]
struct Cli {
    /// Interface to bind (overrides CANVAS_BIND_ADDR)
    #[clap(short, long)]
    bind: Option<String>,

    /// TCP port (overrides CANVAS_PORT)
    #[clap(short, long)]
    port: Option<u16>,

    /// Directory for persisted state (overrides CANVAS_DATA_DIR)
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// TOML session token table (overrides CANVAS_SESSIONS_FILE)
    #[clap(long)]
    sessions: Option<PathBuf>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = Some(dir);
        }
        if let Some(path) = self.sessions {
            config.sessions_file = Some(path);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    config.validate()?;

    info!(
        "Starting canvas-server on {} ({}x{}, cooldown {:?})",
        config.socket_addr_string(),
        config.width,
        config.height,
        config.cooldown
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    server::run(config, shutdown_rx).await
}
