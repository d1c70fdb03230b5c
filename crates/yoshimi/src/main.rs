//! # yoshimi
//!
//! SSH server presenting a small terminal form behind a shared secret.
//!
//! ## Overview
//!
//! Each SSH connection gets its own session:
//! - A masked password prompt checked against the configured phrase
//! - An optional menu (notify, ssh key, typing)
//! - A title/body form whose values are passed to the configured script
//! - A result screen showing the script's output
//!
//! ## Architecture
//!
//! This is Layer 3 - the binary that ties together:
//! - yoshimi-core: Configuration, keys, errors
//! - yoshimi-terminal: Input decoding and frame output
//! - yoshimi-session: Session state machine and host
//!
//! ## Configuration
//!
//! Defaults, then an optional YAML file (`--config <path>`), then the
//! environment (a `.env` file in the working directory is loaded first).

use tracing::{error, info};

use yoshimi::ServerHandle;
use yoshimi_core::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let config = load_config(&args)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level)),
        )
        .init();

    info!("yoshimi v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e.into());
    }

    let server = ServerHandle::start(config.clone()).await.map_err(|e| {
        error!("Could not start server: {}", e);
        e
    })?;

    shutdown_signal().await;

    let outcome = server.stop(config.server.shutdown_timeout()).await;
    info!("Stopped server ({:?})", outcome);

    Ok(())
}

fn load_config(args: &[String]) -> anyhow::Result<ServerConfig> {
    let mut config = match args.iter().position(|arg| arg == "--config") {
        Some(i) => {
            let path = args
                .get(i + 1)
                .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
            ServerConfig::from_file(path)?
        }
        None => ServerConfig::default(),
    };
    config.apply_env(|name| std::env::var(name).ok())?;
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received interrupt"),
        _ = terminate => info!("Received terminate signal"),
    }
}
