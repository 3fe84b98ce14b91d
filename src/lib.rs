pub mod cli;
pub mod client;
pub mod core;
pub mod providers;
pub mod server;
pub mod service;
pub mod store;

use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::ui;
use crate::core::config::AppConfig;

pub enum AppCommand {
    Server,
    Client,
}

impl AppCommand {
    /// True when `run_command` already printed the failure for the user.
    pub fn reports_own_failure(&self) -> bool {
        matches!(self, AppCommand::Client)
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Server => {
            let server = server::QuoteServer::bind(&config.server).await?;
            let shutdown = CancellationToken::new();
            tokio::spawn(await_shutdown(shutdown.clone()));
            server.run(shutdown).await
        }
        AppCommand::Client => match client::fetch_and_save(&config.client).await {
            Ok(value) => {
                println!(
                    "{}",
                    ui::saved_message(&value, &config.client.output_path.display().to_string())
                );
                Ok(())
            }
            Err(e) => {
                eprintln!("{}", ui::failure_message(&e));
                Err(e.into())
            }
        },
    }
}

/// Cancels `shutdown` on Ctrl+C or SIGTERM.
async fn await_shutdown(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }

    shutdown.cancel();
}
