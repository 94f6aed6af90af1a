//! Serve command - run the HTTP service until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use geocluster::app::{AppConfig, ClusterApp};
use geocluster::config::ConfigFile;
use geocluster::http;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::runtime;
use crate::error::CliError;

/// Arguments for the serve command.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides [server] bind)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// JSON point set (overrides [engine] points_path)
    #[arg(long)]
    pub points: Option<PathBuf>,

    /// JSON-lines cluster store (overrides [store] path)
    #[arg(long)]
    pub store: Option<PathBuf>,
}

impl ServeArgs {
    /// Applies command-line overrides. CLI takes precedence over the file.
    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(bind) = self.bind {
            config = config.with_bind(bind);
        }
        if let Some(points) = &self.points {
            config = config.with_points_path(Some(points.clone()));
        }
        if let Some(store) = &self.store {
            config = config.with_store_path(Some(store.clone()));
        }
        config
    }
}

/// Run the serve command.
pub fn run(args: ServeArgs, config: &ConfigFile) -> Result<(), CliError> {
    let app_config = args.apply(AppConfig::from_config_file(config));
    let bind = app_config.server.bind;

    runtime()?.block_on(async move {
        let app = Arc::new(ClusterApp::start(app_config).await?);

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received shutdown signal");
                    signal_token.cancel();
                }
                Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
            }
        });

        let served = http::serve(bind, Arc::clone(&app), shutdown).await;

        match Arc::try_unwrap(app) {
            Ok(app) => app.shutdown().await,
            Err(_) => warn!("Application still referenced, skipping graceful shutdown"),
        }

        served.map_err(CliError::from)
    })
}
