//! Query command - resolve one bounding box and print the JSON response.
//!
//! Runs the same pipeline as the HTTP endpoint against the configured store,
//! so it also serves to warm the store ahead of traffic.

use clap::Args;
use geocluster::app::{AppConfig, ClusterApp, ClusterRequest};
use geocluster::config::ConfigFile;

use super::runtime;
use crate::error::CliError;

/// Arguments for the query command.
#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub lon1: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lat1: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lon2: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lat2: f64,

    /// Neighbourhood radius in degrees
    #[arg(long)]
    pub eps: Option<f64>,

    /// Minimum neighbourhood size for a dense region
    #[arg(long)]
    pub min_points: Option<u32>,

    /// Grid cell edge length in degrees
    #[arg(long)]
    pub grid_size: Option<f64>,
}

impl QueryArgs {
    fn request(&self) -> ClusterRequest {
        ClusterRequest {
            lon1: self.lon1,
            lat1: self.lat1,
            lon2: self.lon2,
            lat2: self.lat2,
            eps: self.eps,
            min_points: self.min_points,
            grid_size: self.grid_size,
        }
    }
}

/// Run the query command.
pub fn run(args: QueryArgs, config: &ConfigFile) -> Result<(), CliError> {
    let app_config = AppConfig::from_config_file(config);
    let request = args.request();

    runtime()?.block_on(async move {
        let app = ClusterApp::start(app_config).await?;
        let result = app.query(&request).await;
        app.shutdown().await;

        let response = result?;
        let json = serde_json::to_string_pretty(&response).map_err(CliError::Output)?;
        println!("{}", json);
        Ok::<(), CliError>(())
    })
}
