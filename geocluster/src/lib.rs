//! GeoCluster - Tile-cached density clustering over geospatial point sets
//!
//! This library answers bounding-box cluster queries by tiling the box into
//! fixed-size grid cells and resolving each cell from the fastest tier that
//! has it: a volatile memory cache, a durable append-only store, or a fresh
//! DBSCAN computation.
//!
//! # Modules
//!
//! - [`coord`]: bounding-box normalization and grid tiling
//! - [`cluster`]: query parameters, results and cell keys
//! - [`cache`]: memory cache service and the cell cache client
//! - [`store`]: persistent cluster store
//! - [`engine`]: clustering engine
//! - [`resolver`]: tiered orchestration and result aggregation
//! - [`app`]: lifecycle and end-to-end queries
//! - [`http`]: axum adapter
//! - [`config`], [`logging`], [`telemetry`]: ambient services

pub mod app;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod coord;
pub mod engine;
pub mod http;
pub mod logging;
pub mod resolver;
pub mod store;
pub mod telemetry;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
