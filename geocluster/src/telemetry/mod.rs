//! Resolver telemetry for observability.
//!
//! Lock-free atomic counters record what each tier did; a point-in-time
//! [`TelemetrySnapshot`] is taken for display or export over HTTP.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator ─────► ResolverMetrics ─────► TelemetrySnapshot ─────► /stats, logs
//!                     (atomic counters)      (point-in-time copy)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use geocluster::telemetry::ResolverMetrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(ResolverMetrics::new());
//! metrics.request_started();
//! metrics.cell_cached();
//! metrics.request_succeeded();
//!
//! let snapshot = metrics.snapshot();
//! println!("Cache hit rate: {:.0}%", snapshot.cache_hit_rate() * 100.0);
//! ```

mod metrics;
mod snapshot;

pub use metrics::ResolverMetrics;
pub use snapshot::TelemetrySnapshot;
