//! Cluster query parameters, results and the keys that identify them.
//!
//! Every tier (memory cache, persistent store, engine) is addressed by a
//! [`CellKey`]: a grid cell plus the full [`ClusterQueryParams`]. Two queries
//! that differ in any parameter never share cached or persisted data.

mod types;

pub use types::{
    CellKey, ClusterQueryParams, ClusterResult, ParamsError, PersistedClusterRecord,
    MIN_POINTS_FLOOR,
};
