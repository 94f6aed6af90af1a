//! Durable storage of computed cluster sets.
//!
//! The store is append-only: the query flow inserts a
//! [`PersistedClusterRecord`](crate::cluster::PersistedClusterRecord) for
//! every freshly computed cell and never updates or deletes one. Lookups are
//! by exact cell and parameter key.
//!
//! Two implementations are provided:
//!
//! - [`MemoryClusterStore`] keeps records in process memory
//! - [`FileClusterStore`] appends records to a JSON-lines file and rebuilds
//!   its index from that file on open

mod file;
mod memory;
mod traits;

pub use file::FileClusterStore;
pub use memory::MemoryClusterStore;
pub use traits::{ClusterStore, StoreError};
