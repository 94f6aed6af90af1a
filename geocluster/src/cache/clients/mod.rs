//! Domain-specific cache clients.
//!
//! These clients wrap the generic `Cache` trait with domain-specific
//! key translation, value encoding and optional metrics injection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │       CellCacheClient        │
//! │                              │
//! │ CellKey → key                │
//! │ Vec<ClusterResult> ↔ bincode │
//! │ Deadline, metrics injection  │
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │        Arc<dyn Cache>        │
//! │                              │
//! │ string → Vec<u8>, per TTL    │
//! └──────────────────────────────┘
//! ```
//!
//! # Key Format
//!
//! `"clusters:{cellX}:{cellY}:g{gridSize}:e{eps}:m{minPoints}"`
//! (e.g., `"clusters:229:406:g0.1:e0.00025:m2"`)

mod cell;

pub use cell::CellCacheClient;
