//! Request coalescing for cell misses.
//!
//! When several requests miss the memory cache for the same cell key at the
//! same time, only the first (the leader) goes to the store and engine. The
//! others (followers) subscribe to the leader's outcome.
//!
//! ```text
//!  request A ──► register(key) ──► Leader ──► store/engine ──► complete(outcome)
//!                                                                    │
//!  request B ──► register(key) ──► Coalesced(rx) ◄───── broadcast ───┤
//!  request C ──► register(key) ──► Coalesced(rx) ◄───────────────────┘
//! ```
//!
//! A leader that fails or is dropped never completes. Dropping its
//! [`LeaderGuard`] removes the in-flight entry and closes the channel, and
//! each follower then retries on its own.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use super::aggregate::Tier;
use crate::cluster::ClusterResult;

/// Outcome shared with followers.
#[derive(Debug, Clone)]
pub struct CoalescedOutcome {
    /// Tier that produced the clusters for the leader.
    pub tier: Tier,
    pub clusters: Arc<Vec<ClusterResult>>,
}

/// Result of registering interest in a key.
pub enum CoalesceResult {
    /// Another request is already resolving this key.
    Coalesced(broadcast::Receiver<CoalescedOutcome>),
    /// This request is the leader and must resolve the key.
    Leader(LeaderGuard),
}

/// Tracks in-flight cell resolutions by cell key.
#[derive(Debug, Default)]
pub struct RequestCoalescer {
    in_flight: Arc<DashMap<String, broadcast::Sender<CoalescedOutcome>>>,
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in `key`.
    pub fn register(&self, key: String) -> CoalesceResult {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(key) {
            Entry::Occupied(entry) => CoalesceResult::Coalesced(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let key = entry.key().clone();
                // Capacity 1: exactly one outcome is ever sent
                let (tx, _) = broadcast::channel(1);
                entry.insert(tx);
                CoalesceResult::Leader(LeaderGuard {
                    key,
                    in_flight: Arc::clone(&self.in_flight),
                    completed: false,
                })
            }
        }
    }

    /// Number of keys currently being resolved.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Held by the leader for one key.
///
/// Call [`complete`](Self::complete) with the outcome. Dropping the guard
/// without completing releases followers to retry.
pub struct LeaderGuard {
    key: String,
    in_flight: Arc<DashMap<String, broadcast::Sender<CoalescedOutcome>>>,
    completed: bool,
}

impl LeaderGuard {
    /// Publishes the outcome to every follower and retires the key.
    ///
    /// Returns the number of followers that received it.
    pub fn complete(mut self, outcome: CoalescedOutcome) -> usize {
        // A new leader may register the key as soon as it is removed
        self.completed = true;
        match self.in_flight.remove(&self.key) {
            Some((_, tx)) => tx.send(outcome).unwrap_or(0),
            None => 0,
        }
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if !self.completed {
            self.in_flight.remove(&self.key);
        }
    }
}
