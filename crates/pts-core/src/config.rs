//! # Engine Configuration — Explicit Snapshots
//!
//! The legacy system read settings from a module-level cache refreshed on
//! demand. Here configuration is an explicitly owned snapshot: services
//! receive a [`ConfigHandle`] at construction, read a consistent
//! [`EngineConfig`] per operation, and an operator triggers [`reload`]
//! explicitly. There is no ambient global to refresh behind anyone's back.
//!
//! [`reload`]: ConfigHandle::reload

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::identity::Gln;

/// Engine-wide configuration snapshot.
///
/// Immutable once published; [`ConfigHandle::reload`] swaps the whole
/// snapshot rather than mutating fields in place, so a running operation
/// never observes a half-updated configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the regulatory authority API.
    pub authority_base_url: String,
    /// GLN identifying this facility as the message source.
    pub source_gln: Gln,
    /// GLN of the default destination party.
    pub destination_gln: Gln,
    /// Bounded timeout for every external call, in seconds.
    pub request_timeout_secs: u64,
    /// Maximum items per notification submit call; batches are chunked to
    /// this size.
    pub max_items_per_call: usize,
    /// `actionType` emitted in transfer documents.
    pub action_type: String,
    /// `version` emitted in transfer documents.
    pub document_version: String,
    /// Optional free-text `note` emitted in transfer documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            authority_base_url: "https://its.example.gov/api/v1".to_string(),
            source_gln: Gln::placeholder(),
            destination_gln: Gln::placeholder(),
            request_timeout_secs: 30,
            max_items_per_call: 500,
            action_type: "shipment".to_string(),
            document_version: "1.4".to_string(),
            note: None,
        }
    }
}

/// Shared handle to the current configuration snapshot.
///
/// Cheaply cloneable; all clones observe the same snapshot and the same
/// reloads.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<EngineConfig>>>,
}

impl ConfigHandle {
    /// Create a handle around an initial snapshot.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// The current snapshot. Callers hold the returned `Arc` for the
    /// duration of one operation; a concurrent reload does not affect it.
    pub fn current(&self) -> Arc<EngineConfig> {
        self.inner.read().clone()
    }

    /// Replace the snapshot. In-flight operations keep the snapshot they
    /// already took; subsequent `current()` calls see the new one.
    pub fn reload(&self, config: EngineConfig) {
        *self.inner.write() = Arc::new(config);
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_swaps_snapshot_for_new_readers_only() {
        let handle = ConfigHandle::default();
        let before = handle.current();

        let mut updated = EngineConfig::default();
        updated.max_items_per_call = 10;
        handle.reload(updated);

        // The old snapshot is unchanged; new reads see the new value.
        assert_eq!(before.max_items_per_call, 500);
        assert_eq!(handle.current().max_items_per_call, 10);
    }

    #[test]
    fn clones_share_reloads() {
        let a = ConfigHandle::default();
        let b = a.clone();
        let mut updated = EngineConfig::default();
        updated.request_timeout_secs = 5;
        a.reload(updated);
        assert_eq!(b.current().request_timeout_secs, 5);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source_gln, cfg.source_gln);
        assert_eq!(back.max_items_per_call, cfg.max_items_per_call);
    }
}
